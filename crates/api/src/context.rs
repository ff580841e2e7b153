use gatehouse_auth::{AuthSession, OpaqueToken, TokenRecord, User};

/// Authenticated request context: the resolved user and their session.
///
/// Built by the auth middleware and passed to handlers as an extension;
/// downstream code never re-validates the token.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    pub session: TokenRecord,
}

impl From<AuthSession> for AuthContext {
    fn from(auth: AuthSession) -> Self {
        Self {
            user: auth.user,
            session: auth.session,
        }
    }
}

/// The raw bearer credential as presented, kept alongside the context so
/// logout can revoke exactly the session it arrived on.
#[derive(Debug, Clone)]
pub struct BearerToken(pub OpaqueToken);

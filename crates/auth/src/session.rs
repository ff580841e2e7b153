//! Session lifecycle: issuance, validation with sliding renewal, revocation.
//!
//! A session moves Issued → Valid, loops through renewals while it keeps
//! being used, and terminates either by lazy expiry on the read path or by
//! explicit invalidation (logout). There is no background sweeper: an
//! expired row sits in the store until the next validate call removes it.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use gatehouse_core::{AuthResult, UserId};

use crate::store::{TokenPurpose, TokenRecord, TokenStore};
use crate::token::{OpaqueToken, TokenId};
use crate::users::{User, UserDirectory};

/// Absolute session lifetime from issuance or last renewal.
pub const SESSION_TTL_DAYS: i64 = 30;

/// Remaining-validity threshold below which a validate call pushes the
/// expiry forward. With a 30-day TTL this amortizes renewal writes to
/// roughly one every two weeks of active use per session.
pub const SESSION_RENEW_WINDOW_DAYS: i64 = 15;

/// A freshly issued session: the raw bearer secret and when it lapses.
#[derive(Debug)]
pub struct IssuedSession {
    pub token: OpaqueToken,
    pub expires_at: DateTime<Utc>,
}

/// A validated session joined with its owning user.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub session: TokenRecord,
}

/// Orchestrates the session-token lifecycle over the token store and the
/// user directory. Holds no mutable state of its own; safe to share.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn TokenStore>,
    users: Arc<dyn UserDirectory>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn TokenStore>, users: Arc<dyn UserDirectory>) -> Self {
        Self { store, users }
    }

    /// Issue a new session for `user_id`.
    ///
    /// The raw token is returned to the caller and never logged or stored;
    /// only its digest is persisted. An id collision in the store surfaces
    /// as a conflict error rather than being swallowed.
    pub async fn issue(&self, user_id: UserId) -> AuthResult<IssuedSession> {
        let token = OpaqueToken::generate();
        let expires_at = Utc::now() + Duration::days(SESSION_TTL_DAYS);

        self.store
            .put(TokenRecord {
                id: TokenId::derive(&token),
                user_id,
                purpose: TokenPurpose::Session,
                expires_at,
                blacklisted: false,
            })
            .await?;

        tracing::debug!(%user_id, %expires_at, "session issued");

        Ok(IssuedSession { token, expires_at })
    }

    /// Resolve a bearer token to its session and owning user.
    ///
    /// Returns `Ok(None)` for unknown and expired tokens alike; the caller
    /// must treat both identically (an authentication failure, not an
    /// error at this layer). Expired rows are deleted on sight. A session
    /// with fewer than [`SESSION_RENEW_WINDOW_DAYS`] days of validity left
    /// has its expiry pushed to now + [`SESSION_TTL_DAYS`] days as a side
    /// effect of the read. Store failures propagate unchanged.
    pub async fn validate(&self, token: &OpaqueToken) -> AuthResult<Option<AuthSession>> {
        let id = TokenId::derive(token);

        let Some(mut session) = self.store.get(&id).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        if now >= session.expires_at {
            // Lazy expiry: drop the row, report the session as absent.
            self.store.delete(&id).await?;
            tracing::debug!(user_id = %session.user_id, "expired session removed");
            return Ok(None);
        }

        let Some(user) = self.users.get_by_id(session.user_id).await? else {
            return Ok(None);
        };

        if now >= session.expires_at - Duration::days(SESSION_RENEW_WINDOW_DAYS) {
            // Sliding renewal, performed synchronously on the read path.
            // Racing validates of the same token converge on (nearly) the
            // same target value; last write wins is fine here.
            let renewed = now + Duration::days(SESSION_TTL_DAYS);
            self.store.update_expiry(&id, renewed).await?;
            session.expires_at = renewed;
            tracing::debug!(user_id = %session.user_id, %renewed, "session renewed");
        }

        Ok(Some(AuthSession { user, session }))
    }

    /// Revoke the session behind `token` (logout).
    ///
    /// Idempotent: revoking an unknown or already-removed token succeeds.
    /// Callers must never surface the absence as a user-visible error.
    pub async fn invalidate(&self, token: &OpaqueToken) -> AuthResult<()> {
        let id = TokenId::derive(token);
        let existed = self.store.delete(&id).await?;
        if !existed {
            tracing::debug!("invalidate on absent session (no-op)");
        }
        Ok(())
    }
}

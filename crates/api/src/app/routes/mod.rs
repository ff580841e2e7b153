use axum::Router;

pub mod auth;
pub mod system;
pub mod users;

/// Routes reachable without a session.
pub fn public_router() -> Router {
    auth::public_router()
}

/// Routes that require a validated bearer token.
pub fn protected_router() -> Router {
    auth::protected_router().merge(users::router())
}

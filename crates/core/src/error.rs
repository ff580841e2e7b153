//! Auth domain error model.

use thiserror::Error;

/// Result type used across the auth domain.
pub type AuthResult<T> = Result<T, AuthError>;

/// Auth-domain error.
///
/// Keep this focused on deterministic auth outcomes. The two consume-flow
/// variants exist so that multi-step flows can collapse every internal cause
/// into one opaque outward signal (defense against probing *why* a reset
/// failed); the original cause is logged, never surfaced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// A referenced entity (user, token) is absent.
    #[error("not found")]
    NotFound,

    /// A uniqueness constraint was violated (e.g. token id, email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// No valid session or credential. Exposed uniformly regardless of the
    /// underlying cause (missing token, expired token, unknown user).
    #[error("please authenticate")]
    AuthenticationFailed,

    /// Authenticated but not permitted.
    #[error("forbidden")]
    Forbidden,

    /// Password reset failed; the cause is deliberately unspecified.
    #[error("password reset failed")]
    PasswordResetFailed,

    /// Email verification failed; the cause is deliberately unspecified.
    #[error("email verification failed")]
    EmailVerificationFailed,

    /// Infrastructure error from a store or directory, carried opaquely.
    #[error("storage error: {0}")]
    Store(String),
}

impl AuthError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}

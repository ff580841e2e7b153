//! `gatehouse-auth` — session/token lifecycle and authorization checks.
//!
//! This crate is the security core of the service. It owns:
//!
//! - the token codec (random opaque tokens, SHA-256 storage ids),
//! - the token store port plus an in-memory implementation,
//! - the session manager (issue / validate with sliding renewal / invalidate),
//! - the purpose-token manager (password reset, email verification),
//! - the role-rights authorization evaluator.
//!
//! It is intentionally decoupled from HTTP and from any concrete database;
//! persistence and user storage arrive through the [`TokenStore`] and
//! [`UserDirectory`] ports.

pub mod authorize;
pub mod purpose;
pub mod rights;
pub mod session;
pub mod store;
pub mod token;
pub mod users;

pub use authorize::authorize;
pub use purpose::{PurposeTokenManager, PURPOSE_TOKEN_TTL_MINUTES};
pub use rights::{Permission, Role, RoleRights};
pub use session::{
    AuthSession, IssuedSession, SessionManager, SESSION_RENEW_WINDOW_DAYS, SESSION_TTL_DAYS,
};
pub use store::{InMemoryTokenStore, TokenPurpose, TokenRecord, TokenStore, TokenStoreError};
pub use token::{OpaqueToken, TokenId, TOKEN_BYTES};
pub use users::{
    InMemoryUserDirectory, PasswordHashError, PasswordHasher, User, UserDirectory,
    UserDirectoryError,
};

//! User-directory and password-hashing ports.
//!
//! User management proper lives outside this crate; the session and
//! purpose-token managers only need these narrow contracts. The in-memory
//! directory backs tests and the no-database dev mode.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::Serialize;

use gatehouse_core::{AuthError, UserId};

use crate::rights::Role;

/// A user account as seen by the auth core.
///
/// `password_hash` is whatever the configured [`PasswordHasher`] produced;
/// this crate treats it as an opaque one-way value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email_verified: bool,
}

/// User directory operation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UserDirectoryError {
    #[error("user not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<UserDirectoryError> for AuthError {
    fn from(err: UserDirectoryError) -> Self {
        match err {
            UserDirectoryError::NotFound => AuthError::NotFound,
            UserDirectoryError::Conflict(msg) => AuthError::Conflict(msg),
            UserDirectoryError::Storage(msg) => AuthError::Store(msg),
        }
    }
}

/// Lookup/update contract the auth core requires from user management.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, UserDirectoryError>;

    /// Email lookup. Emails are matched lowercased; the returned user
    /// includes the password hash for credential verification flows.
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, UserDirectoryError>;

    /// Insert a new user. Fails with `Conflict` when the email is taken.
    async fn create(&self, user: User) -> Result<(), UserDirectoryError>;

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), UserDirectoryError>;

    async fn mark_email_verified(&self, id: UserId) -> Result<(), UserDirectoryError>;
}

/// Password hashing failed (malformed hash, backend error).
#[derive(Debug, Clone, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordHashError(pub String);

impl From<PasswordHashError> for AuthError {
    fn from(err: PasswordHashError) -> Self {
        AuthError::Store(err.0)
    }
}

/// Opaque one-way password function.
///
/// The core never inspects hashes; it only asks for new ones and for
/// comparisons. The Argon2id implementation lives in the infra crate.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plain: &str) -> Result<String, PasswordHashError>;

    /// Constant-result comparison of a candidate against a stored hash.
    /// Malformed stored hashes compare as non-matching.
    fn verify(&self, plain: &str, hash: &str) -> bool;
}

/// In-memory user directory.
///
/// Intended for tests/dev. Enforces email uniqueness like the real one.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, UserDirectoryError> {
        Ok(read(&self.users)?.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, UserDirectoryError> {
        let email = email.to_lowercase();
        Ok(read(&self.users)?
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create(&self, user: User) -> Result<(), UserDirectoryError> {
        let mut users = write(&self.users)?;
        if users.values().any(|u| u.email == user.email) {
            return Err(UserDirectoryError::Conflict("email already taken".to_string()));
        }
        users.insert(user.id, user);
        Ok(())
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), UserDirectoryError> {
        let mut users = write(&self.users)?;
        let user = users.get_mut(&id).ok_or(UserDirectoryError::NotFound)?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn mark_email_verified(&self, id: UserId) -> Result<(), UserDirectoryError> {
        let mut users = write(&self.users)?;
        let user = users.get_mut(&id).ok_or(UserDirectoryError::NotFound)?;
        user.email_verified = true;
        Ok(())
    }
}

fn read<T>(
    lock: &RwLock<T>,
) -> Result<std::sync::RwLockReadGuard<'_, T>, UserDirectoryError> {
    lock.read()
        .map_err(|_| UserDirectoryError::Storage("lock poisoned".to_string()))
}

fn write<T>(
    lock: &RwLock<T>,
) -> Result<std::sync::RwLockWriteGuard<'_, T>, UserDirectoryError> {
    lock.write()
        .map_err(|_| UserDirectoryError::Storage("lock poisoned".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> User {
        User {
            id: UserId::new(),
            email: email.to_string(),
            name: "Alice Smith".to_string(),
            role: Role::new("user"),
            password_hash: "hash".to_string(),
            email_verified: false,
        }
    }

    #[tokio::test]
    async fn email_uniqueness_is_enforced() {
        let dir = InMemoryUserDirectory::new();
        dir.create(user("alice@example.com")).await.unwrap();

        let err = dir.create(user("alice@example.com")).await.unwrap_err();
        assert!(matches!(err, UserDirectoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn get_by_email_matches_lowercased() {
        let dir = InMemoryUserDirectory::new();
        let created = user("alice@example.com");
        dir.create(created.clone()).await.unwrap();

        let found = dir.get_by_email("Alice@Example.COM").await.unwrap();
        assert_eq!(found, Some(created));
    }

    #[tokio::test]
    async fn password_hash_is_not_serialized() {
        let value = serde_json::to_value(user("alice@example.com")).unwrap();
        assert!(value.get("password_hash").is_none());
        assert!(value.get("email").is_some());
    }
}

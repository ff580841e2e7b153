//! Token persistence port and the in-memory implementation.
//!
//! Records are keyed by their derived id, never by the raw token. One storage
//! shape covers both session tokens and purpose-scoped tokens; sessions are
//! simply rows with [`TokenPurpose::Session`] and `blacklisted = false`.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gatehouse_core::{AuthError, UserId};

use crate::token::TokenId;

/// What a token is good for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenPurpose {
    Session,
    ResetPassword,
    VerifyEmail,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Session => "SESSION",
            Self::ResetPassword => "RESET_PASSWORD",
            Self::VerifyEmail => "VERIFY_EMAIL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SESSION" => Some(Self::Session),
            "RESET_PASSWORD" => Some(Self::ResetPassword),
            "VERIFY_EMAIL" => Some(Self::VerifyEmail),
            _ => None,
        }
    }
}

impl core::fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted token row. `id` is the SHA-256 digest of the raw token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub id: TokenId,
    pub user_id: UserId,
    pub purpose: TokenPurpose,
    pub expires_at: DateTime<Utc>,
    pub blacklisted: bool,
}

/// Token store operation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TokenStoreError {
    /// The id already exists. Should not happen under correct random
    /// generation, but must be surfaced, not silently overwritten.
    #[error("token id already exists")]
    Conflict,

    /// The row addressed by an update was absent.
    #[error("token not found")]
    NotFound,

    /// Backend failure (connection, query, lock).
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<TokenStoreError> for AuthError {
    fn from(err: TokenStoreError) -> Self {
        match err {
            TokenStoreError::Conflict => AuthError::conflict("token id already exists"),
            TokenStoreError::NotFound => AuthError::NotFound,
            TokenStoreError::Storage(msg) => AuthError::Store(msg),
        }
    }
}

/// Persistence port for token records.
///
/// All operations are non-blocking I/O against the backing store. The store
/// enforces uniqueness on `id`; nothing else is interpreted.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Insert a record. Fails with [`TokenStoreError::Conflict`] if the id
    /// already exists.
    async fn put(&self, record: TokenRecord) -> Result<(), TokenStoreError>;

    /// Exact lookup by id.
    async fn get(&self, id: &TokenId) -> Result<Option<TokenRecord>, TokenStoreError>;

    /// Lookup filtered additionally by purpose and blacklist-flag equality.
    /// At most one match is expected under correct use.
    async fn find_by_purpose(
        &self,
        id: &TokenId,
        purpose: TokenPurpose,
        blacklisted: bool,
    ) -> Result<Option<TokenRecord>, TokenStoreError>;

    /// In-place update of the expiry attribute only.
    async fn update_expiry(
        &self,
        id: &TokenId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), TokenStoreError>;

    /// Remove a single record. Returns `false` when the row was already
    /// gone; callers decide whether absence matters.
    async fn delete(&self, id: &TokenId) -> Result<bool, TokenStoreError>;

    /// Bulk delete of all tokens of one purpose for one user. Supports
    /// single-use and supersession semantics. Returns the number removed.
    async fn delete_all_for_user(
        &self,
        user_id: UserId,
        purpose: TokenPurpose,
    ) -> Result<u64, TokenStoreError>;
}

/// In-memory token store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    records: RwLock<HashMap<TokenId, TokenRecord>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn put(&self, record: TokenRecord) -> Result<(), TokenStoreError> {
        let mut records = lock_write(&self.records)?;
        if records.contains_key(&record.id) {
            return Err(TokenStoreError::Conflict);
        }
        records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &TokenId) -> Result<Option<TokenRecord>, TokenStoreError> {
        Ok(lock_read(&self.records)?.get(id).cloned())
    }

    async fn find_by_purpose(
        &self,
        id: &TokenId,
        purpose: TokenPurpose,
        blacklisted: bool,
    ) -> Result<Option<TokenRecord>, TokenStoreError> {
        Ok(lock_read(&self.records)?
            .get(id)
            .filter(|r| r.purpose == purpose && r.blacklisted == blacklisted)
            .cloned())
    }

    async fn update_expiry(
        &self,
        id: &TokenId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), TokenStoreError> {
        let mut records = lock_write(&self.records)?;
        let record = records.get_mut(id).ok_or(TokenStoreError::NotFound)?;
        record.expires_at = expires_at;
        Ok(())
    }

    async fn delete(&self, id: &TokenId) -> Result<bool, TokenStoreError> {
        Ok(lock_write(&self.records)?.remove(id).is_some())
    }

    async fn delete_all_for_user(
        &self,
        user_id: UserId,
        purpose: TokenPurpose,
    ) -> Result<u64, TokenStoreError> {
        let mut records = lock_write(&self.records)?;
        let before = records.len();
        records.retain(|_, r| !(r.user_id == user_id && r.purpose == purpose));
        Ok((before - records.len()) as u64)
    }
}

fn lock_read<T>(
    lock: &RwLock<T>,
) -> Result<std::sync::RwLockReadGuard<'_, T>, TokenStoreError> {
    lock.read()
        .map_err(|_| TokenStoreError::Storage("lock poisoned".to_string()))
}

fn lock_write<T>(
    lock: &RwLock<T>,
) -> Result<std::sync::RwLockWriteGuard<'_, T>, TokenStoreError> {
    lock.write()
        .map_err(|_| TokenStoreError::Storage("lock poisoned".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    use crate::token::{OpaqueToken, TokenId};

    fn record(purpose: TokenPurpose, blacklisted: bool) -> TokenRecord {
        TokenRecord {
            id: TokenId::derive(&OpaqueToken::generate()),
            user_id: UserId::new(),
            purpose,
            expires_at: Utc::now() + Duration::minutes(10),
            blacklisted,
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemoryTokenStore::new();
        let rec = record(TokenPurpose::Session, false);

        store.put(rec.clone()).await.unwrap();
        assert_eq!(store.get(&rec.id).await.unwrap(), Some(rec));
    }

    #[tokio::test]
    async fn duplicate_id_is_a_conflict() {
        let store = InMemoryTokenStore::new();
        let rec = record(TokenPurpose::Session, false);

        store.put(rec.clone()).await.unwrap();
        let err = store.put(rec).await.unwrap_err();
        assert!(matches!(err, TokenStoreError::Conflict));
    }

    #[tokio::test]
    async fn find_by_purpose_filters_on_purpose_and_blacklist() {
        let store = InMemoryTokenStore::new();
        let rec = record(TokenPurpose::ResetPassword, true);
        store.put(rec.clone()).await.unwrap();

        // Wrong blacklist flag: invisible.
        let miss = store
            .find_by_purpose(&rec.id, TokenPurpose::ResetPassword, false)
            .await
            .unwrap();
        assert!(miss.is_none());

        // Wrong purpose: invisible.
        let miss = store
            .find_by_purpose(&rec.id, TokenPurpose::VerifyEmail, true)
            .await
            .unwrap();
        assert!(miss.is_none());

        let hit = store
            .find_by_purpose(&rec.id, TokenPurpose::ResetPassword, true)
            .await
            .unwrap();
        assert_eq!(hit, Some(rec));
    }

    #[tokio::test]
    async fn update_expiry_touches_only_expiry() {
        let store = InMemoryTokenStore::new();
        let rec = record(TokenPurpose::Session, false);
        store.put(rec.clone()).await.unwrap();

        let later = rec.expires_at + Duration::days(30);
        store.update_expiry(&rec.id, later).await.unwrap();

        let stored = store.get(&rec.id).await.unwrap().unwrap();
        assert_eq!(stored.expires_at, later);
        assert_eq!(stored.user_id, rec.user_id);
        assert_eq!(stored.purpose, rec.purpose);
    }

    #[tokio::test]
    async fn update_expiry_of_missing_row_is_not_found() {
        let store = InMemoryTokenStore::new();
        let id = TokenId::derive(&OpaqueToken::generate());
        let err = store.update_expiry(&id, Utc::now()).await.unwrap_err();
        assert!(matches!(err, TokenStoreError::NotFound));
    }

    #[tokio::test]
    async fn delete_reports_absence() {
        let store = InMemoryTokenStore::new();
        let rec = record(TokenPurpose::Session, false);
        store.put(rec.clone()).await.unwrap();

        assert!(store.delete(&rec.id).await.unwrap());
        assert!(!store.delete(&rec.id).await.unwrap());
    }

    #[tokio::test]
    async fn bulk_delete_is_scoped_to_user_and_purpose() {
        let store = InMemoryTokenStore::new();
        let user = UserId::new();

        let mut reset_a = record(TokenPurpose::ResetPassword, false);
        reset_a.user_id = user;
        let mut reset_b = record(TokenPurpose::ResetPassword, false);
        reset_b.user_id = user;
        let mut verify = record(TokenPurpose::VerifyEmail, false);
        verify.user_id = user;
        let other = record(TokenPurpose::ResetPassword, false);

        for rec in [&reset_a, &reset_b, &verify, &other] {
            store.put((*rec).clone()).await.unwrap();
        }

        let removed = store
            .delete_all_for_user(user, TokenPurpose::ResetPassword)
            .await
            .unwrap();
        assert_eq!(removed, 2);

        assert!(store.get(&verify.id).await.unwrap().is_some());
        assert!(store.get(&other.id).await.unwrap().is_some());
    }
}

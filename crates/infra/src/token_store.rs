//! Postgres-backed token store.
//!
//! The `tokens` table carries one row per outstanding token, keyed by the
//! SHA-256 digest. Uniqueness on the digest is enforced by the primary key;
//! a violation (PostgreSQL error code 23505) surfaces as
//! [`TokenStoreError::Conflict`], never as a silent overwrite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use gatehouse_auth::{TokenId, TokenPurpose, TokenRecord, TokenStore, TokenStoreError};
use gatehouse_core::UserId;

/// Token store over a sqlx connection pool. The pool is internally
/// reference-counted; cloning the store is cheap.
#[derive(Debug, Clone)]
pub struct PostgresTokenStore {
    pool: PgPool,
}

impl PostgresTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct TokenRow {
    id: String,
    user_id: Uuid,
    purpose: String,
    expires_at: DateTime<Utc>,
    blacklisted: bool,
}

impl TokenRow {
    fn into_record(self) -> Result<TokenRecord, TokenStoreError> {
        let purpose = TokenPurpose::parse(&self.purpose).ok_or_else(|| {
            TokenStoreError::Storage(format!("unknown token purpose '{}'", self.purpose))
        })?;
        Ok(TokenRecord {
            id: TokenId::from_digest(self.id),
            user_id: UserId::from_uuid(self.user_id),
            purpose,
            expires_at: self.expires_at,
            blacklisted: self.blacklisted,
        })
    }
}

fn map_db_err(err: sqlx::Error) -> TokenStoreError {
    if let sqlx::Error::Database(db) = &err {
        // 23505: unique_violation
        if db.code().as_deref() == Some("23505") {
            return TokenStoreError::Conflict;
        }
    }
    TokenStoreError::Storage(err.to_string())
}

#[async_trait]
impl TokenStore for PostgresTokenStore {
    async fn put(&self, record: TokenRecord) -> Result<(), TokenStoreError> {
        sqlx::query(
            "INSERT INTO tokens (id, user_id, purpose, expires_at, blacklisted) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(record.id.as_str())
        .bind(record.user_id.as_uuid())
        .bind(record.purpose.as_str())
        .bind(record.expires_at)
        .bind(record.blacklisted)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(())
    }

    async fn get(&self, id: &TokenId) -> Result<Option<TokenRecord>, TokenStoreError> {
        let row = sqlx::query_as::<_, TokenRow>(
            "SELECT id, user_id, purpose, expires_at, blacklisted FROM tokens WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        row.map(TokenRow::into_record).transpose()
    }

    async fn find_by_purpose(
        &self,
        id: &TokenId,
        purpose: TokenPurpose,
        blacklisted: bool,
    ) -> Result<Option<TokenRecord>, TokenStoreError> {
        let row = sqlx::query_as::<_, TokenRow>(
            "SELECT id, user_id, purpose, expires_at, blacklisted FROM tokens \
             WHERE id = $1 AND purpose = $2 AND blacklisted = $3",
        )
        .bind(id.as_str())
        .bind(purpose.as_str())
        .bind(blacklisted)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        row.map(TokenRow::into_record).transpose()
    }

    async fn update_expiry(
        &self,
        id: &TokenId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), TokenStoreError> {
        let result = sqlx::query("UPDATE tokens SET expires_at = $2 WHERE id = $1")
            .bind(id.as_str())
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(TokenStoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: &TokenId) -> Result<bool, TokenStoreError> {
        let result = sqlx::query("DELETE FROM tokens WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all_for_user(
        &self,
        user_id: UserId,
        purpose: TokenPurpose,
    ) -> Result<u64, TokenStoreError> {
        let result = sqlx::query("DELETE FROM tokens WHERE user_id = $1 AND purpose = $2")
            .bind(user_id.as_uuid())
            .bind(purpose.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;

        Ok(result.rows_affected())
    }
}

//! Postgres-backed user directory.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use gatehouse_auth::{Role, User, UserDirectory, UserDirectoryError};
use gatehouse_core::UserId;

#[derive(Debug, Clone)]
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    role: String,
    password_hash: String,
    email_verified: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId::from_uuid(row.id),
            email: row.email,
            name: row.name,
            role: Role::new(row.role),
            password_hash: row.password_hash,
            email_verified: row.email_verified,
        }
    }
}

const USER_COLUMNS: &str = "id, email, name, role, password_hash, email_verified";

fn map_db_err(err: sqlx::Error) -> UserDirectoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some("23505") {
            return UserDirectoryError::Conflict("email already taken".to_string());
        }
    }
    UserDirectoryError::Storage(err.to_string())
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, UserDirectoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(row.map(User::from))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, UserDirectoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.to_lowercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(row.map(User::from))
    }

    async fn create(&self, user: User) -> Result<(), UserDirectoryError> {
        sqlx::query(
            "INSERT INTO users (id, email, name, role, password_hash, email_verified) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(user.email_verified)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(())
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), UserDirectoryError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(UserDirectoryError::NotFound);
        }
        Ok(())
    }

    async fn mark_email_verified(&self, id: UserId) -> Result<(), UserDirectoryError> {
        let result = sqlx::query("UPDATE users SET email_verified = TRUE WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(UserDirectoryError::NotFound);
        }
        Ok(())
    }
}

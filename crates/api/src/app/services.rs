//! Service construction and environment wiring.

use std::sync::Arc;

use gatehouse_auth::{
    InMemoryTokenStore, InMemoryUserDirectory, PasswordHasher, PurposeTokenManager, RoleRights,
    SessionManager, TokenStore, UserDirectory,
};
use gatehouse_infra::{
    Argon2PasswordHasher, Mailer, PostgresTokenStore, PostgresUserDirectory, TracingMailer,
};

/// Runtime configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
        }
    }
}

/// Everything the handlers need, wired once at startup.
pub struct AppServices {
    pub sessions: SessionManager,
    pub purpose: PurposeTokenManager,
    pub users: Arc<dyn UserDirectory>,
    pub passwords: Arc<dyn PasswordHasher>,
    pub mailer: Arc<dyn Mailer>,
    pub rights: RoleRights,
}

impl AppServices {
    /// Assemble the service graph from its ports. The managers share the
    /// same store and directory handles.
    pub fn from_parts(
        store: Arc<dyn TokenStore>,
        users: Arc<dyn UserDirectory>,
        passwords: Arc<dyn PasswordHasher>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let sessions = SessionManager::new(store.clone(), users.clone());
        let purpose = PurposeTokenManager::new(store, users.clone(), passwords.clone());
        Self {
            sessions,
            purpose,
            users,
            passwords,
            mailer,
            rights: RoleRights::standard(),
        }
    }

    /// Fully in-memory services: tests and database-less development.
    pub fn in_memory() -> Self {
        Self::from_parts(
            Arc::new(InMemoryTokenStore::new()),
            Arc::new(InMemoryUserDirectory::new()),
            Arc::new(Argon2PasswordHasher::new()),
            Arc::new(TracingMailer::new()),
        )
    }

    /// Postgres-backed services; runs pending migrations on startup.
    pub async fn postgres(database_url: &str) -> anyhow::Result<Self> {
        let pool = sqlx::PgPool::connect(database_url).await?;
        gatehouse_infra::run_migrations(&pool).await?;

        Ok(Self::from_parts(
            Arc::new(PostgresTokenStore::new(pool.clone())),
            Arc::new(PostgresUserDirectory::new(pool)),
            Arc::new(Argon2PasswordHasher::new()),
            Arc::new(TracingMailer::new()),
        ))
    }

    /// Pick the backend from the configuration.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        match &config.database_url {
            Some(url) => Self::postgres(url).await,
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory stores (dev mode)");
                Ok(Self::in_memory())
            }
        }
    }
}

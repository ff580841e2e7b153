//! Infrastructure layer: Postgres adapters, password hashing, mail delivery.
//!
//! Everything here implements a port defined in `gatehouse-auth`; nothing in
//! the auth core knows these types exist.

pub mod mailer;
pub mod password;
pub mod token_store;
pub mod user_directory;

pub use mailer::{Mailer, MailerError, TracingMailer};
pub use password::Argon2PasswordHasher;
pub use token_store::PostgresTokenStore;
pub use user_directory::PostgresUserDirectory;

/// Apply the schema migrations bundled with this crate.
pub async fn run_migrations(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

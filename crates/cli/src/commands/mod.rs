//! Subcommand implementations.

pub mod init_data;
pub mod migrate;
pub mod phone;
pub mod user;

use granary_server::db::{self, RepositoryError};
use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Repository operation failed.
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Read an environment variable after loading `.env`.
pub(crate) fn require_env(key: &'static str) -> Result<String, CommandError> {
    dotenvy::dotenv().ok();
    std::env::var(key).map_err(|_| CommandError::MissingEnvVar(key))
}

/// Connect to the database named by `DATABASE_URL`.
pub(crate) async fn connect() -> Result<PgPool, CommandError> {
    let url = SecretString::from(require_env("DATABASE_URL")?);
    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&url).await?)
}

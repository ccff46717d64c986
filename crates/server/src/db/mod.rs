//! Database operations for `PostgreSQL`.
//!
//! ## Tables
//!
//! - `users` - Telegram accounts with their role
//! - `products` - Stocked products with current quantity
//! - `receipts` - Goods received into stock
//! - `shift_reports` / `shift_consumptions` - End-of-shift usage
//! - `access_requests` - Guest requests for operator access
//! - `allowed_phones` - Phone allowlist for the contact-sharing flow
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p granary-cli -- migrate
//! ```
//!
//! Repositories take a pool for standalone queries. Steps that must commit
//! together with others are free functions over `&mut PgConnection` so the
//! services can run them inside one transaction.

pub mod access_requests;
pub mod allowed_phones;
pub mod products;
pub mod receipts;
pub mod shifts;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use access_requests::AccessRequestRepository;
pub use allowed_phones::AllowedPhoneRepository;
pub use products::ProductRepository;
pub use receipts::ReceiptRepository;
pub use shifts::ShiftRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique product name).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique violation to [`RepositoryError::Conflict`], anything else
    /// to [`RepositoryError::Database`].
    pub(crate) fn unique_violation(e: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

//! Integration tests for Granary.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p granary-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `init_data` - Mini-app init data signing and verification
//! - `bot_messages` - Bot replies, keyboards and callback data
//! - `access_workflow` - Access request status transitions
//! - `api_router` - REST routing, authentication and middleware
//! - `config` - Environment configuration
//! - `db_workflows` - Access requests, the phone gate and stock movements
//!   against Postgres
//!
//! The router tests use a lazily connected pool and only hit paths that are
//! rejected before any query. `db_workflows` needs a database and is ignored
//! by default:
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/granary cargo test -p granary-integration-tests -- --ignored
//! ```

use axum::Router;
use granary_core::{Role, TelegramId};
use granary_server::config::AppConfig;
use granary_server::db::UserRepository;
use granary_server::db::users::ProfileUpsert;
use granary_server::models::User;
use granary_server::routes;
use granary_server::services::Notifier;
use granary_server::state::AppState;
use granary_server::telegram::TelegramClient;
use secrecy::SecretString;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Bot token used to sign test payloads.
pub const TEST_BOT_TOKEN: &str = "7012345678:AAHk3vQ9xZp2LmN8rT5wYb4cD6eF1gH0jKs";

/// Bot API base that refuses connections, so notifications fail fast.
pub const UNREACHABLE_API_BASE: &str = "http://127.0.0.1:9";

/// Database URL that is never connected to.
pub const TEST_DATABASE_URL: &str = "postgres://localhost/granary_test";

/// Load configuration from `pairs` on top of the required variables.
///
/// # Panics
///
/// Panics if the configuration is invalid.
#[must_use]
pub fn test_config(pairs: &[(&str, &str)]) -> AppConfig {
    AppConfig::from_lookup(|key| {
        pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| (*v).to_string())
            .or_else(|| match key {
                "DATABASE_URL" => Some(TEST_DATABASE_URL.to_string()),
                "TG_BOT_TOKEN" => Some(TEST_BOT_TOKEN.to_string()),
                _ => None,
            })
    })
    .expect("test configuration is valid")
}

/// The full application over a pool that never connects.
///
/// Must be called inside a Tokio runtime.
///
/// # Panics
///
/// Panics if the pool cannot be created.
#[must_use]
pub fn test_app() -> Router {
    let pool = PgPoolOptions::new()
        .connect_lazy(TEST_DATABASE_URL)
        .expect("lazy pool");
    routes::app(AppState::new(test_config(&[]), pool))
}

/// A notifier whose sends all fail and are only logged.
#[must_use]
pub fn offline_notifier(pool: &PgPool) -> Notifier {
    let telegram = TelegramClient::new(
        UNREACHABLE_API_BASE,
        SecretString::from(TEST_BOT_TOKEN),
    );
    Notifier::new(
        pool.clone(),
        telegram,
        Vec::new(),
        "https://app.example.org".to_string(),
    )
}

/// Insert a user with the given role.
///
/// # Panics
///
/// Panics if the database rejects the insert.
pub async fn seed_user(pool: &PgPool, telegram_id: i64, role: Role) -> User {
    let users = UserRepository::new(pool);
    let telegram_id = TelegramId::new(telegram_id);
    users
        .upsert_profile(
            ProfileUpsert {
                telegram_id,
                username: None,
                first_name: Some("Тест"),
                last_name: None,
            },
            None,
        )
        .await
        .expect("insert user");
    users
        .set_role_by_telegram_id(telegram_id, role)
        .await
        .expect("set role")
}

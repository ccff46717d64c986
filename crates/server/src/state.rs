//! Application state shared across handlers and the bot loop.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::services::Notifier;
use crate::telegram::TelegramClient;

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    telegram: TelegramClient,
    notifier: Notifier,
}

impl AppState {
    /// Build the state, creating the Bot API client from the config.
    #[must_use]
    pub fn new(config: AppConfig, pool: PgPool) -> Self {
        let telegram = TelegramClient::new(
            config.telegram.api_base.clone(),
            config.telegram.bot_token.clone(),
        );
        let notifier = Notifier::new(
            pool.clone(),
            telegram.clone(),
            config.telegram.admin_chat_ids.clone(),
            config.webapp_url.to_string(),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                telegram,
                notifier,
            }),
        }
    }

    /// Application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Database pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Bot API client.
    #[must_use]
    pub fn telegram(&self) -> &TelegramClient {
        &self.inner.telegram
    }

    /// Best-effort notification sender.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }
}

//! Telegram bot: long polling and update dispatch.
//!
//! # Flow
//!
//! 1. Register the command menu with `setMyCommands`
//! 2. Long-poll `getUpdates`, advancing the offset past each handled update
//! 3. Upsert the sender, then route commands, button presses, contacts and
//!    product entries to the services
//!
//! A failing handler is logged and reported to the chat; it never stops the
//! loop. Polling errors back off exponentially up to a minute.

mod command;
mod handlers;

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

pub use command::{CallbackAction, Command, ProductInput, ProductInputParser};

use crate::state::AppState;
use crate::telegram::BotCommand;

/// Server-side long-poll timeout for `getUpdates`.
pub const POLL_TIMEOUT_SECS: u64 = 30;

/// Upper bound for the retry delay after polling errors.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Commands shown in the client's menu.
#[must_use]
pub fn menu_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("start", "Начать работу"),
        BotCommand::new("menu", "Открыть главное меню"),
        BotCommand::new("inventory", "Показать остатки"),
        BotCommand::new("add", "Добавить товар"),
    ]
}

/// Delay before the next poll after `failures` consecutive errors.
#[must_use]
pub fn backoff(failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(6);
    Duration::from_secs(1_u64 << exponent).min(MAX_BACKOFF)
}

/// The long-polling bot.
pub struct Bot {
    state: AppState,
    products: ProductInputParser,
}

impl Bot {
    /// Create a bot over the shared application state.
    ///
    /// # Errors
    ///
    /// Returns error if the product entry pattern fails to compile.
    pub fn new(state: AppState) -> Result<Self, regex::Error> {
        Ok(Self {
            state,
            products: ProductInputParser::new()?,
        })
    }

    /// Poll for updates until `shutdown` flips to `true` or its sender drops.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let telegram = self.state.telegram();

        match telegram.get_me().await {
            Ok(me) => info!(bot = ?me.username, "Telegram bot connected"),
            Err(e) => warn!(error = %e, "Failed to identify bot"),
        }
        if let Err(e) = telegram.set_my_commands(&menu_commands()).await {
            warn!(error = %e, "Failed to register bot commands");
        }

        let mut offset: Option<i64> = None;
        let mut failures: u32 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let polled = tokio::select! {
                _ = shutdown.changed() => break,
                polled = telegram.get_updates(offset, POLL_TIMEOUT_SECS) => polled,
            };

            match polled {
                Ok(updates) => {
                    failures = 0;
                    if !updates.is_empty() {
                        debug!(count = updates.len(), "Received updates");
                    }
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        self.handle_update(update).await;
                    }
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let delay = backoff(failures);
                    warn!(error = %e, failures, delay_secs = delay.as_secs(), "Polling failed");

                    tokio::select! {
                        _ = shutdown.changed() => break,
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        info!("Telegram bot stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        assert_eq!(backoff(1), Duration::from_secs(1));
        assert_eq!(backoff(2), Duration::from_secs(2));
        assert_eq!(backoff(4), Duration::from_secs(8));
        assert_eq!(backoff(6), Duration::from_secs(32));
        assert_eq!(backoff(7), MAX_BACKOFF);
        assert_eq!(backoff(100), MAX_BACKOFF);
    }

    #[test]
    fn test_menu_commands() {
        let names: Vec<_> = menu_commands().into_iter().map(|c| c.command).collect();
        assert_eq!(names, ["start", "menu", "inventory", "add"]);
    }
}

//! Telegram-related errors.

use thiserror::Error;

/// Errors that can occur when talking to the Bot API.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// HTTP request failed (the URL is stripped because it embeds the token).
    #[error("Telegram request failed: {0}")]
    Request(String),

    /// Failed to parse response.
    #[error("Telegram response error: {0}")]
    Response(String),

    /// Bot API returned `ok: false`.
    #[error("Telegram API error {code}: {description}")]
    Api {
        /// `error_code` from the response (0 when absent).
        code: i32,
        /// Human-readable `description` from the response.
        description: String,
    },
}

impl TelegramError {
    /// The bot was blocked or the chat no longer exists.
    #[must_use]
    pub const fn is_unreachable_chat(&self) -> bool {
        matches!(self, Self::Api { code: 403, .. })
    }
}

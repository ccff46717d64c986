//! Telegram Bot API client.
//!
//! Provides the handful of methods the bot and the notification service use.
//! Every call is a JSON `POST` to `{api_base}/bot{token}/{method}`.

use std::time::Duration;

use granary_core::TelegramId;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::error::TelegramError;
use super::types::{ApiResponse, BotCommand, Message, OutgoingMessage, SendMessage, Update, User};

/// Timeout for regular (non long-poll) calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Bot API client.
#[derive(Clone)]
pub struct TelegramClient {
    /// HTTP client.
    client: Client,
    /// Bot API base URL without trailing slash.
    api_base: String,
    /// Bot token for authentication.
    bot_token: SecretString,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_base", &self.api_base)
            .field("bot_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    /// Create a new Bot API client.
    #[must_use]
    pub fn new(api_base: impl Into<String>, bot_token: SecretString) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
            bot_token,
        }
    }

    /// Full URL for a Bot API method. Contains the token; never log it.
    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.api_base,
            self.bot_token.expose_secret()
        )
    }

    async fn call<P, R>(&self, method: &str, params: &P, timeout: Duration) -> Result<R, TelegramError>
    where
        P: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.method_url(method))
            .timeout(timeout)
            .json(params)
            .send()
            .await
            .map_err(|e| TelegramError::Request(e.without_url().to_string()))?;

        let body: ApiResponse<R> = response
            .json()
            .await
            .map_err(|e| TelegramError::Response(e.without_url().to_string()))?;

        into_result(body)
    }

    /// Identify the bot.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Telegram returns an error.
    #[instrument(skip(self))]
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &serde_json::json!({}), REQUEST_TIMEOUT)
            .await
    }

    /// Long-poll for updates after `offset`.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Telegram returns an error.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        #[derive(Serialize)]
        struct GetUpdates {
            #[serde(skip_serializing_if = "Option::is_none")]
            offset: Option<i64>,
            timeout: u64,
            allowed_updates: [&'static str; 2],
        }

        let params = GetUpdates {
            offset,
            timeout: timeout_secs,
            allowed_updates: ["message", "callback_query"],
        };

        // The HTTP timeout must outlast the server-side long poll
        let http_timeout = Duration::from_secs(timeout_secs) + REQUEST_TIMEOUT;
        self.call("getUpdates", &params, http_timeout).await
    }

    /// Send a message to a chat.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Telegram returns an error.
    #[instrument(skip(self, message), fields(chat_id = %chat_id))]
    pub async fn send_message(
        &self,
        chat_id: TelegramId,
        message: &OutgoingMessage,
    ) -> Result<Message, TelegramError> {
        let params = SendMessage {
            chat_id,
            text: &message.text,
            parse_mode: "HTML",
            reply_markup: message.reply_markup.as_ref(),
        };

        let sent: Message = self.call("sendMessage", &params, REQUEST_TIMEOUT).await?;
        debug!(message_id = sent.message_id, "Message sent to Telegram");
        Ok(sent)
    }

    /// Delete a message.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Telegram returns an error.
    #[instrument(skip(self), fields(chat_id = %chat_id))]
    pub async fn delete_message(
        &self,
        chat_id: TelegramId,
        message_id: i64,
    ) -> Result<(), TelegramError> {
        let params = serde_json::json!({ "chat_id": chat_id, "message_id": message_id });
        let _: bool = self.call("deleteMessage", &params, REQUEST_TIMEOUT).await?;
        Ok(())
    }

    /// Acknowledge a callback query, optionally showing a toast.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Telegram returns an error.
    #[instrument(skip(self, text))]
    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> Result<(), TelegramError> {
        let params = serde_json::json!({
            "callback_query_id": callback_query_id,
            "text": text,
        });
        let _: bool = self
            .call("answerCallbackQuery", &params, REQUEST_TIMEOUT)
            .await?;
        Ok(())
    }

    /// Replace the bot's command menu.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Telegram returns an error.
    #[instrument(skip(self, commands))]
    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<(), TelegramError> {
        let params = serde_json::json!({ "commands": commands });
        let _: bool = self.call("setMyCommands", &params, REQUEST_TIMEOUT).await?;
        Ok(())
    }
}

/// Unwrap a Bot API envelope.
fn into_result<T>(body: ApiResponse<T>) -> Result<T, TelegramError> {
    if !body.ok {
        let description = body
            .description
            .unwrap_or_else(|| "Unknown error".to_string());
        warn!(code = ?body.error_code, error = %description, "Telegram API error");
        return Err(TelegramError::Api {
            code: body.error_code.unwrap_or_default(),
            description,
        });
    }

    body.result
        .ok_or_else(|| TelegramError::Response("missing result".to_string()))
}

//! Bot API types.
//!
//! These types represent the subset of the Telegram Bot API needed for long
//! polling, inline keyboards and contact sharing.
//!
//! See: <https://core.telegram.org/bots/api>

use granary_core::TelegramId;
use serde::{Deserialize, Serialize};

/// Envelope every Bot API method responds with.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i32>,
}

/// An incoming update from `getUpdates`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

impl Update {
    /// The account that triggered the update.
    #[must_use]
    pub fn sender(&self) -> Option<&User> {
        self.message
            .as_ref()
            .and_then(|m| m.from.as_ref())
            .or_else(|| self.callback_query.as_ref().map(|q| &q.from))
    }
}

/// A chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub date: i64,
    pub text: Option<String>,
    pub contact: Option<Contact>,
}

/// A Telegram account.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: TelegramId,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

/// A chat.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: TelegramId,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A shared phone contact.
#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    pub phone_number: String,
    pub first_name: String,
    pub last_name: Option<String>,
    /// Set when the contact is a Telegram user.
    pub user_id: Option<TelegramId>,
}

/// A button press on an inline keyboard.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

/// A bot command shown in the client's menu.
#[derive(Debug, Clone, Serialize)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}

impl BotCommand {
    #[must_use]
    pub fn new(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
        }
    }
}

// =============================================================================
// Keyboards
// =============================================================================

/// Any of the keyboards a message can carry.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Inline(InlineKeyboardMarkup),
    Keyboard(ReplyKeyboardMarkup),
    Remove(ReplyKeyboardRemove),
}

/// Buttons attached below a message.
#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

/// An inline keyboard button. Exactly one action field is set.
#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_app: Option<WebAppInfo>,
}

impl InlineKeyboardButton {
    /// Button that sends `data` back as a callback query.
    #[must_use]
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: Some(data.into()),
            web_app: None,
        }
    }

    /// Button that opens the mini-app.
    #[must_use]
    pub fn web_app(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: None,
            web_app: Some(WebAppInfo { url: url.into() }),
        }
    }
}

/// Mini-app launch target.
#[derive(Debug, Clone, Serialize)]
pub struct WebAppInfo {
    pub url: String,
}

/// Custom keyboard replacing the client's text keyboard.
#[derive(Debug, Clone, Serialize)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub resize_keyboard: bool,
    pub one_time_keyboard: bool,
}

/// A reply keyboard button.
#[derive(Debug, Clone, Serialize)]
pub struct KeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub request_contact: bool,
}

/// Hides a previously shown reply keyboard.
#[derive(Debug, Clone, Serialize)]
pub struct ReplyKeyboardRemove {
    pub remove_keyboard: bool,
}

impl Default for ReplyKeyboardRemove {
    fn default() -> Self {
        Self {
            remove_keyboard: true,
        }
    }
}

// =============================================================================
// Outgoing
// =============================================================================

/// A message ready to send to any chat.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    /// HTML-formatted text.
    pub text: String,
    pub reply_markup: Option<ReplyMarkup>,
}

impl OutgoingMessage {
    /// Text without a keyboard.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reply_markup: None,
        }
    }

    /// Attach an inline keyboard.
    #[must_use]
    pub fn with_inline(mut self, rows: Vec<Vec<InlineKeyboardButton>>) -> Self {
        self.reply_markup = Some(ReplyMarkup::Inline(InlineKeyboardMarkup {
            inline_keyboard: rows,
        }));
        self
    }

    /// Attach a reply keyboard or keyboard removal.
    #[must_use]
    pub fn with_markup(mut self, markup: ReplyMarkup) -> Self {
        self.reply_markup = Some(markup);
        self
    }
}

/// `sendMessage` parameters.
#[derive(Debug, Serialize)]
pub(super) struct SendMessage<'a> {
    pub chat_id: TelegramId,
    pub text: &'a str,
    pub parse_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<&'a ReplyMarkup>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_contact_update() {
        let raw = r#"{
            "update_id": 10,
            "message": {
                "message_id": 5,
                "from": {"id": 239676985, "is_bot": false, "first_name": "Ivan"},
                "chat": {"id": 239676985, "type": "private"},
                "date": 1700000000,
                "contact": {"phone_number": "79001234567", "first_name": "Ivan", "user_id": 239676985}
            }
        }"#;
        let update: Update = serde_json::from_str(raw).unwrap();
        let message = update.message.as_ref().unwrap();
        assert_eq!(
            message.contact.as_ref().unwrap().user_id,
            Some(TelegramId::new(239_676_985))
        );
        assert_eq!(update.sender().unwrap().first_name, "Ivan");
    }

    #[test]
    fn test_deserialize_callback_update() {
        let raw = r#"{
            "update_id": 11,
            "callback_query": {
                "id": "abc",
                "from": {"id": 1, "is_bot": false, "first_name": "Admin", "username": "boss"},
                "data": "approve_access:7"
            }
        }"#;
        let update: Update = serde_json::from_str(raw).unwrap();
        assert_eq!(update.sender().unwrap().username.as_deref(), Some("boss"));
        assert_eq!(
            update.callback_query.unwrap().data.as_deref(),
            Some("approve_access:7")
        );
    }

    #[test]
    fn test_inline_button_serialization() {
        let markup = ReplyMarkup::Inline(InlineKeyboardMarkup {
            inline_keyboard: vec![vec![
                InlineKeyboardButton::callback("Yes", "approve_access:1"),
                InlineKeyboardButton::web_app("Open", "https://app.example.org"),
            ]],
        });
        let json = serde_json::to_value(&markup).unwrap();
        let row = &json["inline_keyboard"][0];
        assert_eq!(row[0]["callback_data"], "approve_access:1");
        assert!(row[0].get("web_app").is_none());
        assert_eq!(row[1]["web_app"]["url"], "https://app.example.org");
    }

    #[test]
    fn test_contact_button_serialization() {
        let markup = ReplyMarkup::Keyboard(ReplyKeyboardMarkup {
            keyboard: vec![vec![
                KeyboardButton {
                    text: "Share".to_string(),
                    request_contact: true,
                },
                KeyboardButton {
                    text: "Plain".to_string(),
                    request_contact: false,
                },
            ]],
            resize_keyboard: true,
            one_time_keyboard: true,
        });
        let json = serde_json::to_value(&markup).unwrap();
        assert_eq!(json["keyboard"][0][0]["request_contact"], true);
        assert!(json["keyboard"][0][1].get("request_contact").is_none());
    }
}

//! Telegram Bot API integration.
//!
//! This module provides:
//! - [`TelegramClient`] for polling updates and sending messages
//! - Bot API types for updates, keyboards and contacts
//! - Message builders for menus, stock lists and access notifications
//!
//! # Flow
//!
//! 1. The bot loop long-polls `getUpdates`
//! 2. Each update is dispatched by [`crate::bot`]
//! 3. Replies and notifications are built here and sent with `sendMessage`

mod client;
mod error;
pub mod messages;
mod types;

pub use client::TelegramClient;
pub use error::TelegramError;
pub use types::{
    BotCommand, CallbackQuery, Chat, Contact, InlineKeyboardButton, InlineKeyboardMarkup,
    KeyboardButton, Message, OutgoingMessage, ReplyKeyboardMarkup, ReplyKeyboardRemove,
    ReplyMarkup, Update, User, WebAppInfo,
};

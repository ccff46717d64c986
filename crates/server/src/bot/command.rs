//! Parsing of bot commands, callback data and product entry text.

use granary_core::AccessRequestId;
use regex::Regex;

use crate::telegram::messages::{
    CALLBACK_ADD, CALLBACK_APPROVE_PREFIX, CALLBACK_DECLINE_PREFIX, CALLBACK_INVENTORY,
};

/// `name;quantity;min_threshold`
const PRODUCT_INPUT_PATTERN: &str = r"^(.+);\s*(\d+)\s*;\s*(\d+)$";

/// A slash command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Menu,
    Inventory,
    Add,
}

impl Command {
    /// Parse `/command`, `/command@botname` or `/command args`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?.strip_prefix('/')?;
        let name = word.split_once('@').map_or(word, |(name, _)| name);

        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "menu" => Some(Self::Menu),
            "inventory" => Some(Self::Inventory),
            "add" => Some(Self::Add),
            _ => None,
        }
    }
}

/// An inline button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Inventory,
    Add,
    Approve(AccessRequestId),
    Decline(AccessRequestId),
}

impl CallbackAction {
    /// Parse callback data.
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        if data == CALLBACK_INVENTORY {
            return Some(Self::Inventory);
        }
        if data == CALLBACK_ADD {
            return Some(Self::Add);
        }
        if let Some(id) = data.strip_prefix(CALLBACK_APPROVE_PREFIX) {
            return id.parse().ok().map(Self::Approve);
        }
        if let Some(id) = data.strip_prefix(CALLBACK_DECLINE_PREFIX) {
            return id.parse().ok().map(Self::Decline);
        }
        None
    }
}

/// A product typed into the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInput {
    pub name: String,
    pub quantity: i32,
    pub min_threshold: i32,
}

/// Matches `name;quantity;min_threshold` messages.
#[derive(Debug, Clone)]
pub struct ProductInputParser {
    pattern: Regex,
}

impl ProductInputParser {
    /// Compile the entry pattern.
    ///
    /// # Errors
    ///
    /// Returns error if the pattern fails to compile.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(PRODUCT_INPUT_PATTERN)?,
        })
    }

    /// Parse a message, or `None` if it is not a product entry.
    #[must_use]
    pub fn parse(&self, text: &str) -> Option<ProductInput> {
        let captures = self.pattern.captures(text.trim())?;

        let name = captures.get(1)?.as_str().trim();
        if name.is_empty() {
            return None;
        }

        Some(ProductInput {
            name: name.to_string(),
            quantity: captures.get(2)?.as_str().parse().ok()?,
            min_threshold: captures.get(3)?.as_str().parse().ok()?,
        })
    }
}

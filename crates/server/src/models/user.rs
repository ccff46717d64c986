//! User domain types.

use chrono::{DateTime, Utc};
use granary_core::{PhoneNumber, Role, TelegramId, UserId};
use serde::{Deserialize, Serialize};

/// A user known to the system (domain type).
///
/// Every Telegram account that talks to the bot or opens the mini-app gets a
/// row, starting with [`Role::Guest`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Database ID.
    pub id: UserId,
    /// Telegram account ID (also the private chat ID).
    pub telegram_id: TelegramId,
    /// Telegram `@username`, without the `@`.
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Phone bound through the contact-sharing flow.
    pub phone: Option<PhoneNumber>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Human-readable name for chat messages.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if !full.is_empty() {
            return full;
        }
        self.username
            .as_ref()
            .map_or_else(|| format!("id{}", self.telegram_id), |u| format!("@{u}"))
    }
}

/// Partial update for a user. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserChanges {
    pub role: Option<Role>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<PhoneNumber>,
}

impl UserChanges {
    /// Whether the update touches no field.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.role.is_none()
            && self.username.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(first: Option<&str>, last: Option<&str>, username: Option<&str>) -> User {
        User {
            id: UserId::new(1),
            telegram_id: TelegramId::new(239_676_985),
            username: username.map(String::from),
            first_name: first.map(String::from),
            last_name: last.map(String::from),
            phone: None,
            role: Role::Guest,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(
            user(Some("Ivan"), Some("Petrov"), Some("ivan")).display_name(),
            "Ivan Petrov"
        );
        assert_eq!(user(None, None, Some("ivan")).display_name(), "@ivan");
        assert_eq!(user(None, None, None).display_name(), "id239676985");
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(user(Some("Ivan"), None, None)).unwrap();
        assert_eq!(json["telegramId"], 239_676_985);
        assert_eq!(json["firstName"], "Ivan");
        assert_eq!(json["role"], "GUEST");
    }

    #[test]
    fn test_changes_validate_phone() {
        let changes: UserChanges =
            serde_json::from_str(r#"{"role":"ADMIN","phone":"8 (900) 111-22-33"}"#).unwrap();
        assert_eq!(changes.role, Some(Role::Admin));
        assert_eq!(changes.phone.unwrap().as_str(), "+89001112233");
        assert!(serde_json::from_str::<UserChanges>(r#"{"phone":"nope"}"#).is_err());
        assert!(UserChanges::default().is_empty());
    }
}

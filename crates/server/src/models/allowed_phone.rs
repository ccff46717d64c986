//! Phone allowlist entry.

use chrono::{DateTime, Utc};
use granary_core::{AllowedPhoneId, PhoneNumber, UserId};
use serde::Serialize;

/// A pre-approved phone number. Sharing it through the bot grants
/// operator access to the first account that does so.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedPhone {
    pub id: AllowedPhoneId,
    pub phone: PhoneNumber,
    pub comment: Option<String>,
    /// Account the phone is bound to, once used.
    pub used_by_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl AllowedPhone {
    /// The phone can still be claimed by `user`.
    #[must_use]
    pub fn is_available_to(&self, user: UserId) -> bool {
        self.used_by_id.is_none_or(|owner| owner == user)
    }
}

//! Access request domain types.

use chrono::{DateTime, Utc};
use granary_core::{AccessRequestId, AccessRequestStatus, TelegramId, UserId};
use serde::Serialize;

/// A guest's request for operator access.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequest {
    pub id: AccessRequestId,
    pub user_id: UserId,
    pub status: AccessRequestStatus,
    /// Free-form note from the applicant.
    pub message: Option<String>,
    /// Reviewer's note, sent to the applicant on decline.
    pub admin_note: Option<String>,
    pub processed_by: Option<UserId>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Who asked for access.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Applicant {
    pub telegram_id: TelegramId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Applicant {
    /// Name shown to reviewers.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if full.is_empty() {
            "Без имени".to_string()
        } else {
            full
        }
    }
}

/// An access request together with its applicant, as listed to reviewers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequestView {
    #[serde(flatten)]
    pub request: AccessRequest,
    pub applicant: Applicant,
}

//! Bot notifications for reviewers and applicants.
//!
//! Delivery is best-effort: a failed send is logged and reported to the caller
//! as `false`, never as an error, so the operation that triggered it still
//! succeeds.

use granary_core::TelegramId;
use sqlx::PgPool;
use tracing::{debug, error, info, instrument, warn};

use crate::db::UserRepository;
use crate::models::{AccessRequestView, Product};
use crate::telegram::{OutgoingMessage, TelegramClient, messages};

/// Sends bot messages on behalf of the services.
#[derive(Debug, Clone)]
pub struct Notifier {
    pool: PgPool,
    telegram: TelegramClient,
    /// Fixed reviewer chats; when empty, OWNER and ADMIN users are used.
    admin_chat_ids: Vec<TelegramId>,
    webapp_url: String,
}

impl Notifier {
    /// Create a new notifier.
    #[must_use]
    pub const fn new(
        pool: PgPool,
        telegram: TelegramClient,
        admin_chat_ids: Vec<TelegramId>,
        webapp_url: String,
    ) -> Self {
        Self {
            pool,
            telegram,
            admin_chat_ids,
            webapp_url,
        }
    }

    /// Mini-app URL used for "open app" buttons.
    #[must_use]
    pub fn webapp_url(&self) -> &str {
        &self.webapp_url
    }

    /// Send a message, logging instead of failing.
    pub async fn send(&self, chat_id: TelegramId, message: &OutgoingMessage) -> bool {
        match self.telegram.send_message(chat_id, message).await {
            Ok(_) => true,
            Err(e) if e.is_unreachable_chat() => {
                warn!(chat_id = %chat_id, error = %e, "Chat unreachable, notification dropped");
                false
            }
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "Failed to send notification");
                false
            }
        }
    }

    /// Chats that receive reviewer notifications.
    pub async fn reviewer_chats(&self) -> Vec<TelegramId> {
        if !self.admin_chat_ids.is_empty() {
            return self.admin_chat_ids.clone();
        }

        match UserRepository::new(&self.pool).list_notification_admins().await {
            Ok(admins) => admins.into_iter().map(|u| u.telegram_id).collect(),
            Err(e) => {
                error!(error = %e, "Failed to load notification recipients");
                Vec::new()
            }
        }
    }

    /// Send the message to every reviewer. Returns how many were delivered.
    async fn broadcast(&self, message: &OutgoingMessage) -> usize {
        let chats = self.reviewer_chats().await;
        if chats.is_empty() {
            warn!("No reviewers to notify");
            return 0;
        }

        let mut delivered = 0;
        for chat_id in chats {
            if self.send(chat_id, message).await {
                delivered += 1;
            }
        }
        delivered
    }

    /// Ask reviewers to approve or decline a request.
    #[instrument(skip(self, view), fields(request_id = %view.request.id))]
    pub async fn notify_reviewers(&self, view: &AccessRequestView) -> usize {
        let delivered = self
            .broadcast(&messages::access_request_for_review(view))
            .await;
        info!(delivered, "Access request sent for review");
        delivered
    }

    /// Tell an applicant they were approved.
    #[instrument(skip(self, admin_note))]
    pub async fn notify_approved(&self, chat_id: TelegramId, admin_note: Option<&str>) -> bool {
        self.send(
            chat_id,
            &messages::access_approved(admin_note, &self.webapp_url),
        )
        .await
    }

    /// Tell an applicant they were declined.
    #[instrument(skip(self, admin_note))]
    pub async fn notify_declined(&self, chat_id: TelegramId, admin_note: Option<&str>) -> bool {
        self.send(chat_id, &messages::access_declined(admin_note))
            .await
    }

    /// Warn reviewers about products below their minimum threshold.
    ///
    /// Returns how many messages were delivered across all reviewers.
    #[instrument(skip(self, products), fields(count = products.len()))]
    pub async fn notify_low_stock(&self, products: &[Product]) -> usize {
        if products.is_empty() {
            debug!("No low-stock products to report");
            return 0;
        }
        let mut delivered = 0;
        for page in messages::low_stock_alert(products) {
            delivered += self.broadcast(&page).await;
        }
        delivered
    }
}

//! Phone allowlist gate.
//!
//! A guest shares their own contact with the bot. If the number is on the
//! allowlist the account is linked and promoted; otherwise the number is
//! forwarded to reviewers as an access request.

use granary_core::{AllowedPhoneId, PhoneNumber, Role, TelegramId};
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use super::access::AccessService;
use super::notifications::Notifier;
use crate::db::{AccessRequestRepository, AllowedPhoneRepository, allowed_phones, users};
use crate::error::AppError;
use crate::models::{AccessRequest, AllowedPhone, User};
use crate::telegram::messages;

/// Result of sharing a contact.
#[derive(Debug)]
pub enum LinkOutcome {
    /// The contact belongs to someone other than the sender.
    ForeignContact,
    /// The phone was allowlisted and is now bound to the user.
    Linked { promoted: bool },
    /// The phone is bound to a different account.
    Taken,
    /// The user already has staff access; nothing to do.
    AlreadyStaff,
    /// A request from this user is already waiting for review.
    AlreadyPending,
    /// The phone is not allowlisted; a request was opened.
    Forwarded(AccessRequest),
}

/// Service for the allowlist and the contact-sharing flow.
pub struct PhoneGate<'a> {
    pool: &'a PgPool,
    notifier: &'a Notifier,
}

impl<'a> PhoneGate<'a> {
    /// Create a new phone gate.
    #[must_use]
    pub const fn new(pool: &'a PgPool, notifier: &'a Notifier) -> Self {
        Self { pool, notifier }
    }

    /// Handle a contact shared by `sender`.
    ///
    /// `contact_owner` is the Telegram account the contact belongs to, if
    /// Telegram reported one.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the phone cannot be parsed, or a
    /// database error.
    #[instrument(skip(self, user, raw_phone), fields(user_id = %user.id))]
    pub async fn link_contact(
        &self,
        user: &User,
        sender: TelegramId,
        contact_owner: Option<TelegramId>,
        raw_phone: &str,
    ) -> Result<LinkOutcome, AppError> {
        if contact_owner != Some(sender) {
            warn!("Contact does not belong to the sender");
            return Ok(LinkOutcome::ForeignContact);
        }

        let phone = PhoneNumber::parse(raw_phone)
            .map_err(|e| AppError::BadRequest(format!("invalid phone: {e}")))?;

        let mut tx = self.pool.begin().await?;

        if let Some(entry) = allowed_phones::lock_by_phone(&mut tx, &phone).await? {
            if !entry.is_available_to(user.id) {
                info!(phone_id = %entry.id, "Allowlisted phone is bound to another user");
                return Ok(LinkOutcome::Taken);
            }

            if entry.used_by_id.is_none() {
                allowed_phones::bind_to_user(&mut tx, entry.id, user.id).await?;
            }
            users::set_phone(&mut tx, user.id, &phone).await?;
            let promoted = users::promote_guest(&mut tx, user.id, Role::Operator).await?;
            tx.commit().await?;

            info!(phone_id = %entry.id, promoted, "Phone linked");
            return Ok(LinkOutcome::Linked { promoted });
        }

        // Not allowlisted; keep the number on the profile for reviewers
        users::set_phone(&mut tx, user.id, &phone).await?;
        tx.commit().await?;

        if user.role.is_staff() {
            return Ok(LinkOutcome::AlreadyStaff);
        }

        if AccessRequestRepository::new(self.pool)
            .find_pending_for_user(user.id)
            .await?
            .is_some()
        {
            return Ok(LinkOutcome::AlreadyPending);
        }

        let note = messages::phone_request_note(&phone);
        let request = AccessService::new(self.pool, self.notifier)
            .request_access(user, Some(&note))
            .await?;

        Ok(LinkOutcome::Forwarded(request))
    }

    /// Add a phone to the allowlist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an unparseable phone and a conflict
    /// if it is already listed.
    #[instrument(skip(self, comment))]
    pub async fn add_phone(
        &self,
        raw_phone: &str,
        comment: Option<&str>,
    ) -> Result<AllowedPhone, AppError> {
        let phone = PhoneNumber::parse(raw_phone)
            .map_err(|e| AppError::BadRequest(format!("invalid phone: {e}")))?;
        let comment = comment.map(str::trim).filter(|c| !c.is_empty());

        let entry = AllowedPhoneRepository::new(self.pool)
            .add(&phone, comment)
            .await?;
        info!(phone_id = %entry.id, "Phone allowlisted");
        Ok(entry)
    }

    /// The whole allowlist, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub async fn list(&self) -> Result<Vec<AllowedPhone>, AppError> {
        Ok(AllowedPhoneRepository::new(self.pool).list().await?)
    }

    /// Remove an allowlist entry. A user already linked keeps their role.
    ///
    /// # Errors
    ///
    /// Returns not found if the entry does not exist.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: AllowedPhoneId) -> Result<(), AppError> {
        AllowedPhoneRepository::new(self.pool).delete(id).await?;
        info!(phone_id = %id, "Phone removed from allowlist");
        Ok(())
    }
}

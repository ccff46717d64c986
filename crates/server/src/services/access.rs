//! Access request workflow.
//!
//! A guest asks for access, reviewers are notified with approve/decline
//! buttons, and a decision moves the request out of `PENDING` exactly once:
//! 1. `request_access` opens the request and notifies reviewers
//! 2. `approve` or `decline` records the decision in one transaction
//! 3. The applicant is told the outcome by the bot

use granary_core::{AccessRequestId, AccessRequestStatus, Decision, Role};
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use super::notifications::Notifier;
use crate::db::{AccessRequestRepository, access_requests, users};
use crate::error::AppError;
use crate::models::{AccessRequest, AccessRequestView, User};

/// Role granted on approval.
const GRANTED_ROLE: Role = Role::Operator;

/// Service for opening and deciding access requests.
pub struct AccessService<'a> {
    pool: &'a PgPool,
    notifier: &'a Notifier,
}

impl<'a> AccessService<'a> {
    /// Create a new access service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, notifier: &'a Notifier) -> Self {
        Self { pool, notifier }
    }

    /// Open a request for `user` and notify reviewers.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the user already has staff access and
    /// `AppError::Conflict` if a request is already pending.
    #[instrument(skip(self, user, message), fields(user_id = %user.id))]
    pub async fn request_access(
        &self,
        user: &User,
        message: Option<&str>,
    ) -> Result<AccessRequest, AppError> {
        if user.role.is_staff() {
            return Err(AppError::BadRequest("user already has access".to_string()));
        }

        let repo = AccessRequestRepository::new(self.pool);
        if repo.find_pending_for_user(user.id).await?.is_some() {
            return Err(AppError::Conflict(
                "access request already pending".to_string(),
            ));
        }

        let message = message.map(str::trim).filter(|m| !m.is_empty());
        let request = repo.create(user.id, message).await?;
        info!(request_id = %request.id, "Access request created");

        match repo.get_view(request.id).await {
            Ok(Some(view)) => {
                self.notifier.notify_reviewers(&view).await;
            }
            Ok(None) => warn!(request_id = %request.id, "Access request vanished before notify"),
            Err(e) => warn!(error = %e, "Failed to load access request for notification"),
        }

        Ok(request)
    }

    /// Approve a pending request, promoting a guest applicant to operator.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` if `reviewer` may not review requests,
    /// `AppError::NotFound` for an unknown request and `AppError::Conflict`
    /// if it is no longer pending.
    pub async fn approve(
        &self,
        id: AccessRequestId,
        reviewer: &User,
        admin_note: Option<&str>,
    ) -> Result<AccessRequestView, AppError> {
        self.decide(id, reviewer, admin_note, Decision::Approve)
            .await
    }

    /// Decline a pending request.
    ///
    /// # Errors
    ///
    /// Same as [`AccessService::approve`].
    pub async fn decline(
        &self,
        id: AccessRequestId,
        reviewer: &User,
        admin_note: Option<&str>,
    ) -> Result<AccessRequestView, AppError> {
        self.decide(id, reviewer, admin_note, Decision::Decline)
            .await
    }

    #[instrument(skip(self, reviewer, admin_note), fields(reviewer_id = %reviewer.id))]
    async fn decide(
        &self,
        id: AccessRequestId,
        reviewer: &User,
        admin_note: Option<&str>,
        decision: Decision,
    ) -> Result<AccessRequestView, AppError> {
        if !reviewer.role.can_review_access() {
            return Err(AppError::Forbidden(
                "not allowed to review access requests".to_string(),
            ));
        }

        let admin_note = admin_note.map(str::trim).filter(|n| !n.is_empty());

        let mut tx = self.pool.begin().await?;

        let current = access_requests::lock(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("access request not found".to_string()))?;
        let next = current.status.transition(decision)?;

        let resolved =
            access_requests::resolve(&mut tx, id, next, Some(reviewer.id), admin_note).await?;

        if next == AccessRequestStatus::Approved {
            let promoted = users::promote_guest(&mut tx, resolved.user_id, GRANTED_ROLE).await?;
            info!(user_id = %resolved.user_id, promoted, "Applicant role after approval");
        }

        tx.commit().await?;
        info!(status = %next, "Access request decided");

        let view = AccessRequestRepository::new(self.pool)
            .get_view(id)
            .await?
            .ok_or_else(|| AppError::NotFound("access request not found".to_string()))?;

        let chat_id = view.applicant.telegram_id;
        if next == AccessRequestStatus::Approved {
            self.notifier.notify_approved(chat_id, admin_note).await;
        } else {
            self.notifier.notify_declined(chat_id, admin_note).await;
        }

        Ok(view)
    }

    /// List requests, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub async fn list(
        &self,
        status: Option<AccessRequestStatus>,
    ) -> Result<Vec<AccessRequestView>, AppError> {
        Ok(AccessRequestRepository::new(self.pool).list(status).await?)
    }
}

//! Access request repository for database operations.

use chrono::{DateTime, Utc};
use granary_core::{AccessRequestId, AccessRequestStatus, TelegramId, UserId};
use sqlx::{PgConnection, PgPool};

use super::RepositoryError;
use crate::models::{AccessRequest, AccessRequestView, Applicant};

const ALREADY_PENDING: &str = "access request already pending";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct AccessRequestRow {
    id: i32,
    user_id: i32,
    status: AccessRequestStatus,
    message: Option<String>,
    admin_note: Option<String>,
    processed_by: Option<i32>,
    processed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<AccessRequestRow> for AccessRequest {
    fn from(row: AccessRequestRow) -> Self {
        Self {
            id: AccessRequestId::new(row.id),
            user_id: UserId::new(row.user_id),
            status: row.status,
            message: row.message,
            admin_note: row.admin_note,
            processed_by: row.processed_by.map(UserId::new),
            processed_at: row.processed_at,
            created_at: row.created_at,
        }
    }
}

/// Request joined with the applicant's profile.
#[derive(Debug, sqlx::FromRow)]
struct AccessRequestViewRow {
    #[sqlx(flatten)]
    request: AccessRequestRow,
    telegram_id: i64,
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

impl From<AccessRequestViewRow> for AccessRequestView {
    fn from(row: AccessRequestViewRow) -> Self {
        Self {
            request: row.request.into(),
            applicant: Applicant {
                telegram_id: TelegramId::new(row.telegram_id),
                username: row.username,
                first_name: row.first_name,
                last_name: row.last_name,
            },
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for access request database operations.
pub struct AccessRequestRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AccessRequestRepository<'a> {
    /// Create a new access request repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Open a new pending request.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already has a pending
    /// request (enforced by a partial unique index).
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        user_id: UserId,
        message: Option<&str>,
    ) -> Result<AccessRequest, RepositoryError> {
        let row = sqlx::query_as::<_, AccessRequestRow>(
            r"
            INSERT INTO access_requests (user_id, message)
            VALUES ($1, $2)
            RETURNING id, user_id, status, message, admin_note, processed_by,
                      processed_at, created_at
            ",
        )
        .bind(user_id)
        .bind(message)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, ALREADY_PENDING))?;

        Ok(row.into())
    }

    /// The user's open request, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_pending_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<AccessRequest>, RepositoryError> {
        let row = sqlx::query_as::<_, AccessRequestRow>(
            r"
            SELECT id, user_id, status, message, admin_note, processed_by,
                   processed_at, created_at
            FROM access_requests
            WHERE user_id = $1 AND status = 'PENDING'
            ",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Get a request with its applicant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_view(
        &self,
        id: AccessRequestId,
    ) -> Result<Option<AccessRequestView>, RepositoryError> {
        let row = sqlx::query_as::<_, AccessRequestViewRow>(
            r"
            SELECT r.id, r.user_id, r.status, r.message, r.admin_note, r.processed_by,
                   r.processed_at, r.created_at,
                   u.telegram_id, u.username, u.first_name, u.last_name
            FROM access_requests r
            JOIN users u ON u.id = r.user_id
            WHERE r.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// List requests, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<AccessRequestStatus>,
    ) -> Result<Vec<AccessRequestView>, RepositoryError> {
        let rows = sqlx::query_as::<_, AccessRequestViewRow>(
            r"
            SELECT r.id, r.user_id, r.status, r.message, r.admin_note, r.processed_by,
                   r.processed_at, r.created_at,
                   u.telegram_id, u.username, u.first_name, u.last_name
            FROM access_requests r
            JOIN users u ON u.id = r.user_id
            WHERE ($1::access_request_status IS NULL OR r.status = $1)
            ORDER BY r.created_at DESC, r.id DESC
            ",
        )
        .bind(status)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// Transaction Steps
// =============================================================================

/// Lock a request row for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock(
    conn: &mut PgConnection,
    id: AccessRequestId,
) -> Result<Option<AccessRequest>, RepositoryError> {
    let row = sqlx::query_as::<_, AccessRequestRow>(
        r"
        SELECT id, user_id, status, message, admin_note, processed_by,
               processed_at, created_at
        FROM access_requests
        WHERE id = $1
        FOR UPDATE
        ",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Record a decision on a pending request.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the request is no longer pending.
/// Returns `RepositoryError::Database` if the query fails.
pub async fn resolve(
    conn: &mut PgConnection,
    id: AccessRequestId,
    status: AccessRequestStatus,
    processed_by: Option<UserId>,
    admin_note: Option<&str>,
) -> Result<AccessRequest, RepositoryError> {
    let row = sqlx::query_as::<_, AccessRequestRow>(
        r"
        UPDATE access_requests SET
            status = $2,
            processed_by = $3,
            admin_note = $4,
            processed_at = NOW()
        WHERE id = $1 AND status = 'PENDING'
        RETURNING id, user_id, status, message, admin_note, processed_by,
                  processed_at, created_at
        ",
    )
    .bind(id)
    .bind(status)
    .bind(processed_by)
    .bind(admin_note)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| RepositoryError::Conflict("access request is no longer pending".to_owned()))?;

    Ok(row.into())
}

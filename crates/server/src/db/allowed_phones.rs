//! Phone allowlist repository.

use chrono::{DateTime, Utc};
use granary_core::{AllowedPhoneId, PhoneNumber, UserId};
use sqlx::{PgConnection, PgPool};

use super::RepositoryError;
use crate::models::AllowedPhone;

#[derive(Debug, sqlx::FromRow)]
struct AllowedPhoneRow {
    id: i32,
    phone: String,
    comment: Option<String>,
    used_by_id: Option<i32>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AllowedPhoneRow> for AllowedPhone {
    type Error = RepositoryError;

    fn try_from(row: AllowedPhoneRow) -> Result<Self, Self::Error> {
        let phone = PhoneNumber::parse(&row.phone).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid allowlisted phone: {e}"))
        })?;

        Ok(Self {
            id: AllowedPhoneId::new(row.id),
            phone,
            comment: row.comment,
            used_by_id: row.used_by_id.map(UserId::new),
            created_at: row.created_at,
        })
    }
}

/// Repository for the phone allowlist.
pub struct AllowedPhoneRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AllowedPhoneRepository<'a> {
    /// Create a new allowlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Add a phone to the allowlist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the phone is already listed.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn add(
        &self,
        phone: &PhoneNumber,
        comment: Option<&str>,
    ) -> Result<AllowedPhone, RepositoryError> {
        let row = sqlx::query_as::<_, AllowedPhoneRow>(
            r"
            INSERT INTO allowed_phones (phone, comment)
            VALUES ($1, $2)
            RETURNING id, phone, comment, used_by_id, created_at
            ",
        )
        .bind(phone)
        .bind(comment)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "phone is already allowed"))?;

        row.try_into()
    }

    /// List the allowlist, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored phone is invalid.
    pub async fn list(&self) -> Result<Vec<AllowedPhone>, RepositoryError> {
        let rows = sqlx::query_as::<_, AllowedPhoneRow>(
            r"
            SELECT id, phone, comment, used_by_id, created_at
            FROM allowed_phones
            ORDER BY created_at DESC, id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Remove an entry. A user already bound keeps their role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the entry does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: AllowedPhoneId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM allowed_phones WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Lock an allowlist entry by phone for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_by_phone(
    conn: &mut PgConnection,
    phone: &PhoneNumber,
) -> Result<Option<AllowedPhone>, RepositoryError> {
    let row = sqlx::query_as::<_, AllowedPhoneRow>(
        r"
        SELECT id, phone, comment, used_by_id, created_at
        FROM allowed_phones
        WHERE phone = $1
        FOR UPDATE
        ",
    )
    .bind(phone)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(TryInto::try_into).transpose()
}

/// Bind an entry to a user.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the user is already bound to a
/// different phone.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn bind_to_user(
    conn: &mut PgConnection,
    id: AllowedPhoneId,
    user_id: UserId,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE allowed_phones SET used_by_id = $2 WHERE id = $1")
        .bind(id)
        .bind(user_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            RepositoryError::unique_violation(e, "account is already linked to another phone")
        })?;

    Ok(())
}

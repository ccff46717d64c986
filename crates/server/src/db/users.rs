//! User repository for database operations.

use chrono::{DateTime, Utc};
use granary_core::{PhoneNumber, Role, TelegramId, UserId};
use sqlx::{PgConnection, PgPool};

use super::RepositoryError;
use crate::models::{User, UserChanges};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    telegram_id: i64,
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    role: Role,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let phone = row
            .phone
            .as_deref()
            .map(PhoneNumber::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid phone in database: {e}"))
            })?;

        Ok(Self {
            id: UserId::new(row.id),
            telegram_id: TelegramId::new(row.telegram_id),
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            phone,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Profile fields refreshed every time a user authenticates.
#[derive(Debug, Clone, Copy)]
pub struct ProfileUpsert<'a> {
    pub telegram_id: TelegramId,
    pub username: Option<&'a str>,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create the user or refresh their Telegram profile.
    ///
    /// The role is never touched here. `data` keeps the last verified
    /// init-data fields; `None` leaves the stored value as is.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_profile(
        &self,
        profile: ProfileUpsert<'_>,
        data: Option<&serde_json::Value>,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO users (telegram_id, username, first_name, last_name, data)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (telegram_id) DO UPDATE SET
                username = EXCLUDED.username,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                data = COALESCE(EXCLUDED.data, users.data),
                updated_at = NOW()
            RETURNING id, telegram_id, username, first_name, last_name, phone, role,
                      created_at, updated_at
            ",
        )
        .bind(profile.telegram_id)
        .bind(profile.username)
        .bind(profile.first_name)
        .bind(profile.last_name)
        .bind(data)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Get a user by their database ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, telegram_id, username, first_name, last_name, phone, role,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a user by their Telegram ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_telegram_id(
        &self,
        telegram_id: TelegramId,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, telegram_id, username, first_name, last_name, phone, role,
                   created_at, updated_at
            FROM users
            WHERE telegram_id = $1
            ",
        )
        .bind(telegram_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// List users, newest first.
    ///
    /// `only_employees` restricts the result to `OPERATOR` and `ADMIN`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn list(
        &self,
        role: Option<Role>,
        only_employees: bool,
    ) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, telegram_id, username, first_name, last_name, phone, role,
                   created_at, updated_at
            FROM users
            WHERE ($1::user_role IS NULL OR role = $1)
              AND (NOT $2 OR role IN ('OPERATOR', 'ADMIN'))
            ORDER BY created_at DESC
            ",
        )
        .bind(role)
        .bind(only_employees)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Users who receive access-request notifications when no explicit chat
    /// IDs are configured.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn list_notification_admins(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, telegram_id, username, first_name, last_name, phone, role,
                   created_at, updated_at
            FROM users
            WHERE role IN ('OWNER', 'ADMIN')
            ORDER BY id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(&self, id: UserId, changes: &UserChanges) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            UPDATE users SET
                role = COALESCE($2, role),
                username = COALESCE($3, username),
                first_name = COALESCE($4, first_name),
                last_name = COALESCE($5, last_name),
                phone = COALESCE($6, phone),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, telegram_id, username, first_name, last_name, phone, role,
                      created_at, updated_at
            ",
        )
        .bind(id)
        .bind(changes.role)
        .bind(changes.username.as_deref())
        .bind(changes.first_name.as_deref())
        .bind(changes.last_name.as_deref())
        .bind(changes.phone.as_ref())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Set the role of a user identified by Telegram ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_role_by_telegram_id(
        &self,
        telegram_id: TelegramId,
        role: Role,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            UPDATE users SET role = $2, updated_at = NOW()
            WHERE telegram_id = $1
            RETURNING id, telegram_id, username, first_name, last_name, phone, role,
                      created_at, updated_at
            ",
        )
        .bind(telegram_id)
        .bind(role)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

// =============================================================================
// Transaction Steps
// =============================================================================

/// Promote a guest to `role`. Users who already have a role keep it.
///
/// Returns whether the role changed.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn promote_guest(
    conn: &mut PgConnection,
    id: UserId,
    role: Role,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE users SET role = $2, updated_at = NOW()
        WHERE id = $1 AND role = 'GUEST'
        ",
    )
    .bind(id)
    .bind(role)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Store the phone a user shared through the bot.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn set_phone(
    conn: &mut PgConnection,
    id: UserId,
    phone: &PhoneNumber,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE users SET phone = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(phone)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

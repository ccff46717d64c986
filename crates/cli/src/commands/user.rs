//! User role command.
//!
//! Bootstraps the first OWNER, who can then manage everyone else through the
//! mini-app.
//!
//! # Usage
//!
//! ```bash
//! granary-cli user set-role 239676985 OWNER
//! ```

use granary_core::{Role, TelegramId};
use granary_server::db::{RepositoryError, UserRepository};

use super::{CommandError, connect};

/// Set the role of the user with the given Telegram ID.
///
/// The user must have talked to the bot or opened the mini-app at least once.
///
/// # Errors
///
/// Returns error if the role is invalid or the user does not exist.
pub async fn set_role(telegram_id: i64, role: &str) -> Result<(), CommandError> {
    let role: Role = role.parse().map_err(CommandError::InvalidArgument)?;
    let telegram_id = TelegramId::new(telegram_id);

    let pool = connect().await?;
    let user = UserRepository::new(&pool)
        .set_role_by_telegram_id(telegram_id, role)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => CommandError::InvalidArgument(format!(
                "no user with Telegram ID {telegram_id}; they must start the bot first"
            )),
            other => other.into(),
        })?;

    tracing::info!(
        user_id = %user.id,
        telegram_id = %user.telegram_id,
        role = %user.role,
        "Role updated"
    );
    Ok(())
}

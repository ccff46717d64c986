//! Phone allowlist commands.
//!
//! # Usage
//!
//! ```bash
//! granary-cli phone add "+7 900 111-22-33" --comment "Night shift"
//! granary-cli phone list
//! ```

use granary_core::PhoneNumber;
use granary_server::db::AllowedPhoneRepository;

use super::{CommandError, connect};

/// Add a phone to the allowlist.
///
/// # Errors
///
/// Returns error if the phone is invalid or already listed.
pub async fn add(phone: &str, comment: Option<&str>) -> Result<(), CommandError> {
    let phone =
        PhoneNumber::parse(phone).map_err(|e| CommandError::InvalidArgument(e.to_string()))?;

    let pool = connect().await?;
    let entry = AllowedPhoneRepository::new(&pool)
        .add(&phone, comment)
        .await?;

    tracing::info!(id = %entry.id, phone = %entry.phone, "Phone allowed");
    Ok(())
}

/// Print the allowlist.
///
/// # Errors
///
/// Returns error if the query fails.
#[allow(clippy::print_stdout)]
pub async fn list() -> Result<(), CommandError> {
    let pool = connect().await?;
    let phones = AllowedPhoneRepository::new(&pool).list().await?;

    if phones.is_empty() {
        println!("No allowed phones");
        return Ok(());
    }

    for entry in phones {
        let used_by = entry
            .used_by_id
            .map_or_else(|| "-".to_string(), |id| format!("user #{id}"));
        println!(
            "{:>5}  {:<16}  {:<12}  {}",
            entry.id.as_i32(),
            entry.phone.as_str(),
            used_by,
            entry.comment.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

//! Development init data signing.
//!
//! Produces a mini-app init data string signed with the bot token, so the API
//! can be exercised with curl without opening Telegram.
//!
//! # Usage
//!
//! ```bash
//! granary-cli init-data sign --user-id 239676985 --first-name Ivan
//! curl -H "Authorization: tma $(granary-cli init-data sign --user-id 239676985)" \
//!     http://localhost:53428/api/auth/me
//! ```
//!
//! # Environment Variables
//!
//! - `TG_BOT_TOKEN` - Bot token used to sign
//! - `TG_BOT_TOKEN_DEV` - Used instead when `APP_ENV=development`

use chrono::{DateTime, Utc};
use granary_server::services::init_data;

use super::{CommandError, require_env};

/// Fields describing the signed-in user.
#[derive(Debug, Clone)]
pub struct SignRequest {
    pub user_id: i64,
    pub first_name: Option<String>,
    pub username: Option<String>,
}

/// Build a signed init data string for `request` at `auth_date`.
///
/// # Errors
///
/// Returns error if the token cannot key the HMAC.
pub fn build(
    request: &SignRequest,
    auth_date: DateTime<Utc>,
    bot_token: &str,
) -> Result<String, CommandError> {
    let mut user = serde_json::json!({ "id": request.user_id });
    if let Some(first_name) = &request.first_name {
        user["first_name"] = first_name.clone().into();
    }
    if let Some(username) = &request.username {
        user["username"] = username.clone().into();
    }

    let user = user.to_string();
    let auth_date = auth_date.timestamp().to_string();

    init_data::sign([("auth_date", auth_date.as_str()), ("user", user.as_str())], bot_token)
        .map_err(|e| CommandError::InvalidArgument(e.to_string()))
}

/// Print a freshly signed init data string.
///
/// # Errors
///
/// Returns error if no bot token is configured.
#[allow(clippy::print_stdout)]
pub fn sign(request: &SignRequest) -> Result<(), CommandError> {
    let token = bot_token()?;
    println!("{}", build(request, Utc::now(), &token)?);
    Ok(())
}

fn bot_token() -> Result<String, CommandError> {
    dotenvy::dotenv().ok();
    let development =
        std::env::var("APP_ENV").is_ok_and(|v| v.eq_ignore_ascii_case("development"));
    if development && let Ok(token) = std::env::var("TG_BOT_TOKEN_DEV") {
        return Ok(token);
    }
    require_env("TG_BOT_TOKEN")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const TOKEN: &str = "7012345678:AAHk3vQ9xZp2LmN8rT5wYb4cD6eF1gH0jKs";

    #[test]
    fn test_signed_payload_verifies() {
        let request = SignRequest {
            user_id: 239_676_985,
            first_name: Some("Ivan".to_string()),
            username: Some("ivan".to_string()),
        };
        let now = Utc::now();
        let raw = build(&request, now, TOKEN).unwrap();

        let verified =
            init_data::verify(&raw, TOKEN, now, Some(init_data::DEFAULT_MAX_AGE)).unwrap();
        assert_eq!(verified.user.id.as_i64(), 239_676_985);
        assert_eq!(verified.user.first_name.as_deref(), Some("Ivan"));
        assert_eq!(verified.user.username.as_deref(), Some("ivan"));
    }

    #[test]
    fn test_other_token_rejects() {
        let request = SignRequest {
            user_id: 1,
            first_name: None,
            username: None,
        };
        let raw = build(&request, Utc::now(), TOKEN).unwrap();
        assert!(init_data::verify(&raw, "1:other", Utc::now(), None).is_err());
    }
}

//! Telegram init data verification.
//!
//! The mini-app sends the raw `initData` query string it received from
//! Telegram. It is trusted only after its HMAC-SHA256 signature checks out
//! against the bot token:
//!
//! 1. Parse the `application/x-www-form-urlencoded` pairs and take out `hash`
//! 2. Build the data-check string: remaining pairs sorted by key, `key=value`,
//!    joined with `\n`
//! 3. Derive the secret key from the bot token
//! 4. Compare `HMAC_SHA256(secret_key, data_check_string)` with `hash`
//!
//! Two key derivations exist. Web App data (it carries a JSON `user` field)
//! uses `HMAC_SHA256(key = "WebAppData", msg = bot_token)`. Login Widget data
//! (flat `id`, `first_name`, ... fields) uses `SHA256(bot_token)`.
//!
//! See: <https://core.telegram.org/bots/webapps#validating-data-received-via-the-mini-app>

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use granary_core::TelegramId;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::form_urlencoded;

type HmacSha256 = Hmac<Sha256>;

/// Key used to derive the Web App secret.
const WEB_APP_KEY: &[u8] = b"WebAppData";

/// Allowed clock skew for `auth_date` values in the future.
const FUTURE_SKEW_SECS: i64 = 60;

/// Default maximum age of init data.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(3600);

/// Errors that can occur while verifying init data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InitDataError {
    #[error("no init data provided")]
    Missing,

    #[error("init data has no hash")]
    MissingHash,

    #[error("init data hash is not valid hex")]
    MalformedHash,

    #[error("init data signature mismatch")]
    SignatureMismatch,

    #[error("init data has no valid auth_date")]
    MissingAuthDate,

    #[error("init data has expired")]
    Expired,

    #[error("init data has no user")]
    MissingUser,

    #[error("invalid user in init data: {0}")]
    InvalidUser(String),

    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}

/// Which Telegram surface produced the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Mini-app `initData`.
    WebApp,
    /// Login Widget callback fields.
    LoginWidget,
}

/// Parsed, not yet verified, init data.
#[derive(Debug, Clone)]
pub struct InitData {
    fields: BTreeMap<String, String>,
    hash: String,
}

impl InitData {
    /// Parse a raw init data string. Later duplicates of a key win.
    ///
    /// # Errors
    ///
    /// Returns `InitDataError::Missing` for an empty string and
    /// `InitDataError::MissingHash` when there is no `hash` field.
    pub fn parse(raw: &str) -> Result<Self, InitDataError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(InitDataError::Missing);
        }

        let mut fields: BTreeMap<String, String> = form_urlencoded::parse(raw.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let hash = fields
            .remove("hash")
            .filter(|h| !h.is_empty())
            .ok_or(InitDataError::MissingHash)?;

        Ok(Self { fields, hash })
    }

    /// Fields other than `hash`, sorted by key.
    #[must_use]
    pub const fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Value of a single field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Key derivation scheme implied by the fields present.
    #[must_use]
    pub fn scheme(&self) -> Scheme {
        scheme_of(&self.fields)
    }

    /// Sorted `key=value` lines joined with `\n`.
    #[must_use]
    pub fn data_check_string(&self) -> String {
        data_check_string(&self.fields)
    }

    /// Check the signature against a bot token.
    ///
    /// # Errors
    ///
    /// Returns `InitDataError::MalformedHash` if the hash is not hex and
    /// `InitDataError::SignatureMismatch` if it does not match.
    pub fn verify_signature(&self, bot_token: &str) -> Result<(), InitDataError> {
        let expected = hex::decode(&self.hash).map_err(|_| InitDataError::MalformedHash)?;

        let mut mac = signer(self.scheme(), bot_token)?;
        mac.update(self.data_check_string().as_bytes());

        // Constant-time comparison
        mac.verify_slice(&expected)
            .map_err(|_| InitDataError::SignatureMismatch)
    }

    /// Signing time from `auth_date`.
    ///
    /// # Errors
    ///
    /// Returns `InitDataError::MissingAuthDate` if absent or not a unix time.
    pub fn auth_date(&self) -> Result<DateTime<Utc>, InitDataError> {
        self.get("auth_date")
            .and_then(|v| v.parse::<i64>().ok())
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .ok_or(InitDataError::MissingAuthDate)
    }

    /// The Telegram account the data describes.
    ///
    /// # Errors
    ///
    /// Returns `InitDataError::MissingUser` if no user is present and
    /// `InitDataError::InvalidUser` if the user fields do not parse.
    pub fn user(&self) -> Result<TelegramUser, InitDataError> {
        if let Some(json) = self.get("user") {
            return serde_json::from_str(json)
                .map_err(|e| InitDataError::InvalidUser(e.to_string()));
        }

        let id = self.get("id").ok_or(InitDataError::MissingUser)?;
        let id = id
            .parse::<TelegramId>()
            .map_err(|_| InitDataError::InvalidUser(format!("bad id {id:?}")))?;

        let owned = |key: &str| self.get(key).map(str::to_string);
        Ok(TelegramUser {
            id,
            first_name: owned("first_name"),
            last_name: owned("last_name"),
            username: owned("username"),
            language_code: owned("language_code"),
            photo_url: owned("photo_url"),
        })
    }
}

/// User identity carried by init data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: TelegramId,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Init data whose signature and freshness have been checked.
#[derive(Debug, Clone)]
pub struct VerifiedInitData {
    pub user: TelegramUser,
    pub auth_date: DateTime<Utc>,
    pub scheme: Scheme,
    fields: BTreeMap<String, String>,
}

impl VerifiedInitData {
    /// Verified fields as a JSON object, for storing on the user row.
    ///
    /// The `user` field is expanded from its JSON string.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .fields
            .iter()
            .map(|(k, v)| {
                let value = if k == "user" {
                    serde_json::from_str(v).unwrap_or_else(|_| v.clone().into())
                } else {
                    v.clone().into()
                };
                (k.clone(), value)
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

/// Verify raw init data.
///
/// When `max_age` is `Some`, data older than it, or dated more than a minute
/// in the future, is rejected.
///
/// # Errors
///
/// Returns the first `InitDataError` encountered: parse, signature,
/// `auth_date`, freshness, then user extraction.
pub fn verify(
    raw: &str,
    bot_token: &str,
    now: DateTime<Utc>,
    max_age: Option<Duration>,
) -> Result<VerifiedInitData, InitDataError> {
    let data = InitData::parse(raw)?;
    data.verify_signature(bot_token)?;

    let auth_date = data.auth_date()?;
    if let Some(max_age) = max_age {
        let age = now.signed_duration_since(auth_date).num_seconds();
        let max = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
        if age > max || age < -FUTURE_SKEW_SECS {
            return Err(InitDataError::Expired);
        }
    }

    let user = data.user()?;

    Ok(VerifiedInitData {
        user,
        auth_date,
        scheme: data.scheme(),
        fields: data.fields,
    })
}

/// Produce a signed init data string for the given fields.
///
/// Used by tests and the CLI to build payloads for local development.
///
/// # Errors
///
/// Returns `InitDataError::InvalidKey` if the HMAC cannot be keyed.
pub fn sign<'a, I>(fields: I, bot_token: &str) -> Result<String, InitDataError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let fields: BTreeMap<String, String> = fields
        .into_iter()
        .filter(|(k, _)| *k != "hash")
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    let mut mac = signer(scheme_of(&fields), bot_token)?;
    mac.update(data_check_string(&fields).as_bytes());
    let hash = hex::encode(mac.finalize().into_bytes());

    let mut out = form_urlencoded::Serializer::new(String::new());
    out.extend_pairs(&fields);
    out.append_pair("hash", &hash);
    Ok(out.finish())
}

fn scheme_of(fields: &BTreeMap<String, String>) -> Scheme {
    if fields.contains_key("user") {
        Scheme::WebApp
    } else {
        Scheme::LoginWidget
    }
}

fn data_check_string(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// HMAC keyed with the scheme's secret key.
fn signer(scheme: Scheme, bot_token: &str) -> Result<HmacSha256, InitDataError> {
    let secret_key = match scheme {
        Scheme::WebApp => {
            let mut mac = HmacSha256::new_from_slice(WEB_APP_KEY)
                .map_err(|e| InitDataError::InvalidKey(e.to_string()))?;
            mac.update(bot_token.as_bytes());
            mac.finalize().into_bytes().to_vec()
        }
        Scheme::LoginWidget => Sha256::digest(bot_token.as_bytes()).to_vec(),
    };

    HmacSha256::new_from_slice(&secret_key).map_err(|e| InitDataError::InvalidKey(e.to_string()))
}

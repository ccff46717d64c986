//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `TG_BOT_TOKEN` - Telegram bot token from `@BotFather`
//!
//! ## Optional
//! - `APP_ENV` - `development` or `production` (default: production)
//! - `TG_BOT_TOKEN_DEV` - Bot token used instead of `TG_BOT_TOKEN` in development
//! - `TG_ADMIN_CHAT_IDS` - Comma-separated Telegram IDs notified about access requests
//! - `TG_BOT_POLLING` - Run the long-polling bot loop (default: true)
//! - `TG_API_BASE` - Bot API base URL (default: <https://api.telegram.org>)
//! - `INIT_DATA_MAX_AGE_SECS` - Max age of mini-app init data, `0` disables (default: 3600)
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 53428)
//! - `WEBAPP_URL` - Mini-app URL opened from bot buttons
//! - `CORS_ORIGINS` - Extra comma-separated origins allowed by CORS
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use granary_core::TelegramId;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_PORT: &str = "53428";
const DEFAULT_WEBAPP_URL: &str = "https://big-grain-tg.vercel.app";
const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const DEFAULT_INIT_DATA_MAX_AGE_SECS: u64 = 3600;
const LOCAL_DEV_ORIGIN: &str = "http://localhost:3000";
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "token",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnvironment {
    Development,
    #[default]
    Production,
}

impl std::str::FromStr for AppEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Deployment environment
    pub environment: AppEnvironment,
    /// Telegram bot configuration
    pub telegram: TelegramConfig,
    /// Mini-app URL used for `web_app` buttons
    pub webapp_url: Url,
    /// Origins allowed by CORS (deduplicated, in load order)
    pub cors_origins: Vec<String>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// Non-fatal problems found while loading, logged once tracing is up
    pub warnings: Vec<String>,
}

/// Telegram bot configuration.
///
/// Implements `Debug` manually to redact the bot token. The token both
/// authenticates Bot API calls and keys init-data signatures.
#[derive(Clone)]
pub struct TelegramConfig {
    /// Active bot token (dev token in development when set)
    pub bot_token: SecretString,
    /// Bot API base URL
    pub api_base: String,
    /// Explicit recipients for access-request notifications
    pub admin_chat_ids: Vec<TelegramId>,
    /// Whether the long-polling loop runs in this process
    pub polling: bool,
    /// Maximum accepted age of init data (`None` disables the check)
    pub init_data_max_age: Option<Duration>,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("admin_chat_ids", &self.admin_chat_ids)
            .field("polling", &self.polling)
            .field("init_data_max_age", &self.init_data_max_age)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let database_url = SecretString::from(vars.required("DATABASE_URL")?);
        let host = vars.parse_or("HOST", "0.0.0.0")?;
        let port = vars.parse_or("PORT", DEFAULT_PORT)?;
        let environment: AppEnvironment = vars.parse_or("APP_ENV", "production")?;

        let mut warnings = Vec::new();
        let telegram = TelegramConfig::from_vars(&vars, environment, &mut warnings)?;

        let webapp_url = Url::parse(&vars.or_default("WEBAPP_URL", DEFAULT_WEBAPP_URL))
            .map_err(|e| ConfigError::InvalidEnvVar("WEBAPP_URL".to_string(), e.to_string()))?;
        let cors_origins = build_cors_origins(&webapp_url, vars.optional("CORS_ORIGINS"));

        let sentry_dsn = vars.optional("SENTRY_DSN");
        let sentry_environment = vars.optional("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = vars
            .optional("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = vars
            .optional("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            environment,
            telegram,
            webapp_url,
            cors_origins,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            warnings,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the server runs in development mode.
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.environment == AppEnvironment::Development
    }
}

impl TelegramConfig {
    fn from_vars<F>(
        vars: &Vars<F>,
        environment: AppEnvironment,
        warnings: &mut Vec<String>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let dev_token = (environment == AppEnvironment::Development)
            .then(|| vars.optional("TG_BOT_TOKEN_DEV"))
            .flatten();

        let (var_name, token) = match dev_token {
            Some(token) => ("TG_BOT_TOKEN_DEV", token),
            None => ("TG_BOT_TOKEN", vars.required("TG_BOT_TOKEN")?),
        };
        validate_bot_token(&token, var_name)?;

        // Real tokens are random; warn instead of failing so odd-looking ones still work
        if let Some((_, secret)) = token.split_once(':')
            && let Err(e) = validate_secret_strength(secret, var_name)
        {
            warnings.push(format!("{var_name} validation warning: {e}"));
        }

        let admin_chat_ids = vars
            .optional("TG_ADMIN_CHAT_IDS")
            .map(|raw| parse_chat_ids(&raw))
            .transpose()?
            .unwrap_or_default();

        let polling = vars
            .optional("TG_BOT_POLLING")
            .map(|raw| parse_bool(&raw, "TG_BOT_POLLING"))
            .transpose()?
            .unwrap_or(true);

        let max_age_secs: u64 = vars.parse_or(
            "INIT_DATA_MAX_AGE_SECS",
            &DEFAULT_INIT_DATA_MAX_AGE_SECS.to_string(),
        )?;
        let init_data_max_age = (max_age_secs > 0).then(|| Duration::from_secs(max_age_secs));

        Ok(Self {
            bot_token: SecretString::from(token),
            api_base: vars
                .or_default("TG_API_BASE", DEFAULT_TELEGRAM_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            admin_chat_ids,
            polling,
            init_data_max_age,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup with the typed accessors used by the loaders.
struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable; blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to a default string.
    fn parse_or<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}

/// Parse a comma-separated list of Telegram IDs.
fn parse_chat_ids(raw: &str) -> Result<Vec<TelegramId>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<TelegramId>().map_err(|e| {
                ConfigError::InvalidEnvVar("TG_ADMIN_CHAT_IDS".to_string(), format!("'{s}': {e}"))
            })
        })
        .collect()
}

fn parse_bool(raw: &str, key: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

/// Local dev origin, the mini-app origin, then any extra origins.
fn build_cors_origins(webapp_url: &Url, extra: Option<String>) -> Vec<String> {
    let mut origins = vec![
        LOCAL_DEV_ORIGIN.to_string(),
        webapp_url.origin().ascii_serialization(),
    ];

    for origin in extra.iter().flat_map(|raw| raw.split(',')) {
        let origin = origin.trim().trim_end_matches('/');
        if !origin.is_empty() && !origins.iter().any(|o| o == origin) {
            origins.push(origin.to_string());
        }
    }

    origins
}

/// Check the `<bot id>:<secret>` shape of a bot token.
fn validate_bot_token(token: &str, var_name: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidEnvVar(var_name.to_string(), reason.to_string());

    let (id, secret) = token
        .split_once(':')
        .ok_or_else(|| invalid("expected '<bot id>:<secret>'"))?;

    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("bot id must be numeric"));
    }
    if secret.len() < 30
        || !secret
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    {
        return Err(invalid("secret part is malformed"));
    }

    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const TOKEN: &str = "7012345678:AAHk3vQ9xZp2LmN8rT5wYb4cD6eF1gH0jKs";
    const DEV_TOKEN: &str = "7098765432:AAFq8Wz3Xc5Vb7Nm1Lk4Jh6Gf2Ds9Ap0Qwe";

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    fn base() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DATABASE_URL", "postgres://localhost/granary"),
            ("TG_BOT_TOKEN", TOKEN),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = load(&base()).unwrap();
        assert_eq!(config.port, 53428);
        assert_eq!(config.socket_addr().ip().to_string(), "0.0.0.0");
        assert_eq!(config.environment, AppEnvironment::Production);
        assert_eq!(config.webapp_url.as_str(), "https://big-grain-tg.vercel.app/");
        assert!(config.telegram.polling);
        assert_eq!(
            config.telegram.init_data_max_age,
            Some(Duration::from_secs(3600))
        );
        assert!(config.telegram.admin_chat_ids.is_empty());
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn test_placeholder_token_loads_with_warning() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/granary"),
            ("TG_BOT_TOKEN", "7012345678:changeme_changeme_changeme_changeme"),
        ])
        .unwrap();
        assert_eq!(config.warnings.len(), 1);
        let warning = config.warnings.first().unwrap();
        assert!(warning.starts_with("TG_BOT_TOKEN validation warning"));
        assert!(warning.contains("placeholder"));
    }

    #[test]
    fn test_missing_required() {
        let err = load(&[("TG_BOT_TOKEN", TOKEN)]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "DATABASE_URL"));

        let err = load(&[("DATABASE_URL", "postgres://localhost/granary")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "TG_BOT_TOKEN"));
    }

    #[test]
    fn test_dev_token_only_used_in_development() {
        let mut vars = base();
        vars.push(("TG_BOT_TOKEN_DEV", DEV_TOKEN));
        let prod = load(&vars).unwrap();
        assert_eq!(prod.telegram.bot_token.expose_secret(), TOKEN);

        vars.push(("APP_ENV", "development"));
        let dev = load(&vars).unwrap();
        assert!(dev.is_development());
        assert_eq!(dev.telegram.bot_token.expose_secret(), DEV_TOKEN);
    }

    #[test]
    fn test_dev_token_does_not_require_production_token() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/granary"),
            ("APP_ENV", "development"),
            ("TG_BOT_TOKEN_DEV", DEV_TOKEN),
        ])
        .unwrap();
        assert_eq!(config.telegram.bot_token.expose_secret(), DEV_TOKEN);
    }

    #[test]
    fn test_malformed_bot_token() {
        let err = load(&[
            ("DATABASE_URL", "postgres://localhost/granary"),
            ("TG_BOT_TOKEN", "not-a-token"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "TG_BOT_TOKEN"));

        assert!(validate_bot_token("abc:AAHk3vQ9xZp2LmN8rT5wYb4cD6eF1gH0jKs", "T").is_err());
        assert!(validate_bot_token("123:short", "T").is_err());
    }

    #[test]
    fn test_admin_chat_ids() {
        let mut vars = base();
        vars.push(("TG_ADMIN_CHAT_IDS", "239676985, 100200300,"));
        let config = load(&vars).unwrap();
        assert_eq!(
            config.telegram.admin_chat_ids,
            vec![TelegramId::new(239_676_985), TelegramId::new(100_200_300)]
        );

        let mut vars = base();
        vars.push(("TG_ADMIN_CHAT_IDS", "12,abc"));
        assert!(matches!(
            load(&vars).unwrap_err(),
            ConfigError::InvalidEnvVar(_, _)
        ));
    }

    #[test]
    fn test_max_age_zero_disables_check() {
        let mut vars = base();
        vars.push(("INIT_DATA_MAX_AGE_SECS", "0"));
        assert_eq!(load(&vars).unwrap().telegram.init_data_max_age, None);
    }

    #[test]
    fn test_polling_flag() {
        let mut vars = base();
        vars.push(("TG_BOT_POLLING", "false"));
        assert!(!load(&vars).unwrap().telegram.polling);

        let mut vars = base();
        vars.push(("TG_BOT_POLLING", "maybe"));
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_cors_origins_merge_and_dedupe() {
        let mut vars = base();
        vars.push(("WEBAPP_URL", "https://app.example.org/miniapp"));
        vars.push((
            "CORS_ORIGINS",
            "https://front-test.devmill.ru/, http://localhost:3000",
        ));
        let config = load(&vars).unwrap();
        assert_eq!(
            config.cors_origins,
            vec![
                "http://localhost:3000".to_string(),
                "https://app.example.org".to_string(),
                "https://front-test.devmill.ru".to_string(),
            ]
        );
    }

    #[test]
    fn test_invalid_port() {
        let mut vars = base();
        vars.push(("PORT", "70000"));
        assert!(matches!(
            load(&vars).unwrap_err(),
            ConfigError::InvalidEnvVar(ref k, _) if k == "PORT"
        ));
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength() {
        assert!(validate_secret_strength("your-bot-token-here-please", "T").is_err());
        assert!(validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "T").is_err());
        assert!(validate_secret_strength("AAHk3vQ9xZp2LmN8rT5wYb4cD6eF1gH0jKs", "T").is_ok());
    }

    #[test]
    fn test_telegram_config_debug_redacts_token() {
        let config = load(&base()).unwrap();
        let debug_output = format!("{:?}", config.telegram);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("AAHk3vQ9"));
    }
}

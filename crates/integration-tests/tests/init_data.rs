//! Integration tests for mini-app init data verification.
//!
//! Payloads are produced with the same signer the CLI uses and checked with
//! the verifier the API runs on every request.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use chrono::{TimeZone, Utc};
use granary_integration_tests::TEST_BOT_TOKEN;
use granary_server::services::init_data::{self, DEFAULT_MAX_AGE, Scheme};
use granary_server::services::InitDataError;

const USER_JSON: &str = r#"{"id":239676985,"first_name":"Ivan","username":"ivan","language_code":"ru"}"#;

fn auth_date() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn signed_web_app() -> String {
    let auth_date = auth_date().timestamp().to_string();
    init_data::sign(
        [
            ("query_id", "AAHdF6IQAAAAAN0XohDhrOrc"),
            ("user", USER_JSON),
            ("auth_date", auth_date.as_str()),
        ],
        TEST_BOT_TOKEN,
    )
    .unwrap()
}

// =============================================================================
// Web App Scheme
// =============================================================================

#[test]
fn test_web_app_payload_verifies() {
    let verified = init_data::verify(
        &signed_web_app(),
        TEST_BOT_TOKEN,
        auth_date() + chrono::Duration::minutes(5),
        Some(DEFAULT_MAX_AGE),
    )
    .unwrap();

    assert_eq!(verified.scheme, Scheme::WebApp);
    assert_eq!(verified.user.id.as_i64(), 239_676_985);
    assert_eq!(verified.user.first_name.as_deref(), Some("Ivan"));
    assert_eq!(verified.auth_date, auth_date());
}

#[test]
fn test_stored_json_expands_user() {
    let verified =
        init_data::verify(&signed_web_app(), TEST_BOT_TOKEN, auth_date(), None).unwrap();
    let json = verified.to_json();

    assert_eq!(json["user"]["id"], 239_676_985);
    assert_eq!(json["query_id"], "AAHdF6IQAAAAAN0XohDhrOrc");
    assert!(json.get("hash").is_none());
}

#[test]
fn test_field_order_does_not_matter() {
    let raw = signed_web_app();
    let mut pairs: Vec<&str> = raw.split('&').collect();
    pairs.reverse();
    let shuffled = pairs.join("&");

    assert!(init_data::verify(&shuffled, TEST_BOT_TOKEN, auth_date(), None).is_ok());
}

#[test]
fn test_tampered_user_is_rejected() {
    let raw = signed_web_app().replace("239676985", "100000001");

    assert_eq!(
        init_data::verify(&raw, TEST_BOT_TOKEN, auth_date(), None).unwrap_err(),
        InitDataError::SignatureMismatch
    );
}

#[test]
fn test_other_bot_token_is_rejected() {
    assert_eq!(
        init_data::verify(&signed_web_app(), "1:other", auth_date(), None).unwrap_err(),
        InitDataError::SignatureMismatch
    );
}

#[test]
fn test_stale_payload_is_rejected() {
    let later = auth_date() + chrono::Duration::hours(2);

    assert_eq!(
        init_data::verify(&signed_web_app(), TEST_BOT_TOKEN, later, Some(DEFAULT_MAX_AGE))
            .unwrap_err(),
        InitDataError::Expired
    );
    // Disabled freshness check accepts it
    assert!(init_data::verify(&signed_web_app(), TEST_BOT_TOKEN, later, None).is_ok());
}

#[test]
fn test_short_max_age() {
    let later = auth_date() + chrono::Duration::seconds(90);

    assert_eq!(
        init_data::verify(
            &signed_web_app(),
            TEST_BOT_TOKEN,
            later,
            Some(Duration::from_secs(60))
        )
        .unwrap_err(),
        InitDataError::Expired
    );
}

// =============================================================================
// Login Widget Scheme
// =============================================================================

#[test]
fn test_login_widget_payload_verifies() {
    let auth_date = auth_date().timestamp().to_string();
    let raw = init_data::sign(
        [
            ("id", "239676985"),
            ("first_name", "Ivan"),
            ("username", "ivan"),
            ("auth_date", auth_date.as_str()),
        ],
        TEST_BOT_TOKEN,
    )
    .unwrap();

    let verified = init_data::verify(&raw, TEST_BOT_TOKEN, self::auth_date(), None).unwrap();
    assert_eq!(verified.scheme, Scheme::LoginWidget);
    assert_eq!(verified.user.username.as_deref(), Some("ivan"));
}

// =============================================================================
// Malformed Input
// =============================================================================

#[test]
fn test_malformed_inputs() {
    assert_eq!(
        init_data::verify("", TEST_BOT_TOKEN, auth_date(), None).unwrap_err(),
        InitDataError::Missing
    );
    assert_eq!(
        init_data::verify("auth_date=1", TEST_BOT_TOKEN, auth_date(), None).unwrap_err(),
        InitDataError::MissingHash
    );
    assert_eq!(
        init_data::verify("auth_date=1&hash=zz", TEST_BOT_TOKEN, auth_date(), None)
            .unwrap_err(),
        InitDataError::MalformedHash
    );
}

//! Phone allowlist handlers.

use axum::{
    Router,
    extract::State,
    routing::{delete, get},
};
use granary_core::AllowedPhoneId;
use serde::{Deserialize, Serialize};

use super::{ApiData, ApiJson, ApiPath, ApiResult};
use crate::middleware::{Managers, RequireRole};
use crate::models::AllowedPhone;
use crate::services::PhoneGate;
use crate::state::AppState;

/// Build the allowlist router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/allowed-phones", get(list).post(add))
        .route("/allowed-phones/{id}", delete(remove))
}

#[derive(Debug, Deserialize)]
pub struct AddPhoneRequest {
    pub phone: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Removed {
    pub id: AllowedPhoneId,
}

/// The allowlist, newest first.
///
/// # Errors
///
/// Returns 401/403 for non-managers.
pub async fn list(
    State(state): State<AppState>,
    _: RequireRole<Managers>,
) -> ApiResult<Vec<AllowedPhone>> {
    let phones = PhoneGate::new(state.pool(), state.notifier()).list().await?;
    Ok(ApiData::new(phones))
}

/// Allowlist a phone.
///
/// # Errors
///
/// Returns 400 for an invalid phone and 409 if it is already listed.
pub async fn add(
    State(state): State<AppState>,
    _: RequireRole<Managers>,
    ApiJson(body): ApiJson<AddPhoneRequest>,
) -> ApiResult<AllowedPhone> {
    let entry = PhoneGate::new(state.pool(), state.notifier())
        .add_phone(&body.phone, body.comment.as_deref())
        .await?;
    Ok(ApiData::new(entry))
}

/// Remove an allowlist entry.
///
/// # Errors
///
/// Returns 404 if the entry does not exist.
pub async fn remove(
    State(state): State<AppState>,
    _: RequireRole<Managers>,
    ApiPath(id): ApiPath<AllowedPhoneId>,
) -> ApiResult<Removed> {
    PhoneGate::new(state.pool(), state.notifier())
        .remove(id)
        .await?;
    Ok(ApiData::new(Removed { id }))
}

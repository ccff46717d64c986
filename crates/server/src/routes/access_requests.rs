//! Access request review handlers.

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use granary_core::{AccessRequestId, AccessRequestStatus};
use serde::Deserialize;

use super::{ApiData, ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::middleware::{Managers, RequireRole};
use crate::models::AccessRequestView;
use crate::services::AccessService;
use crate::state::AppState;

/// Build the access request router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/access-requests", get(list))
        .route("/access-requests/{id}/approve", post(approve))
        .route("/access-requests/{id}/decline", post(decline))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<AccessRequestStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionBody {
    #[serde(default)]
    pub admin_note: Option<String>,
}

/// List requests, newest first.
///
/// # Errors
///
/// Returns 401/403 for non-managers.
pub async fn list(
    State(state): State<AppState>,
    _: RequireRole<Managers>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Vec<AccessRequestView>> {
    let requests = AccessService::new(state.pool(), state.notifier())
        .list(query.status)
        .await?;
    Ok(ApiData::new(requests))
}

/// Approve a pending request.
///
/// # Errors
///
/// Returns 404 for an unknown request and 409 if it was already decided.
pub async fn approve(
    State(state): State<AppState>,
    RequireRole(reviewer, ..): RequireRole<Managers>,
    ApiPath(id): ApiPath<AccessRequestId>,
    body: Option<ApiJson<DecisionBody>>,
) -> ApiResult<AccessRequestView> {
    let body = body.map(|ApiJson(b)| b).unwrap_or_default();
    let view = AccessService::new(state.pool(), state.notifier())
        .approve(id, &reviewer, body.admin_note.as_deref())
        .await?;
    Ok(ApiData::new(view))
}

/// Decline a pending request.
///
/// # Errors
///
/// Returns 404 for an unknown request and 409 if it was already decided.
pub async fn decline(
    State(state): State<AppState>,
    RequireRole(reviewer, ..): RequireRole<Managers>,
    ApiPath(id): ApiPath<AccessRequestId>,
    body: Option<ApiJson<DecisionBody>>,
) -> ApiResult<AccessRequestView> {
    let body = body.map(|ApiJson(b)| b).unwrap_or_default();
    let view = AccessService::new(state.pool(), state.notifier())
        .decline(id, &reviewer, body.admin_note.as_deref())
        .await?;
    Ok(ApiData::new(view))
}

//! Mini-app authentication handlers.

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use granary_core::{Role, UserId};
use serde::{Deserialize, Serialize};

use super::{ApiData, ApiJson, ApiResult};
use crate::middleware::TelegramAuth;
use crate::middleware::auth::authenticate;
use crate::models::{AccessRequest, User};
use crate::services::AccessService;
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/access-request", post(request_access))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub init_data: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub id: UserId,
    pub role: Role,
}

/// Verify init data from the request body and return the user's id and role.
///
/// # Errors
///
/// Returns 401 if the init data does not verify.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let user = authenticate(&state, &body.init_data).await?;
    Ok(ApiData::new(LoginResponse {
        id: user.id,
        role: user.role,
    }))
}

/// The authenticated user.
///
/// # Errors
///
/// Returns 401 without valid init data.
pub async fn me(TelegramAuth(user): TelegramAuth) -> ApiResult<User> {
    Ok(ApiData::new(user))
}

#[derive(Debug, Default, Deserialize)]
pub struct AccessRequestBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Ask reviewers for operator access.
///
/// # Errors
///
/// Returns 400 if the user already has access and 409 if a request is
/// already pending.
pub async fn request_access(
    State(state): State<AppState>,
    TelegramAuth(user): TelegramAuth,
    body: Option<ApiJson<AccessRequestBody>>,
) -> ApiResult<AccessRequest> {
    let body = body.map(|ApiJson(b)| b).unwrap_or_default();
    let request = AccessService::new(state.pool(), state.notifier())
        .request_access(&user, body.message.as_deref())
        .await?;
    Ok(ApiData::new(request))
}

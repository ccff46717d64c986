//! Shift report handlers.

use axum::{Router, extract::State, routing::get};
use serde::Deserialize;

use super::{ApiData, ApiJson, ApiQuery, ApiResult};
use crate::middleware::{RequireRole, Staff};
use crate::models::{ShiftConsumption, ShiftReport};
use crate::services::InventoryService;
use crate::state::AppState;

/// Build the shifts router.
pub fn router() -> Router<AppState> {
    Router::new().route("/shifts", get(list).post(create))
}

#[derive(Debug, Deserialize)]
pub struct CreateShiftReport {
    pub consumptions: Vec<ShiftConsumption>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// Record an end-of-shift report.
///
/// # Errors
///
/// Returns 400 for an empty or invalid report, or if stock would go negative.
pub async fn create(
    State(state): State<AppState>,
    RequireRole(operator, ..): RequireRole<Staff>,
    ApiJson(body): ApiJson<CreateShiftReport>,
) -> ApiResult<ShiftReport> {
    let report = InventoryService::new(state.pool(), state.notifier())
        .record_shift(&operator, body.consumptions)
        .await?;
    Ok(ApiData::new(report))
}

/// Most recent shift reports with their lines.
///
/// # Errors
///
/// Returns 401/403 for non-staff.
pub async fn list(
    State(state): State<AppState>,
    _: RequireRole<Staff>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Vec<ShiftReport>> {
    let reports = InventoryService::new(state.pool(), state.notifier())
        .list_shifts(query.limit)
        .await?;
    Ok(ApiData::new(reports))
}

//! Stock receipt handlers.

use axum::{Router, extract::State, routing::get};
use granary_core::ProductId;
use serde::Deserialize;

use super::{ApiData, ApiJson, ApiQuery, ApiResult};
use crate::middleware::{RequireRole, Staff};
use crate::models::Receipt;
use crate::services::InventoryService;
use crate::state::AppState;

/// Build the receipts router.
pub fn router() -> Router<AppState> {
    Router::new().route("/receipts", get(list).post(create))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReceipt {
    pub product_id: ProductId,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// Record goods received.
///
/// # Errors
///
/// Returns 400 for a non-positive quantity or unknown product.
pub async fn create(
    State(state): State<AppState>,
    RequireRole(operator, ..): RequireRole<Staff>,
    ApiJson(body): ApiJson<CreateReceipt>,
) -> ApiResult<Receipt> {
    let receipt = InventoryService::new(state.pool(), state.notifier())
        .record_receipt(&operator, body.product_id, body.quantity)
        .await?;
    Ok(ApiData::new(receipt))
}

/// Most recent receipts.
///
/// # Errors
///
/// Returns 401/403 for non-staff.
pub async fn list(
    State(state): State<AppState>,
    _: RequireRole<Staff>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Vec<Receipt>> {
    let receipts = InventoryService::new(state.pool(), state.notifier())
        .list_receipts(query.limit)
        .await?;
    Ok(ApiData::new(receipts))
}

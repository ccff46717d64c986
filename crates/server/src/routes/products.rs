//! Product handlers.

use axum::{Router, extract::State, routing::get};
use granary_core::ProductId;
use serde::Serialize;

use super::{ApiData, ApiJson, ApiPath, ApiResult};
use crate::middleware::{Managers, RequireRole, Staff};
use crate::models::{Product, ProductChanges, ProductDraft};
use crate::services::InventoryService;
use crate::state::AppState;

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list).post(create))
        .route("/products/{id}", get(show).patch(update).delete(remove))
}

#[derive(Debug, Serialize)]
pub struct Removed {
    pub id: ProductId,
}

/// All products ordered by name.
///
/// # Errors
///
/// Returns 401/403 for non-staff.
pub async fn list(
    State(state): State<AppState>,
    _: RequireRole<Staff>,
) -> ApiResult<Vec<Product>> {
    let products = InventoryService::new(state.pool(), state.notifier())
        .list_products()
        .await?;
    Ok(ApiData::new(products))
}

/// A single product.
///
/// # Errors
///
/// Returns 404 if it does not exist.
pub async fn show(
    State(state): State<AppState>,
    _: RequireRole<Staff>,
    ApiPath(id): ApiPath<ProductId>,
) -> ApiResult<Product> {
    let product = InventoryService::new(state.pool(), state.notifier())
        .get_product(id)
        .await?;
    Ok(ApiData::new(product))
}

/// Create a product.
///
/// # Errors
///
/// Returns 400 for invalid values and 409 for a duplicate name.
pub async fn create(
    State(state): State<AppState>,
    _: RequireRole<Managers>,
    ApiJson(draft): ApiJson<ProductDraft>,
) -> ApiResult<Product> {
    let product = InventoryService::new(state.pool(), state.notifier())
        .create_product(draft)
        .await?;
    Ok(ApiData::new(product))
}

/// Partially update a product.
///
/// # Errors
///
/// Returns 400 for invalid values, 404 if missing, 409 for a duplicate name.
pub async fn update(
    State(state): State<AppState>,
    _: RequireRole<Managers>,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(changes): ApiJson<ProductChanges>,
) -> ApiResult<Product> {
    let product = InventoryService::new(state.pool(), state.notifier())
        .update_product(id, changes)
        .await?;
    Ok(ApiData::new(product))
}

/// Delete a product.
///
/// # Errors
///
/// Returns 404 if it does not exist.
pub async fn remove(
    State(state): State<AppState>,
    _: RequireRole<Managers>,
    ApiPath(id): ApiPath<ProductId>,
) -> ApiResult<Removed> {
    InventoryService::new(state.pool(), state.notifier())
        .delete_product(id)
        .await?;
    Ok(ApiData::new(Removed { id }))
}

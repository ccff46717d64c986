//! Products, receipts and shift reports.
//!
//! Stock only changes inside a transaction that first locks the affected
//! product rows, so concurrent receipts and shift reports serialize per
//! product and the quantity can never go negative.

use std::collections::HashSet;

use granary_core::ProductId;
use sqlx::PgPool;
use tracing::{info, instrument};

use super::notifications::Notifier;
use crate::db::{
    ProductRepository, ReceiptRepository, ShiftRepository, products, receipts, shifts,
};
use crate::error::AppError;
use crate::models::{
    Product, ProductChanges, ProductDraft, Receipt, ShiftConsumption, ShiftReport, User,
};

/// Default page size for receipt and shift listings.
pub const DEFAULT_LIMIT: i64 = 50;
/// Largest page size accepted for listings.
pub const MAX_LIMIT: i64 = 500;

/// Clamp a client-supplied listing limit.
#[must_use]
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Service for stock bookkeeping.
pub struct InventoryService<'a> {
    pool: &'a PgPool,
    notifier: &'a Notifier,
}

impl<'a> InventoryService<'a> {
    /// Create a new inventory service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, notifier: &'a Notifier) -> Self {
        Self { pool, notifier }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a blank name or negative numbers and
    /// a conflict if the name is taken.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create_product(&self, draft: ProductDraft) -> Result<Product, AppError> {
        let draft = validate_draft(draft)?;
        let product = ProductRepository::new(self.pool).create(&draft).await?;
        info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// All products ordered by name.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        Ok(ProductRepository::new(self.pool).list().await?)
    }

    /// Get a product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if it does not exist.
    pub async fn get_product(&self, id: ProductId) -> Result<Product, AppError> {
        ProductRepository::new(self.pool)
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("product not found".to_string()))
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for invalid values, not found or a
    /// name conflict.
    #[instrument(skip(self, changes))]
    pub async fn update_product(
        &self,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Product, AppError> {
        let changes = validate_changes(changes)?;
        let product = ProductRepository::new(self.pool)
            .update(id, &changes)
            .await?;
        info!("Product updated");
        Ok(product)
    }

    /// Delete a product with its receipts and consumption lines.
    ///
    /// # Errors
    ///
    /// Returns not found if it does not exist.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), AppError> {
        ProductRepository::new(self.pool).delete(id).await?;
        info!("Product deleted");
        Ok(())
    }

    // =========================================================================
    // Stock movements
    // =========================================================================

    /// Record goods received and increase stock.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a non-positive quantity, an unknown
    /// product, or stock that would exceed the column's range.
    #[instrument(skip(self, operator), fields(operator_id = %operator.id))]
    pub async fn record_receipt(
        &self,
        operator: &User,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Receipt, AppError> {
        if quantity <= 0 {
            return Err(AppError::BadRequest(
                "quantity must be positive".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let current = products::lock(&mut tx, product_id)
            .await?
            .ok_or_else(|| AppError::BadRequest("product not found".to_string()))?;
        restocked_quantity(current.quantity, quantity)?;

        let receipt = receipts::insert(&mut tx, product_id, quantity, operator.id).await?;
        let product = products::adjust_quantity(&mut tx, product_id, quantity).await?;

        tx.commit().await?;
        info!(receipt_id = %receipt.id, stock = product.quantity, "Receipt recorded");
        Ok(receipt)
    }

    /// Record what a shift consumed and decrease stock.
    ///
    /// Reviewers are alerted about products that drop below their minimum.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an empty or malformed report, an
    /// unknown product, or consumption exceeding stock.
    #[instrument(
        skip(self, operator, consumptions),
        fields(operator_id = %operator.id, lines = consumptions.len())
    )]
    pub async fn record_shift(
        &self,
        operator: &User,
        consumptions: Vec<ShiftConsumption>,
    ) -> Result<ShiftReport, AppError> {
        validate_consumptions(&consumptions)?;

        let mut tx = self.pool.begin().await?;

        // Lock in id order so concurrent reports cannot deadlock
        let mut lines: Vec<&ShiftConsumption> = consumptions.iter().collect();
        lines.sort_by_key(|line| line.product_id.as_i32());

        let mut locked = Vec::with_capacity(lines.len());
        for line in lines {
            let product = products::lock(&mut tx, line.product_id)
                .await?
                .ok_or_else(|| {
                    AppError::BadRequest(format!("product {} not found", line.product_id))
                })?;

            if product.quantity < line.consumed {
                return Err(AppError::BadRequest(format!(
                    "not enough stock for {}: {} left, {} consumed",
                    product.name, product.quantity, line.consumed
                )));
            }
            locked.push((line, product));
        }

        let report = shifts::insert(&mut tx, operator.id, &consumptions).await?;

        let mut crossed = Vec::new();
        for (line, before) in &locked {
            let after = products::adjust_quantity(&mut tx, line.product_id, -line.consumed).await?;
            if !before.is_low() && after.is_low() {
                crossed.push(after);
            }
        }

        tx.commit().await?;
        info!(report_id = %report.id, low_stock = crossed.len(), "Shift report recorded");

        if !crossed.is_empty() {
            self.notifier.notify_low_stock(&crossed).await;
        }

        Ok(report)
    }

    /// Most recent receipts first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub async fn list_receipts(&self, limit: Option<i64>) -> Result<Vec<Receipt>, AppError> {
        Ok(ReceiptRepository::new(self.pool)
            .list_recent(clamp_limit(limit))
            .await?)
    }

    /// Most recent shift reports first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub async fn list_shifts(&self, limit: Option<i64>) -> Result<Vec<ShiftReport>, AppError> {
        Ok(ShiftRepository::new(self.pool)
            .list_recent(clamp_limit(limit))
            .await?)
    }
}

// =============================================================================
// Validation
// =============================================================================

fn validate_draft(mut draft: ProductDraft) -> Result<ProductDraft, AppError> {
    draft.name = draft.name.trim().to_string();
    if draft.name.is_empty() {
        return Err(AppError::BadRequest("product name is required".to_string()));
    }
    if draft.quantity < 0 || draft.min_threshold < 0 {
        return Err(AppError::BadRequest(
            "quantity and minimum threshold must not be negative".to_string(),
        ));
    }
    Ok(draft)
}

fn validate_changes(mut changes: ProductChanges) -> Result<ProductChanges, AppError> {
    if let Some(name) = &changes.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("product name is required".to_string()));
        }
        changes.name = Some(name.to_string());
    }
    if changes.quantity.is_some_and(|q| q < 0) || changes.min_threshold.is_some_and(|m| m < 0) {
        return Err(AppError::BadRequest(
            "quantity and minimum threshold must not be negative".to_string(),
        ));
    }
    Ok(changes)
}

/// Stock after receiving `quantity` more units.
fn restocked_quantity(current: i32, quantity: i32) -> Result<i32, AppError> {
    current
        .checked_add(quantity)
        .ok_or_else(|| AppError::BadRequest("stock would exceed the maximum".to_string()))
}

fn validate_consumptions(consumptions: &[ShiftConsumption]) -> Result<(), AppError> {
    if consumptions.is_empty() {
        return Err(AppError::BadRequest(
            "shift report must contain at least one line".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(consumptions.len());
    for line in consumptions {
        if line.consumed < 0 {
            return Err(AppError::BadRequest(
                "consumed amount must not be negative".to_string(),
            ));
        }
        if !seen.insert(line.product_id) {
            return Err(AppError::BadRequest(format!(
                "product {} appears more than once",
                line.product_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(product_id: i32, consumed: i32) -> ShiftConsumption {
        ShiftConsumption {
            product_id: ProductId::new(product_id),
            consumed,
        }
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(10)), 10);
        assert_eq!(clamp_limit(Some(100_000)), MAX_LIMIT);
    }

    #[test]
    fn test_validate_draft_trims_name() {
        let draft = validate_draft(ProductDraft {
            name: "  Маски ".to_string(),
            quantity: 100,
            min_threshold: 50,
            unit: None,
            category: None,
        })
        .unwrap();
        assert_eq!(draft.name, "Маски");
    }

    #[test]
    fn test_validate_draft_rejects_blank_and_negative() {
        let blank = ProductDraft {
            name: "   ".to_string(),
            quantity: 1,
            min_threshold: 1,
            unit: None,
            category: None,
        };
        assert!(matches!(validate_draft(blank), Err(AppError::BadRequest(_))));

        let negative = ProductDraft {
            name: "Бинты".to_string(),
            quantity: -1,
            min_threshold: 0,
            unit: None,
            category: None,
        };
        assert!(matches!(validate_draft(negative), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_validate_changes() {
        assert!(validate_changes(ProductChanges::default()).is_ok());
        let negative = ProductChanges {
            min_threshold: Some(-5),
            ..ProductChanges::default()
        };
        assert!(validate_changes(negative).is_err());
        let blank = ProductChanges {
            name: Some(" ".to_string()),
            ..ProductChanges::default()
        };
        assert!(validate_changes(blank).is_err());
    }

    #[test]
    fn test_validate_consumptions() {
        assert!(validate_consumptions(&[]).is_err());
        assert!(validate_consumptions(&[line(1, 0), line(2, 5)]).is_ok());
        assert!(validate_consumptions(&[line(1, -1)]).is_err());
        assert!(validate_consumptions(&[line(1, 1), line(1, 2)]).is_err());
    }

    #[test]
    fn test_restocked_quantity_stays_in_range() {
        assert_eq!(restocked_quantity(10, 5).unwrap(), 15);
        assert_eq!(restocked_quantity(i32::MAX - 10, 10).unwrap(), i32::MAX);

        let err = restocked_quantity(i32::MAX - 10, 100).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "stock would exceed the maximum");
    }
}

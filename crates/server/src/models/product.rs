//! Product domain types.

use chrono::{DateTime, Utc};
use granary_core::ProductId;
use serde::{Deserialize, Serialize};

/// A stocked product.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Units currently in stock; never negative.
    pub quantity: i32,
    /// Stock level below which the product is reported as low.
    pub min_threshold: i32,
    pub unit: Option<String>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Stock has fallen below the minimum threshold.
    #[must_use]
    pub const fn is_low(&self) -> bool {
        self.quantity < self.min_threshold
    }
}

/// Fields for creating a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    pub quantity: i32,
    pub min_threshold: i32,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Partial product update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductChanges {
    pub name: Option<String>,
    pub quantity: Option<i32>,
    pub min_threshold: Option<i32>,
    pub unit: Option<String>,
    pub category: Option<String>,
}

//! Stock receipt domain type.

use chrono::{DateTime, Utc};
use granary_core::{ProductId, ReceiptId, UserId};
use serde::Serialize;

/// Goods received into stock by an operator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: ReceiptId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    /// Operator who recorded the receipt; cleared if the user is deleted.
    pub operator_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

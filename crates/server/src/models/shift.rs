//! Shift report domain types.

use chrono::{DateTime, Utc};
use granary_core::{ProductId, ShiftReportId, UserId};
use serde::{Deserialize, Serialize};

/// End-of-shift consumption report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftReport {
    pub id: ShiftReportId,
    pub operator_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub consumptions: Vec<ShiftConsumption>,
}

/// Units of one product consumed during a shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftConsumption {
    pub product_id: ProductId,
    pub consumed: i32,
}

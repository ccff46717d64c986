//! Receipt repository for database operations.

use chrono::{DateTime, Utc};
use granary_core::{ProductId, ReceiptId, UserId};
use sqlx::{PgConnection, PgPool};

use super::RepositoryError;
use crate::models::Receipt;

/// Internal row type for receipt queries (joined with the product name).
#[derive(Debug, sqlx::FromRow)]
struct ReceiptRow {
    id: i32,
    product_id: i32,
    product_name: String,
    quantity: i32,
    operator_id: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<ReceiptRow> for Receipt {
    fn from(row: ReceiptRow) -> Self {
        Self {
            id: ReceiptId::new(row.id),
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            quantity: row.quantity,
            operator_id: row.operator_id.map(UserId::new),
            created_at: row.created_at,
        }
    }
}

/// Repository for receipt database operations.
pub struct ReceiptRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReceiptRepository<'a> {
    /// Create a new receipt repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Most recent receipts first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<Receipt>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReceiptRow>(
            r"
            SELECT r.id, r.product_id, p.name AS product_name, r.quantity,
                   r.operator_id, r.created_at
            FROM receipts r
            JOIN products p ON p.id = r.product_id
            ORDER BY r.created_at DESC, r.id DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Insert a receipt. Stock is adjusted separately in the same transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert(
    conn: &mut PgConnection,
    product_id: ProductId,
    quantity: i32,
    operator_id: UserId,
) -> Result<Receipt, RepositoryError> {
    let row = sqlx::query_as::<_, ReceiptRow>(
        r"
        WITH inserted AS (
            INSERT INTO receipts (product_id, quantity, operator_id)
            VALUES ($1, $2, $3)
            RETURNING id, product_id, quantity, operator_id, created_at
        )
        SELECT i.id, i.product_id, p.name AS product_name, i.quantity,
               i.operator_id, i.created_at
        FROM inserted i
        JOIN products p ON p.id = i.product_id
        ",
    )
    .bind(product_id)
    .bind(quantity)
    .bind(operator_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

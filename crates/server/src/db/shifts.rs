//! Shift report repository for database operations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use granary_core::{ProductId, ShiftReportId, UserId};
use sqlx::{PgConnection, PgPool};

use super::RepositoryError;
use crate::models::{ShiftConsumption, ShiftReport};

#[derive(Debug, sqlx::FromRow)]
struct ShiftReportRow {
    id: i32,
    operator_id: Option<i32>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct ConsumptionRow {
    shift_report_id: i32,
    product_id: i32,
    consumed: i32,
}

impl ShiftReportRow {
    fn into_report(self, consumptions: Vec<ShiftConsumption>) -> ShiftReport {
        ShiftReport {
            id: ShiftReportId::new(self.id),
            operator_id: self.operator_id.map(UserId::new),
            created_at: self.created_at,
            consumptions,
        }
    }
}

/// Repository for shift report database operations.
pub struct ShiftRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShiftRepository<'a> {
    /// Create a new shift repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Most recent reports first, each with its consumption lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<ShiftReport>, RepositoryError> {
        let reports = sqlx::query_as::<_, ShiftReportRow>(
            r"
            SELECT id, operator_id, created_at
            FROM shift_reports
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<i32> = reports.iter().map(|r| r.id).collect();
        let lines = sqlx::query_as::<_, ConsumptionRow>(
            r"
            SELECT shift_report_id, product_id, consumed
            FROM shift_consumptions
            WHERE shift_report_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_report: HashMap<i32, Vec<ShiftConsumption>> = HashMap::new();
        for line in lines {
            by_report
                .entry(line.shift_report_id)
                .or_default()
                .push(ShiftConsumption {
                    product_id: ProductId::new(line.product_id),
                    consumed: line.consumed,
                });
        }

        Ok(reports
            .into_iter()
            .map(|row| {
                let consumptions = by_report.remove(&row.id).unwrap_or_default();
                row.into_report(consumptions)
            })
            .collect())
    }
}

/// Insert a report with its lines. Stock is adjusted separately in the same
/// transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if an insert fails.
pub async fn insert(
    conn: &mut PgConnection,
    operator_id: UserId,
    consumptions: &[ShiftConsumption],
) -> Result<ShiftReport, RepositoryError> {
    let report = sqlx::query_as::<_, ShiftReportRow>(
        r"
        INSERT INTO shift_reports (operator_id)
        VALUES ($1)
        RETURNING id, operator_id, created_at
        ",
    )
    .bind(operator_id)
    .fetch_one(&mut *conn)
    .await?;

    for line in consumptions {
        sqlx::query(
            r"
            INSERT INTO shift_consumptions (shift_report_id, product_id, consumed)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(report.id)
        .bind(line.product_id)
        .bind(line.consumed)
        .execute(&mut *conn)
        .await?;
    }

    Ok(report.into_report(consumptions.to_vec()))
}

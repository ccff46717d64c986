//! Product repository for database operations.

use chrono::{DateTime, Utc};
use granary_core::ProductId;
use sqlx::{PgConnection, PgPool};

use super::RepositoryError;
use crate::models::{Product, ProductChanges, ProductDraft};

const DUPLICATE_NAME: &str = "product with this name already exists";

/// Internal row type for `PostgreSQL` product queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    quantity: i32,
    min_threshold: i32,
    unit: Option<String>,
    category: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            quantity: row.quantity,
            min_threshold: row.min_threshold,
            unit: row.unit,
            category: row.category,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, draft: &ProductDraft) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO products (name, quantity, min_threshold, unit, category)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, quantity, min_threshold, unit, category, created_at, updated_at
            ",
        )
        .bind(&draft.name)
        .bind(draft.quantity)
        .bind(draft.min_threshold)
        .bind(draft.unit.as_deref())
        .bind(draft.category.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, DUPLICATE_NAME))?;

        Ok(row.into())
    }

    /// List all products ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, quantity, min_threshold, unit, category, created_at, updated_at
            FROM products
            ORDER BY name ASC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, quantity, min_threshold, unit, category, created_at, updated_at
            FROM products
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` if the new name is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            UPDATE products SET
                name = COALESCE($2, name),
                quantity = COALESCE($3, quantity),
                min_threshold = COALESCE($4, min_threshold),
                unit = COALESCE($5, unit),
                category = COALESCE($6, category),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, quantity, min_threshold, unit, category, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.quantity)
        .bind(changes.min_threshold)
        .bind(changes.unit.as_deref())
        .bind(changes.category.as_deref())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, DUPLICATE_NAME))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a product together with its receipts and consumption lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

// =============================================================================
// Transaction Steps
// =============================================================================

/// Lock a product row for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock(
    conn: &mut PgConnection,
    id: ProductId,
) -> Result<Option<Product>, RepositoryError> {
    let row = sqlx::query_as::<_, ProductRow>(
        r"
        SELECT id, name, quantity, min_threshold, unit, category, created_at, updated_at
        FROM products
        WHERE id = $1
        FOR UPDATE
        ",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Add `delta` (possibly negative) to a product's stock.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the product does not exist.
/// Returns `RepositoryError::Database` if the query fails, including when the
/// result would violate the non-negative stock constraint.
pub async fn adjust_quantity(
    conn: &mut PgConnection,
    id: ProductId,
    delta: i32,
) -> Result<Product, RepositoryError> {
    let row = sqlx::query_as::<_, ProductRow>(
        r"
        UPDATE products SET quantity = quantity + $2, updated_at = NOW()
        WHERE id = $1
        RETURNING id, name, quantity, min_threshold, unit, category, created_at, updated_at
        ",
    )
    .bind(id)
    .bind(delta)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    Ok(row.into())
}

//! Product repository.

use sqlx::PgPool;

use freshmart_core::ProductId;

use super::RepositoryError;
use crate::models::{Product, ProductFields};

const PRODUCT_COLUMNS: &str = "id, name, category, emoji, price, compare_price, unit, stock, \
                               featured, created_at, updated_at";

/// Repository for catalog database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, fields: &ProductFields) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            r"
            INSERT INTO products (name, category, emoji, price, compare_price, unit, stock, featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&fields.name)
        .bind(fields.category)
        .bind(&fields.emoji)
        .bind(fields.price)
        .bind(fields.compare_price)
        .bind(&fields.unit)
        .bind(fields.stock)
        .bind(fields.featured)
        .fetch_one(self.pool)
        .await?;
        Ok(product)
    }

    /// Overwrite a product's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this ID.
    pub async fn update(
        &self,
        id: ProductId,
        fields: &ProductFields,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            UPDATE products
            SET name = $2, category = $3, emoji = $4, price = $5, compare_price = $6,
                unit = $7, stock = $8, featured = $9, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&fields.name)
        .bind(fields.category)
        .bind(&fields.emoji)
        .bind(fields.price)
        .bind(fields.compare_price)
        .bind(&fields.unit)
        .bind(fields.stock)
        .bind(fields.featured)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this ID.
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

    /// Replace the whole catalog in one transaction. Used by seeding.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; nothing is
    /// changed in that case.
    pub async fn replace_all(&self, catalog: &[ProductFields]) -> Result<usize, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM products").execute(&mut *tx).await?;
        for fields in catalog {
            sqlx::query(
                r"
                INSERT INTO products (name, category, emoji, price, compare_price, unit, stock, featured)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(&fields.name)
            .bind(fields.category)
            .bind(&fields.emoji)
            .bind(fields.price)
            .bind(fields.compare_price)
            .bind(&fields.unit)
            .bind(fields.stock)
            .bind(fields.featured)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(catalog.len())
    }
}

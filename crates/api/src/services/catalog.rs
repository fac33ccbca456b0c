//! Product catalog with a cached listing.
//!
//! The full listing is cached for 60 seconds and dropped on every write.
//! Single-product reads always hit the database.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;

use freshmart_core::ProductId;

use crate::db::{ProductRepository, RepositoryError};
use crate::models::{Product, ProductFields, ProductInput, ProductPatch};

const LISTING_KEY: &str = "products";
const LISTING_TTL: Duration = Duration::from_secs(60);

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product not found")]
    NotFound,

    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Catalog reads and admin writes.
#[derive(Clone)]
pub struct ProductCatalog {
    listing: Cache<&'static str, Arc<Vec<Product>>>,
}

impl Default for ProductCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self {
            listing: Cache::builder()
                .max_capacity(1)
                .time_to_live(LISTING_TTL)
                .build(),
        }
    }

    /// Every product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn list(&self, pool: &PgPool) -> Result<Arc<Vec<Product>>, CatalogError> {
        if let Some(products) = self.listing.get(LISTING_KEY).await {
            debug!("Cache hit for product listing");
            return Ok(products);
        }

        let products = Arc::new(ProductRepository::new(pool).list().await?);
        self.listing
            .insert(LISTING_KEY, Arc::clone(&products))
            .await;
        Ok(products)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no product has this ID.
    pub async fn get(&self, pool: &PgPool, id: ProductId) -> Result<Product, CatalogError> {
        ProductRepository::new(pool)
            .get(id)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Validation` listing every invalid field.
    pub async fn create(&self, pool: &PgPool, input: ProductInput) -> Result<Product, CatalogError> {
        let fields = input.validate().map_err(CatalogError::Validation)?;
        let product = ProductRepository::new(pool).create(&fields).await?;
        self.invalidate().await;
        Ok(product)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` or `CatalogError::Validation`.
    pub async fn update(
        &self,
        pool: &PgPool,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Product, CatalogError> {
        let repo = ProductRepository::new(pool);
        let current = repo.get(id).await?.ok_or(CatalogError::NotFound)?;
        let fields = patch
            .apply(ProductFields::from(current))
            .map_err(CatalogError::Validation)?;
        let product = repo.update(id, &fields).await.map_err(not_found)?;
        self.invalidate().await;
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no product has this ID.
    pub async fn delete(&self, pool: &PgPool, id: ProductId) -> Result<(), CatalogError> {
        ProductRepository::new(pool)
            .delete(id)
            .await
            .map_err(not_found)?;
        self.invalidate().await;
        Ok(())
    }

    /// Drop the cached listing.
    pub async fn invalidate(&self) {
        self.listing.invalidate_all();
        self.listing.run_pending_tasks().await;
    }
}

fn not_found(e: RepositoryError) -> CatalogError {
    match e {
        RepositoryError::NotFound => CatalogError::NotFound,
        other => CatalogError::Repository(other),
    }
}

//! Catalog endpoints. Reads are public, writes require an admin.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde_json::{Value, json};

use freshmart_core::ProductId;

use super::parse_id;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::{Product, ProductInput, ProductPatch};
use crate::state::AppState;

const NOT_FOUND: &str = "Product not found";

/// `GET /api/products`
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = state.catalog().list(state.pool()).await?;
    Ok(Json(products.as_ref().clone()))
}

/// `GET /api/products/{id}`
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>> {
    let id: ProductId = parse_id(&id, NOT_FOUND)?;
    Ok(Json(state.catalog().get(state.pool(), id).await?))
}

/// `POST /api/products`
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    body: std::result::Result<Json<ProductInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>)> {
    let Json(input) = body?;
    let product = state.catalog().create(state.pool(), input).await?;
    tracing::info!(product_id = %product.id, admin_id = %admin.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /api/products/{id}`
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    body: std::result::Result<Json<ProductPatch>, JsonRejection>,
) -> Result<Json<Product>> {
    let id: ProductId = parse_id(&id, NOT_FOUND)?;
    let Json(patch) = body?;
    let product = state.catalog().update(state.pool(), id, patch).await?;
    tracing::info!(product_id = %id, admin_id = %admin.id, "Product updated");
    Ok(Json(product))
}

/// `DELETE /api/products/{id}`
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let id: ProductId = parse_id(&id, NOT_FOUND)?;
    state.catalog().delete(state.pool(), id).await?;
    tracing::info!(product_id = %id, admin_id = %admin.id, "Product removed");
    Ok(Json(json!({ "message": "Product removed" })))
}

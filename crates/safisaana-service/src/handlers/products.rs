//! Product catalogue handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use safisaana_core::{Product, ProductId, ProductInput, ProductType, ProductUpdate, PublicProduct};
use safisaana_store::user_owns_product;

use crate::auth::{AdminUser, AuthUser};
use crate::error::ApiError;
use crate::state::AppState;

/// Product list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    /// Only products of this type.
    #[serde(rename = "type")]
    pub product_type: Option<ProductType>,
}

/// File link for an owned product.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAccessResponse {
    /// The product.
    pub product_id: ProductId,
    /// Download or course link.
    pub file_url: String,
}

async fn load_product(state: &AppState, product_id: &ProductId) -> Result<Product, ApiError> {
    state
        .store
        .get_product(product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))
}

/// List the public catalogue, newest first.
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<Vec<PublicProduct>>, ApiError> {
    let products = state
        .store
        .list_products()
        .await?
        .into_iter()
        .filter(|p| query.product_type.map_or(true, |t| p.product_type == t))
        .map(PublicProduct::from)
        .collect();

    Ok(Json(products))
}

/// Get one product without its file link.
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PublicProduct>, ApiError> {
    let product_id = id.parse::<ProductId>()?;
    let product = load_product(&state, &product_id).await?;
    Ok(Json(product.into()))
}

/// Get the file link of a product the caller owns.
pub async fn get_product_access(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ProductAccessResponse>, ApiError> {
    let product_id = id.parse::<ProductId>()?;
    let product = load_product(&state, &product_id).await?;

    if !user_owns_product(state.store.as_ref(), auth.user_id.as_str(), product_id.as_str()).await? {
        tracing::info!(
            user_id = %auth.user_id,
            product_id = %product_id,
            "Access denied to unowned product"
        );
        return Err(ApiError::Forbidden);
    }

    Ok(Json(ProductAccessResponse {
        product_id,
        file_url: product.file_url,
    }))
}

// ============================================================================
// Admin
// ============================================================================

/// List every product including file links.
pub async fn admin_list_products(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.store.list_products().await?))
}

/// Create a product.
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let Json(input) = payload?;
    input.validate()?;

    let product = input.into_product(chrono::Utc::now());
    state.store.put_product(&product).await?;

    tracing::info!(
        admin_id = %admin.user_id,
        product_id = %product.id,
        title = %product.title,
        "Product created"
    );

    Ok((StatusCode::CREATED, Json(product)))
}

/// Apply a partial update to a product.
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(id): Path<String>,
    payload: Result<Json<ProductUpdate>, JsonRejection>,
) -> Result<Json<Product>, ApiError> {
    let Json(update) = payload?;
    update.validate()?;

    let product_id = id.parse::<ProductId>()?;
    let mut product = load_product(&state, &product_id).await?;
    update.apply(&mut product, chrono::Utc::now());
    state.store.put_product(&product).await?;

    tracing::info!(admin_id = %admin.user_id, product_id = %product.id, "Product updated");

    Ok(Json(product))
}

/// Delete a product. Existing purchase records are left in place.
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let product_id = id.parse::<ProductId>()?;
    if !state.store.delete_product(&product_id).await? {
        return Err(ApiError::NotFound("Product not found".into()));
    }

    tracing::info!(admin_id = %admin.user_id, product_id = %product_id, "Product deleted");

    Ok(StatusCode::NO_CONTENT)
}

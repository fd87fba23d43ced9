//! Buyer purchase queries.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use safisaana_core::{ProductId, PurchaseRecord};
use safisaana_store::{owned_product_ids, user_owns_product};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Products the caller owns.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedProductsResponse {
    /// Ids of products with a completed purchase.
    pub product_ids: Vec<ProductId>,
}

/// Ownership of one product.
#[derive(Debug, Serialize)]
pub struct OwnershipResponse {
    /// Whether the caller has a completed purchase.
    pub owned: bool,
    /// The purchase record, whatever its status.
    pub purchase: Option<PurchaseRecord>,
}

/// List the ids of products the caller owns.
pub async fn list_owned_products(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<OwnedProductsResponse>, ApiError> {
    let product_ids = owned_product_ids(state.store.as_ref(), &auth.user_id).await?;
    Ok(Json(OwnedProductsResponse { product_ids }))
}

/// Whether the caller owns a product.
pub async fn get_ownership(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(product_id): Path<String>,
) -> Result<Json<OwnershipResponse>, ApiError> {
    let owned = user_owns_product(state.store.as_ref(), auth.user_id.as_str(), &product_id).await?;

    let purchase = match product_id.parse::<ProductId>() {
        Ok(product_id) => state.store.get_purchase(&auth.user_id, &product_id).await?,
        Err(_) => None,
    };

    Ok(Json(OwnershipResponse { owned, purchase }))
}

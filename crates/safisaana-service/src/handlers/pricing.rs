//! Pricing plan handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use safisaana_core::{PricingId, PricingInput, PricingItem, PricingUpdate};

use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Active plans for the public pricing page, newest first.
pub async fn list_pricing(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PricingItem>>, ApiError> {
    let items = state
        .store
        .list_pricing()
        .await?
        .into_iter()
        .filter(|item| item.active)
        .collect();

    Ok(Json(items))
}

/// Every plan, active or not.
pub async fn admin_list_pricing(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<Vec<PricingItem>>, ApiError> {
    Ok(Json(state.store.list_pricing().await?))
}

/// Create a plan.
pub async fn create_pricing(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    payload: Result<Json<PricingInput>, JsonRejection>,
) -> Result<(StatusCode, Json<PricingItem>), ApiError> {
    let Json(input) = payload?;
    input.validate()?;

    let item = input.into_item(chrono::Utc::now());
    state.store.put_pricing(&item).await?;

    tracing::info!(admin_id = %admin.user_id, pricing_id = %item.id, name = %item.name, "Pricing plan created");

    Ok((StatusCode::CREATED, Json(item)))
}

/// Apply a partial update to a plan.
pub async fn update_pricing(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(id): Path<String>,
    payload: Result<Json<PricingUpdate>, JsonRejection>,
) -> Result<Json<PricingItem>, ApiError> {
    let Json(update) = payload?;
    update.validate()?;

    let pricing_id = id.parse::<PricingId>()?;
    let mut item = state
        .store
        .get_pricing(&pricing_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Pricing plan not found".into()))?;

    update.apply(&mut item, chrono::Utc::now());
    state.store.put_pricing(&item).await?;

    tracing::info!(admin_id = %admin.user_id, pricing_id = %item.id, "Pricing plan updated");

    Ok(Json(item))
}

/// Delete a plan.
pub async fn delete_pricing(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let pricing_id = id.parse::<PricingId>()?;
    if !state.store.delete_pricing(&pricing_id).await? {
        return Err(ApiError::NotFound("Pricing plan not found".into()));
    }

    tracing::info!(admin_id = %admin.user_id, pricing_id = %pricing_id, "Pricing plan deleted");

    Ok(StatusCode::NO_CONTENT)
}

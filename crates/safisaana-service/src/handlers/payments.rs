//! Payment record lookup for operators.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use safisaana_core::{InvoiceId, PaymentRecord};

use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Get the payment record for an invoice id.
pub async fn get_payment(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(invoice_id): Path<String>,
) -> Result<Json<PaymentRecord>, ApiError> {
    let invoice_id = invoice_id.parse::<InvoiceId>()?;
    let payment = state
        .store
        .get_payment(&invoice_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Payment not found".into()))?;

    Ok(Json(payment))
}

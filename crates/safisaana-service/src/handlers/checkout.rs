//! Checkout initiation.
//!
//! Opens a hosted IntaSend checkout for a buyer and returns the redirect URL.
//! Nothing is persisted here; the payment record is first written when the
//! gateway calls the webhook.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use safisaana_core::{parse_positive_amount, CorrelationRef, Currency, ProductId, UserId};

use crate::error::{ApiError, FieldError};
use crate::intasend::CheckoutParams;
use crate::state::AppState;

/// Default buyer first name when the storefront does not send one.
const DEFAULT_FIRST_NAME: &str = "Customer";

/// Checkout initiation request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
    /// Buyer email.
    #[serde(default)]
    pub email: Option<String>,
    /// Buyer phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Amount, as a number or numeric string.
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
    /// Currency code.
    #[serde(default)]
    pub currency: Option<String>,
    /// Buyer first name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Buyer last name.
    #[serde(default)]
    pub last_name: Option<String>,
    /// Product being bought.
    #[serde(default)]
    pub product_id: Option<String>,
    /// Product display name.
    #[serde(default)]
    pub product_name: Option<String>,
    /// Buyer user id.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Checkout initiation response.
#[derive(Debug, Serialize)]
pub struct InitiatePaymentResponse {
    /// Always true.
    pub success: bool,
    /// Hosted checkout URL to redirect the buyer to.
    pub checkout_url: String,
    /// Gateway invoice id; the webhook reports against it.
    pub invoice_id: String,
    /// Checkout session signature.
    pub signature: Option<String>,
}

/// Validated checkout fields.
#[derive(Debug)]
struct ValidCheckout {
    email: String,
    phone: String,
    amount: Decimal,
    currency: Currency,
}

/// Initiate a hosted checkout.
pub async fn initiate_payment(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<InitiatePaymentRequest>, JsonRejection>,
) -> Result<Json<InitiatePaymentResponse>, ApiError> {
    let Json(req) = payload?;
    let valid = validate(&req).map_err(ApiError::Validation)?;

    let gateway = state.gateway.as_ref().ok_or(ApiError::GatewayNotConfigured)?;

    let api_ref = correlation_ref(req.user_id.as_deref(), req.product_id.as_deref());

    let params = CheckoutParams {
        email: valid.email,
        phone_number: valid.phone,
        amount: valid.amount,
        currency: valid.currency,
        first_name: non_blank(req.first_name.as_deref())
            .unwrap_or(DEFAULT_FIRST_NAME)
            .to_string(),
        last_name: non_blank(req.last_name.as_deref())
            .unwrap_or_default()
            .to_string(),
        api_ref,
        redirect_url: state.config.payment_redirect_url(),
    };

    tracing::info!(
        amount = %params.amount,
        currency = %params.currency,
        product_id = ?req.product_id,
        product_name = ?req.product_name,
        api_ref = ?params.api_ref,
        "Initiating checkout"
    );

    let session = gateway
        .create_checkout_session(&params)
        .await
        .map_err(|e| ApiError::Gateway(e.diagnostic()))?;

    tracing::info!(invoice_id = %session.invoice_id, "Checkout session created");

    Ok(Json(InitiatePaymentResponse {
        success: true,
        checkout_url: session.url,
        invoice_id: session.invoice_id,
        signature: session.signature,
    }))
}

/// Check every required field, collecting all failures.
fn validate(req: &InitiatePaymentRequest) -> Result<ValidCheckout, Vec<FieldError>> {
    let mut errors = Vec::new();

    let email = non_blank(req.email.as_deref());
    if email.is_none() {
        errors.push(FieldError::new("email", "Email is required"));
    }

    let phone = non_blank(req.phone.as_deref());
    if phone.is_none() {
        errors.push(FieldError::new("phone", "Phone number is required"));
    }

    let amount = match req.amount.as_ref().filter(|v| !v.is_null()) {
        None => {
            errors.push(FieldError::new("amount", "Amount is required"));
            None
        }
        Some(raw) => match parse_positive_amount(raw) {
            Ok(amount) => Some(amount),
            Err(_) => {
                errors.push(FieldError::new("amount", "Amount must be a positive number"));
                None
            }
        },
    };

    let currency = match non_blank(req.currency.as_deref()) {
        None => {
            errors.push(FieldError::new("currency", "Currency is required"));
            None
        }
        Some(code) => match code.parse::<Currency>() {
            Ok(currency) => Some(currency),
            Err(_) => {
                errors.push(FieldError::new(
                    "currency",
                    format!("Currency must be one of {}", Currency::supported_list()),
                ));
                None
            }
        },
    };

    match (email, phone, amount, currency) {
        (Some(email), Some(phone), Some(amount), Some(currency)) if errors.is_empty() => {
            Ok(ValidCheckout {
                email: email.to_string(),
                phone: phone.to_string(),
                amount,
                currency,
            })
        }
        _ => Err(errors),
    }
}

/// The `api_ref` for a checkout, present only when both ids are given.
fn correlation_ref(user_id: Option<&str>, product_id: Option<&str>) -> Option<String> {
    let user_id = user_id?.parse::<UserId>().ok()?;
    let product_id = product_id?.parse::<ProductId>().ok()?;
    Some(CorrelationRef::now(user_id, product_id).to_string())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

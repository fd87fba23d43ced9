//! IntaSend payment gateway integration.
//!
//! IntaSend handles:
//! - Hosted checkout sessions (M-Pesa, card)
//! - Asynchronous payment-state webhooks (see [`crate::handlers::webhooks`])
//!
//! Handlers depend on the [`PaymentGateway`] trait, not on the HTTP client, so
//! tests can substitute a fake.

pub mod client;
pub mod types;

use async_trait::async_trait;
use rust_decimal::Decimal;

use safisaana_core::Currency;

pub use client::IntaSendClient;
pub use types::{CheckoutRequest, CheckoutResponse};

/// Error type for gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with a non-success status.
    #[error("IntaSend API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The gateway answered 2xx but the body lacks what a session needs.
    #[error("invalid gateway response: {0}")]
    InvalidResponse(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl GatewayError {
    /// Best-effort human-readable detail for API responses.
    ///
    /// IntaSend reports failures as `{"errors": [{"detail": ...}]}`,
    /// `{"detail": ...}` or `{"message": ...}`; the first one present wins and the
    /// raw body is the fallback.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Api { status, body } => {
                extract_detail(body).unwrap_or_else(|| {
                    if body.trim().is_empty() {
                        format!("HTTP {status}")
                    } else {
                        body.clone()
                    }
                })
            }
            Self::Http(e) => e.to_string(),
            Self::InvalidResponse(msg) | Self::Configuration(msg) => msg.clone(),
        }
    }
}

fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    let from_errors = value
        .get("errors")
        .and_then(serde_json::Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e.get("detail").and_then(serde_json::Value::as_str))
                .collect::<Vec<_>>()
                .join("; ")
        })
        .filter(|s| !s.is_empty());

    from_errors.or_else(|| {
        ["detail", "message"]
            .iter()
            .find_map(|key| value.get(*key).and_then(serde_json::Value::as_str))
            .map(ToString::to_string)
    })
}

/// Buyer and amount details for a hosted checkout session.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutParams {
    /// Buyer email.
    pub email: String,
    /// Buyer phone number.
    pub phone_number: String,
    /// Amount to charge.
    pub amount: Decimal,
    /// Charge currency.
    pub currency: Currency,
    /// Buyer first name.
    pub first_name: String,
    /// Buyer last name.
    pub last_name: String,
    /// Correlation reference echoed back on webhooks.
    pub api_ref: Option<String>,
    /// Where the buyer lands after paying.
    pub redirect_url: String,
}

/// A hosted checkout session opened with the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    /// Checkout page to redirect the buyer to.
    pub url: String,
    /// Gateway invoice id; webhooks for this payment carry it.
    pub invoice_id: String,
    /// Session signature, when the gateway returns one.
    pub signature: Option<String>,
}

/// Hosted-checkout payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a hosted checkout session.
    async fn create_checkout_session(
        &self,
        params: &CheckoutParams,
    ) -> Result<CheckoutSession, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(body: &str) -> GatewayError {
        GatewayError::Api {
            status: 400,
            body: body.into(),
        }
    }

    #[test]
    fn diagnostic_prefers_errors_array() {
        let err = api(r#"{"type":"client_error","errors":[{"code":"x","detail":"Invalid amount"},{"detail":"Bad phone"}]}"#);
        assert_eq!(err.diagnostic(), "Invalid amount; Bad phone");
    }

    #[test]
    fn diagnostic_falls_back_to_detail_then_message() {
        assert_eq!(api(r#"{"detail":"Invalid token"}"#).diagnostic(), "Invalid token");
        assert_eq!(api(r#"{"message":"Oops"}"#).diagnostic(), "Oops");
    }

    #[test]
    fn diagnostic_falls_back_to_raw_body() {
        assert_eq!(api("<html>502</html>").diagnostic(), "<html>502</html>");
        assert_eq!(api("").diagnostic(), "HTTP 400");
    }
}

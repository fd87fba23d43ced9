//! IntaSend API types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/v1/checkout/`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest<'a> {
    /// Publishable key, echoed in the body as the API expects.
    pub public_key: &'a str,
    /// Buyer first name.
    pub first_name: &'a str,
    /// Buyer last name.
    pub last_name: &'a str,
    /// Buyer email.
    pub email: &'a str,
    /// Buyer phone number.
    pub phone_number: &'a str,
    /// Amount, sent as a JSON number.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Currency code.
    pub currency: &'a str,
    /// Correlation reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_ref: Option<&'a str>,
    /// Post-payment redirect.
    pub redirect_url: &'a str,
}

/// Checkout session as returned by IntaSend.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutResponse {
    /// Session id.
    #[serde(default)]
    pub id: Option<String>,
    /// Hosted checkout URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Session signature.
    #[serde(default)]
    pub signature: Option<String>,
    /// Invoice attached to the session, once created.
    #[serde(default)]
    pub invoice: Option<InvoiceRef>,
}

/// Invoice reference inside a checkout response.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceRef {
    /// Invoice id.
    #[serde(default)]
    pub invoice_id: Option<String>,
}

impl CheckoutResponse {
    /// Invoice id when the session carries one, otherwise the session id.
    #[must_use]
    pub fn invoice_id(&self) -> Option<&str> {
        self.invoice
            .as_ref()
            .and_then(|i| i.invoice_id.as_deref())
            .filter(|s| !s.is_empty())
            .or(self.id.as_deref())
    }
}

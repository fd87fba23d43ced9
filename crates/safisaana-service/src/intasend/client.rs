//! IntaSend API client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::types::{CheckoutRequest, CheckoutResponse};
use super::{CheckoutParams, CheckoutSession, GatewayError, PaymentGateway};

/// IntaSend API client.
#[derive(Debug, Clone)]
pub struct IntaSendClient {
    client: Client,
    base_url: String,
    publishable_key: String,
    secret_key: String,
}

impl IntaSendClient {
    /// Live API base URL.
    pub const LIVE_URL: &'static str = "https://payment.intasend.com";

    /// Sandbox API base URL.
    pub const SANDBOX_URL: &'static str = "https://sandbox.intasend.com";

    /// Create a new IntaSend client.
    ///
    /// # Arguments
    ///
    /// * `publishable_key` - `ISPubKey_...`
    /// * `secret_key` - `ISSecretKey_...`
    /// * `test_mode` - talk to the sandbox instead of the live API
    pub fn new(
        publishable_key: impl Into<String>,
        secret_key: impl Into<String>,
        test_mode: bool,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        let base_url = if test_mode {
            Self::SANDBOX_URL
        } else {
            Self::LIVE_URL
        };

        Self {
            client,
            base_url: base_url.to_string(),
            publishable_key: publishable_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Point the client at a different API host.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The API host in use.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PaymentGateway for IntaSendClient {
    async fn create_checkout_session(
        &self,
        params: &CheckoutParams,
    ) -> Result<CheckoutSession, GatewayError> {
        if self.publishable_key.is_empty() || self.secret_key.is_empty() {
            return Err(GatewayError::Configuration("IntaSend API keys are empty".into()));
        }

        let body = CheckoutRequest {
            public_key: &self.publishable_key,
            first_name: &params.first_name,
            last_name: &params.last_name,
            email: &params.email,
            phone_number: &params.phone_number,
            amount: params.amount,
            currency: params.currency.code(),
            api_ref: params.api_ref.as_deref(),
            redirect_url: &params.redirect_url,
        };

        tracing::debug!(
            amount = %params.amount,
            currency = %params.currency.code(),
            api_ref = ?params.api_ref,
            "Creating IntaSend checkout"
        );

        let response = self
            .client
            .post(format!("{}/api/v1/checkout/", self.base_url))
            .header("X-IntaSend-Public-API-Key", &self.publishable_key)
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let session: CheckoutResponse = response.json().await?;

        let url = session
            .url
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| GatewayError::InvalidResponse("checkout response has no url".into()))?;
        let invoice_id = session
            .invoice_id()
            .map(ToString::to_string)
            .ok_or_else(|| {
                GatewayError::InvalidResponse("checkout response has no invoice or id".into())
            })?;

        tracing::info!(invoice_id = %invoice_id, "IntaSend checkout created");

        Ok(CheckoutSession {
            url,
            invoice_id,
            signature: session.signature,
        })
    }
}

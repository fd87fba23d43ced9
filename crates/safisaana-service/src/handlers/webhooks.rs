//! IntaSend webhook receiver.
//!
//! Every authenticated delivery is answered with 200, including ones that fail to
//! parse or persist, so the gateway does not retry a delivery whose side effects
//! may have partly landed. Failures are reported through the alert sink instead.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use safisaana_core::PaymentNotification;

use crate::alerts::Alert;
use crate::crypto::constant_time_eq;
use crate::error::ApiError;
use crate::reconcile::{Entitlement, ReconcileOutcome, Reconciler};
use crate::state::AppState;

/// Header IntaSend sends the webhook password in.
const SIGNATURE_HEADER: &str = "x-intasend-signature";

const PROCESSING_ERROR: &str = "Error processing webhook";

/// Webhook response.
#[derive(Debug, Default, Serialize)]
pub struct WebhookResponse {
    /// Whether the delivery was applied.
    pub success: bool,
    /// Outcome summary on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    /// Failure summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    /// Failure detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// The payment record key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// The raw payment state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl WebhookResponse {
    fn failed(error: &'static str, details: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error),
            details: Some(details.into()),
            ..Self::default()
        }
    }
}

/// Handle IntaSend payment-state webhooks.
pub async fn intasend_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    verify_credential(&state, &headers)?;

    let notification: PaymentNotification = match serde_json::from_slice(&body) {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(error = %e, "Unparseable IntaSend webhook body");
            state
                .alerts
                .notify(Alert::PaymentNotRecorded {
                    transaction_id: None,
                    error: format!("unparseable body: {e}"),
                })
                .await;
            return Ok(Json(WebhookResponse::failed(PROCESSING_ERROR, e.to_string())));
        }
    };

    tracing::info!(
        invoice_id = ?notification.invoice_id,
        state = %notification.state(),
        api_ref = ?notification.api_ref,
        "Received IntaSend webhook"
    );

    let reconciler = Reconciler::new(
        state.store.as_ref(),
        state.alerts.as_ref(),
        state.config.unknown_state_policy,
    );

    let outcome = match reconciler.reconcile(&notification, chrono::Utc::now()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "Failed to process IntaSend webhook");
            return Ok(Json(WebhookResponse::failed(PROCESSING_ERROR, e.to_string())));
        }
    };

    let transaction_id = notification.transaction_id().map(|id| id.to_string());
    let status = Some(notification.state().to_string());

    let response = match outcome {
        ReconcileOutcome::Recorded {
            payment,
            entitlement,
        } => {
            if let Entitlement::Failed { error } = &entitlement {
                tracing::warn!(
                    transaction_id = %payment.transaction_id,
                    error = %error,
                    "Payment recorded without entitlement"
                );
            }
            WebhookResponse {
                success: true,
                message: Some("Webhook processed successfully"),
                transaction_id: Some(payment.transaction_id.to_string()),
                status,
                ..WebhookResponse::default()
            }
        }
        ReconcileOutcome::Ignored => WebhookResponse {
            success: true,
            message: Some("Unrecognized payment state ignored"),
            transaction_id,
            status,
            ..WebhookResponse::default()
        },
        ReconcileOutcome::Rejected => WebhookResponse {
            success: false,
            error: Some("Unrecognized payment state"),
            transaction_id,
            status,
            ..WebhookResponse::default()
        },
    };

    Ok(Json(response))
}

/// Check the shared webhook password. With no password configured nothing passes.
fn verify_credential(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state
        .config
        .intasend_webhook_password
        .as_deref()
        .filter(|p| !p.is_empty())
    else {
        tracing::warn!("Webhook rejected: INTASEND_WEBHOOK_PASSWORD not configured");
        return Err(ApiError::Unauthorized);
    };

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    };
    let presented = header(SIGNATURE_HEADER)
        .or_else(|| header("authorization"))
        .unwrap_or("");

    if constant_time_eq(presented, expected) {
        Ok(())
    } else {
        tracing::warn!("Webhook rejected: credential mismatch");
        Err(ApiError::Unauthorized)
    }
}

//! API error types and responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Operator hint attached to gateway failures.
const GATEWAY_HINT: &str =
    "Check the IntaSend API keys and the INTASEND_TEST_MODE setting in the service environment.";

/// A single failing request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Request field name as the client sent it.
    pub field: &'static str,
    /// What is wrong with it.
    pub message: String,
}

impl FieldError {
    /// Create a field error.
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden - valid credentials but insufficient permissions.
    #[error("forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - malformed input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// One or more request fields failed validation.
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// The route exists but not for this method.
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    /// The payment gateway has no credentials configured.
    #[error("payment gateway not configured")]
    GatewayNotConfigured,

    /// The payment gateway rejected or failed the call.
    #[error("gateway error: {0}")]
    Gateway(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, error, details, hint): (
            StatusCode,
            &'static str,
            String,
            Option<serde_json::Value>,
            Option<&'static str>,
        ) = match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unauthorized".to_string(),
                None,
                None,
            ),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                "forbidden",
                "Forbidden".to_string(),
                None,
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None, None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None, None),
            Self::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                "Invalid request".to_string(),
                Some(serde_json::json!({ "fields": fields })),
                None,
            ),
            Self::MethodNotAllowed(msg) => (
                StatusCode::METHOD_NOT_ALLOWED,
                "method_not_allowed",
                msg,
                None,
                None,
            ),
            Self::GatewayNotConfigured => {
                tracing::error!("IntaSend credentials not configured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "configuration_error",
                    "Payment gateway not configured".to_string(),
                    Some("IntaSend API keys are missing. Please contact support.".into()),
                    Some(GATEWAY_HINT),
                )
            }
            Self::Gateway(details) => {
                tracing::error!(details = %details, "Payment gateway call failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "gateway_error",
                    "Failed to initiate payment".to_string(),
                    Some(details.into()),
                    Some(GATEWAY_HINT),
                )
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg,
                None,
                None,
            ),
        };

        let body = ErrorResponse {
            error,
            code,
            details,
            hint,
        };

        (status, Json(body)).into_response()
    }
}

impl From<safisaana_store::StoreError> for ApiError {
    fn from(err: safisaana_store::StoreError) -> Self {
        match err {
            safisaana_store::StoreError::NotFound { collection, key } => {
                Self::NotFound(format!("{collection} not found: {key}"))
            }
            safisaana_store::StoreError::Database(msg)
            | safisaana_store::StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<safisaana_core::CoreError> for ApiError {
    fn from(err: safisaana_core::CoreError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<safisaana_core::IdError> for ApiError {
    fn from(err: safisaana_core::IdError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

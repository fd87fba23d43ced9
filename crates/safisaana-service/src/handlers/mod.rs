//! API handlers.

pub mod checkout;
pub mod health;
pub mod payments;
pub mod pricing;
pub mod products;
pub mod purchases;
pub mod uploads;
pub mod webhooks;

use crate::error::ApiError;

/// Shared 405 handler for routes that only accept `POST`.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed("Method not allowed".into())
}

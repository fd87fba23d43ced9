//! Operational alerts.
//!
//! The webhook receiver never fails a delivery back to the gateway, so problems
//! that would otherwise only show up in logs are reported here as typed alerts.

use std::fmt;

use async_trait::async_trait;

use safisaana_core::UnknownStatePolicy;

/// Something an operator should look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    /// A successful payment was recorded but the purchase write failed; the buyer
    /// paid and has no access.
    EntitlementNotGranted {
        /// Payment transaction id.
        transaction_id: String,
        /// Buyer.
        user_id: String,
        /// Product paid for.
        product_id: String,
        /// Store error.
        error: String,
    },
    /// A webhook delivery could not be persisted at all.
    PaymentNotRecorded {
        /// Payment transaction id, when the payload had one.
        transaction_id: Option<String>,
        /// Why.
        error: String,
    },
    /// The gateway reported a state outside the known vocabulary.
    UnknownPaymentState {
        /// Payment transaction id, when the payload had one.
        transaction_id: Option<String>,
        /// The raw state.
        state: String,
        /// What the receiver did with it.
        policy: UnknownStatePolicy,
    },
}

impl Alert {
    /// Stable machine-readable name.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EntitlementNotGranted { .. } => "entitlement_not_granted",
            Self::PaymentNotRecorded { .. } => "payment_not_recorded",
            Self::UnknownPaymentState { .. } => "unknown_payment_state",
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EntitlementNotGranted {
                transaction_id,
                user_id,
                product_id,
                error,
            } => write!(
                f,
                "payment {transaction_id} succeeded but purchase {user_id}_{product_id} was not recorded: {error}"
            ),
            Self::PaymentNotRecorded {
                transaction_id,
                error,
            } => write!(
                f,
                "payment {} was not recorded: {error}",
                transaction_id.as_deref().unwrap_or("<none>")
            ),
            Self::UnknownPaymentState {
                transaction_id,
                state,
                policy,
            } => write!(
                f,
                "payment {} reported unknown state {state:?} (policy {policy:?})",
                transaction_id.as_deref().unwrap_or("<none>")
            ),
        }
    }
}

/// Destination for operational alerts.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver an alert. Delivery failures are the sink's problem, not the caller's.
    async fn notify(&self, alert: Alert);
}

/// Logs alerts at `error` level under the `alerts` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlertSink;

#[async_trait]
impl AlertSink for TracingAlertSink {
    async fn notify(&self, alert: Alert) {
        tracing::error!(target: "alerts", kind = alert.kind(), "{alert}");
    }
}

//! Payment states and payment records.
//!
//! The gateway reports payment progress with its own status vocabulary. We keep
//! the raw string on the record and classify it into a [`StatusBucket`] to decide
//! what the webhook receiver does with it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::ids::InvoiceId;

/// Currency assumed when a notification does not name one.
pub const DEFAULT_NOTIFICATION_CURRENCY: &str = "KES";

/// Status written for every state in the pending bucket.
pub const PENDING_STATUS: &str = "PENDING";

/// Status written for every state in the failed bucket.
pub const FAILED_STATUS: &str = "FAILED";

/// The gateway's payment states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentState {
    /// Awaiting the payer.
    Pending,
    /// Payer acted, gateway still settling.
    Processing,
    /// Settled.
    Complete,
    /// Settled (alternate spelling used by some channels).
    Success,
    /// Declined or cancelled.
    Failed,
    /// Failed attempt the payer may retry.
    Retry,
}

impl PaymentState {
    /// Parse a raw state string. Matching is exact and case-sensitive.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "PENDING" => Some(Self::Pending),
            "PROCESSING" => Some(Self::Processing),
            "COMPLETE" => Some(Self::Complete),
            "SUCCESS" => Some(Self::Success),
            "FAILED" => Some(Self::Failed),
            "RETRY" => Some(Self::Retry),
            _ => None,
        }
    }

    /// The bucket this state belongs to.
    #[must_use]
    pub const fn bucket(self) -> StatusBucket {
        match self {
            Self::Complete | Self::Success => StatusBucket::Success,
            Self::Pending | Self::Processing => StatusBucket::Pending,
            Self::Failed | Self::Retry => StatusBucket::Failed,
        }
    }
}

/// Three-way classification of gateway states, plus a fourth bucket for
/// anything outside the known vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusBucket {
    /// `COMPLETE` or `SUCCESS`.
    Success,
    /// `PENDING` or `PROCESSING`.
    Pending,
    /// `FAILED` or `RETRY`.
    Failed,
    /// Any other value, including a missing state.
    Unknown,
}

impl StatusBucket {
    /// Classify a raw gateway state string.
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        PaymentState::parse(raw).map_or(Self::Unknown, PaymentState::bucket)
    }

    /// The status value persisted on the payment record for a raw state.
    ///
    /// Success and unknown keep the raw value; pending and failed are forced to
    /// their canonical spelling.
    #[must_use]
    pub fn recorded_status(self, raw: &str) -> String {
        match self {
            Self::Pending => PENDING_STATUS.to_string(),
            Self::Failed => FAILED_STATUS.to_string(),
            Self::Success | Self::Unknown => raw.to_string(),
        }
    }
}

impl fmt::Display for StatusBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Pending => "pending",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// What the webhook receiver does with a state outside the known vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownStatePolicy {
    /// Acknowledge and write nothing.
    #[default]
    Ignore,
    /// Upsert the payment record with the raw status and an `unknown` bucket.
    RecordAsUnknown,
    /// Acknowledge with `success: false` and write nothing.
    Reject,
}

impl FromStr for UnknownStatePolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "record_as_unknown" | "record" => Ok(Self::RecordAsUnknown),
            "reject" => Ok(Self::Reject),
            other => Err(CoreError::InvalidPolicy(other.to_string())),
        }
    }
}

/// A payment-status notification as delivered by the gateway.
///
/// Only the fields the receiver maps are named; everything else lands in
/// `extra` and is kept on the record as an opaque attachment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentNotification {
    /// Gateway invoice id.
    pub invoice_id: Option<String>,
    /// Raw payment state.
    pub state: Option<String>,
    /// Amount, as a number or numeric string.
    pub value: Option<Value>,
    /// Payer account: phone number or email.
    pub account: Option<String>,
    /// API reference set when the checkout was opened.
    pub api_ref: Option<String>,
    /// Gateway-side creation time.
    pub created_at: Option<String>,
    /// Currency code.
    pub currency: Option<String>,
    /// Gateway fee.
    pub charges: Option<Value>,
    /// Amount after fees.
    pub net_amount: Option<Value>,
    /// Reason given for a failure.
    pub failed_reason: Option<String>,
    /// M-Pesa receipt reference.
    pub mpesa_reference: Option<String>,
    /// Card holder, for card payments.
    pub card_holder_name: Option<String>,
    /// Payer email when supplied separately from `account`.
    pub email: Option<String>,
    /// Every other field of the payload.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PaymentNotification {
    /// The raw state, or the empty string when absent.
    #[must_use]
    pub fn state(&self) -> &str {
        self.state.as_deref().unwrap_or("")
    }

    /// The id the payment record is keyed by: the invoice id, falling back to
    /// the API reference.
    #[must_use]
    pub fn transaction_id(&self) -> Option<InvoiceId> {
        [self.invoice_id.as_deref(), self.api_ref.as_deref()]
            .into_iter()
            .flatten()
            .find_map(|raw| raw.parse().ok())
    }

    /// Look up a string field given either at the top level or inside the
    /// nested `metadata` object. Top level wins.
    #[must_use]
    pub fn field_or_metadata(&self, name: &str) -> Option<&str> {
        fn non_blank(v: &Value) -> Option<&str> {
            v.as_str().filter(|s| !s.trim().is_empty())
        }

        self.extra.get(name).and_then(non_blank).or_else(|| {
            self.extra
                .get("metadata")
                .and_then(|m| m.get(name))
                .and_then(non_blank)
        })
    }
}

/// Parse a gateway amount the way the gateway's own clients do: numbers and
/// numeric strings are accepted, anything else is treated as absent.
#[must_use]
pub fn lenient_amount(raw: Option<&Value>) -> Option<Decimal> {
    match raw? {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// The stored state of one gateway payment, keyed by `transaction_id`.
///
/// Optional fields that are `None` are omitted when serialized, so a merge-upsert
/// with a sparser notification keeps what an earlier delivery recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Invoice id, or API reference when the gateway sent no invoice id.
    pub transaction_id: InvoiceId,
    /// Gateway invoice id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
    /// Correlation reference set by the checkout initiator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_ref: Option<String>,
    /// Gross amount.
    pub amount: Decimal,
    /// Currency code as reported by the gateway.
    pub currency: String,
    /// Recorded status (see [`StatusBucket::recorded_status`]).
    pub status: String,
    /// Bucket the raw state was classified into.
    pub status_bucket: StatusBucket,
    /// Payer phone number (the gateway's `account`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Payer email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Gateway fee.
    pub charges: Decimal,
    /// Amount after fees.
    pub net_amount: Decimal,
    /// M-Pesa receipt reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpesa_reference: Option<String>,
    /// Card holder name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_holder_name: Option<String>,
    /// Failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_reason: Option<String>,
    /// Creation time reported by the gateway, or receipt time.
    pub created_at: DateTime<Utc>,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
    /// When this webhook delivery was received.
    pub webhook_received_at: DateTime<Utc>,
    /// Unmapped payload fields.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub raw_payload: Map<String, Value>,
}

impl PaymentRecord {
    /// Normalize a notification into a record.
    ///
    /// Returns `None` when the notification carries neither an invoice id nor an
    /// API reference, since there is nothing to key the record by.
    #[must_use]
    pub fn from_notification(
        notification: &PaymentNotification,
        bucket: StatusBucket,
        received_at: DateTime<Utc>,
    ) -> Option<Self> {
        let transaction_id = notification.transaction_id()?;
        let amount = lenient_amount(notification.value.as_ref()).unwrap_or_default();

        let created_at = notification
            .created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map_or(received_at, |dt| dt.with_timezone(&Utc));

        Some(Self {
            transaction_id,
            invoice_id: notification.invoice_id.clone(),
            api_ref: notification.api_ref.clone(),
            amount,
            currency: notification
                .currency
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_NOTIFICATION_CURRENCY.to_string()),
            status: bucket.recorded_status(notification.state()),
            status_bucket: bucket,
            phone: notification.account.clone(),
            email: notification.email.clone().filter(|e| !e.is_empty()),
            charges: lenient_amount(notification.charges.as_ref()).unwrap_or_default(),
            net_amount: lenient_amount(notification.net_amount.as_ref()).unwrap_or(amount),
            mpesa_reference: notification.mpesa_reference.clone(),
            card_holder_name: notification.card_holder_name.clone(),
            failed_reason: notification.failed_reason.clone(),
            created_at,
            updated_at: received_at,
            webhook_received_at: received_at,
            raw_payload: notification.extra.clone(),
        })
    }
}

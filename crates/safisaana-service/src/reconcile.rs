//! Payment reconciliation.
//!
//! Turns a gateway notification into store writes:
//!
//! 1. Classify the raw state into a [`StatusBucket`]. Unknown states follow the
//!    configured [`UnknownStatePolicy`].
//! 2. Merge-upsert the payment record keyed by invoice id (or API reference).
//! 3. On success only, merge-upsert the buyer's purchase record. This write is
//!    best effort: a failure is returned as [`Entitlement::Failed`] and raised as
//!    an alert, never as an error.
//!
//! Writes are last-write-wins. A delayed `PENDING` delivery arriving after
//! `COMPLETE` overwrites the payment status; the purchase record, once written,
//! is not touched by non-success deliveries.

use chrono::{DateTime, Utc};

use safisaana_core::{
    CorrelationRef, PaymentNotification, PaymentRecord, ProductId, PurchaseRecord, StatusBucket,
    UnknownStatePolicy, UserId, FALLBACK_PRODUCT_NAME,
};
use safisaana_store::{Store, StoreError};

use crate::alerts::{Alert, AlertSink};

/// What happened to a notification.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The payment record was written.
    Recorded {
        /// The payment record after the merge.
        payment: PaymentRecord,
        /// Whether access was granted.
        entitlement: Entitlement,
    },
    /// Unknown state, ignored by policy. Nothing was written.
    Ignored,
    /// Unknown state, rejected by policy. Nothing was written.
    Rejected,
}

/// Result of the purchase write that follows a successful payment.
#[derive(Debug, Clone, PartialEq)]
pub enum Entitlement {
    /// The purchase record was written.
    Granted(PurchaseRecord),
    /// The payment is not in the success bucket.
    NotApplicable,
    /// Success, but the payload did not identify a buyer and product.
    MissingIdentifiers,
    /// Success, but the purchase write failed.
    Failed {
        /// Store error.
        error: String,
    },
}

/// Reconciliation errors. The webhook still answers 200 for these.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Neither `invoice_id` nor `api_ref` was present.
    #[error("payload carries neither invoice_id nor api_ref")]
    MissingTransactionId,

    /// The payment record write failed.
    #[error("failed to record payment: {0}")]
    Store(#[from] StoreError),
}

/// Applies notifications to the store.
pub struct Reconciler<'a> {
    store: &'a dyn Store,
    alerts: &'a dyn AlertSink,
    policy: UnknownStatePolicy,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler.
    #[must_use]
    pub fn new(store: &'a dyn Store, alerts: &'a dyn AlertSink, policy: UnknownStatePolicy) -> Self {
        Self {
            store,
            alerts,
            policy,
        }
    }

    /// Apply one notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload has no transaction id or the payment write
    /// fails. Purchase write failures are not errors (see [`Entitlement::Failed`]).
    pub async fn reconcile(
        &self,
        notification: &PaymentNotification,
        received_at: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let raw_state = notification.state();
        let bucket = StatusBucket::classify(raw_state);
        let transaction_id = notification.transaction_id();

        if bucket == StatusBucket::Unknown {
            tracing::warn!(
                transaction_id = ?transaction_id,
                state = %raw_state,
                policy = ?self.policy,
                "Unrecognized payment state"
            );
            self.alerts
                .notify(Alert::UnknownPaymentState {
                    transaction_id: transaction_id.as_ref().map(ToString::to_string),
                    state: raw_state.to_string(),
                    policy: self.policy,
                })
                .await;

            match self.policy {
                UnknownStatePolicy::Ignore => return Ok(ReconcileOutcome::Ignored),
                UnknownStatePolicy::Reject => return Ok(ReconcileOutcome::Rejected),
                UnknownStatePolicy::RecordAsUnknown => {}
            }
        }

        let Some(record) = PaymentRecord::from_notification(notification, bucket, received_at)
        else {
            self.alerts
                .notify(Alert::PaymentNotRecorded {
                    transaction_id: None,
                    error: ReconcileError::MissingTransactionId.to_string(),
                })
                .await;
            return Err(ReconcileError::MissingTransactionId);
        };

        let payment = match self.store.upsert_payment(&record).await {
            Ok(payment) => payment,
            Err(e) => {
                self.alerts
                    .notify(Alert::PaymentNotRecorded {
                        transaction_id: Some(record.transaction_id.to_string()),
                        error: e.to_string(),
                    })
                    .await;
                return Err(e.into());
            }
        };

        tracing::info!(
            transaction_id = %payment.transaction_id,
            status = %payment.status,
            bucket = %bucket,
            "Payment recorded"
        );

        let entitlement = if bucket == StatusBucket::Success {
            self.grant(notification, &record).await
        } else {
            Entitlement::NotApplicable
        };

        Ok(ReconcileOutcome::Recorded {
            payment,
            entitlement,
        })
    }

    async fn grant(&self, notification: &PaymentNotification, record: &PaymentRecord) -> Entitlement {
        let Some((user_id, product_id)) = purchase_identifiers(notification) else {
            tracing::debug!(
                transaction_id = %record.transaction_id,
                "Successful payment carries no buyer/product identifiers"
            );
            return Entitlement::MissingIdentifiers;
        };

        let product_name = self.product_name(notification, &product_id).await;
        let purchase = PurchaseRecord::completed(
            user_id,
            product_id,
            product_name,
            record.amount,
            record.currency.clone(),
            record.transaction_id.clone(),
        );

        match self.store.upsert_purchase(&purchase).await {
            Ok(stored) => {
                tracing::info!(
                    user_id = %stored.user_id,
                    product_id = %stored.product_id,
                    transaction_id = %stored.transaction_id,
                    "Purchase recorded"
                );
                Entitlement::Granted(stored)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    user_id = %purchase.user_id,
                    product_id = %purchase.product_id,
                    "Failed to record purchase"
                );
                self.alerts
                    .notify(Alert::EntitlementNotGranted {
                        transaction_id: record.transaction_id.to_string(),
                        user_id: purchase.user_id.to_string(),
                        product_id: purchase.product_id.to_string(),
                        error: e.to_string(),
                    })
                    .await;
                Entitlement::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Payload, then metadata, then the catalogue title, then a placeholder.
    async fn product_name(&self, notification: &PaymentNotification, product_id: &ProductId) -> String {
        if let Some(name) = notification.field_or_metadata("productName") {
            return name.to_string();
        }
        match self.store.get_product(product_id).await {
            Ok(Some(product)) => product.title,
            Ok(None) => FALLBACK_PRODUCT_NAME.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, product_id = %product_id, "Product lookup failed");
                FALLBACK_PRODUCT_NAME.to_string()
            }
        }
    }
}

/// Buyer and product a successful payment is for.
///
/// Explicit `userId`/`productId` fields win, then `metadata.userId` /
/// `metadata.productId`, then the correlation reference in `api_ref`.
#[must_use]
pub fn purchase_identifiers(notification: &PaymentNotification) -> Option<(UserId, ProductId)> {
    let explicit = notification
        .field_or_metadata("userId")
        .and_then(|u| u.parse::<UserId>().ok())
        .zip(
            notification
                .field_or_metadata("productId")
                .and_then(|p| p.parse::<ProductId>().ok()),
        );

    explicit.or_else(|| {
        let reference: CorrelationRef = notification.api_ref.as_deref()?.parse().ok()?;
        Some((reference.user_id, reference.product_id))
    })
}

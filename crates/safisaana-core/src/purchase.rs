//! Purchase records: the entitlement a buyer holds for a product.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::{purchase_key, InvoiceId, ProductId, UserId};

/// Product name written when neither the payload nor the catalogue supplies one.
pub const FALLBACK_PRODUCT_NAME: &str = "Product";

/// Purchase status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    /// Paid for; grants access.
    Completed,
    /// Recorded but not yet paid.
    Pending,
    /// Payment did not go through.
    Failed,
}

/// A buyer's purchase of one product, keyed by `{userId}_{productId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    /// The buyer.
    pub user_id: UserId,
    /// The product.
    pub product_id: ProductId,
    /// Product name at the time of purchase.
    pub product_name: String,
    /// Amount paid.
    pub amount: Decimal,
    /// Currency the amount is in.
    pub currency: String,
    /// Payment that granted this purchase.
    pub transaction_id: InvoiceId,
    /// Purchase status.
    pub status: PurchaseStatus,
    /// When the purchase completed.
    pub purchased_at: DateTime<Utc>,
    /// When this record was written.
    pub created_at: DateTime<Utc>,
}

impl PurchaseRecord {
    /// Build a completed purchase.
    #[must_use]
    pub fn completed(
        user_id: UserId,
        product_id: ProductId,
        product_name: impl Into<String>,
        amount: Decimal,
        currency: impl Into<String>,
        transaction_id: InvoiceId,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            product_id,
            product_name: product_name.into(),
            amount,
            currency: currency.into(),
            transaction_id,
            status: PurchaseStatus::Completed,
            purchased_at: now,
            created_at: now,
        }
    }

    /// Document key of this record.
    #[must_use]
    pub fn key(&self) -> String {
        purchase_key(&self.user_id, &self.product_id)
    }

    /// Whether this record is the access grant for its product.
    #[must_use]
    pub fn grants_access(&self) -> bool {
        self.status == PurchaseStatus::Completed
    }
}

//! Core types for the safisaana marketplace.
//!
//! This crate provides the domain types shared by the store and the HTTP service:
//!
//! - **Identifiers**: `UserId`, `ProductId`, `PricingId`, `InvoiceId`, `CorrelationRef`
//! - **Checkout**: `Currency`, `parse_positive_amount`
//! - **Payments**: `PaymentNotification`, `PaymentRecord`, `StatusBucket`, `UnknownStatePolicy`
//! - **Entitlements**: `PurchaseRecord`, `PurchaseStatus`
//! - **Catalogue**: `Product`, `PricingItem` and their admin forms
//!
//! # Money
//!
//! Amounts are `rust_decimal::Decimal`. The gateway reports amounts as numbers or
//! numeric strings; both are accepted.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod currency;
pub mod error;
pub mod ids;
pub mod payment;
pub mod pricing;
pub mod product;
pub mod purchase;

pub use currency::{parse_positive_amount, Currency};
pub use error::{CoreError, Result};
pub use ids::{purchase_key, CorrelationRef, IdError, InvoiceId, PricingId, ProductId, UserId};
pub use payment::{
    lenient_amount, PaymentNotification, PaymentRecord, PaymentState, StatusBucket,
    UnknownStatePolicy, DEFAULT_NOTIFICATION_CURRENCY, FAILED_STATUS, PENDING_STATUS,
};
pub use pricing::{PricingInput, PricingItem, PricingType, PricingUpdate};
pub use product::{Product, ProductInput, ProductType, ProductUpdate, PublicProduct};
pub use purchase::{PurchaseRecord, PurchaseStatus, FALLBACK_PRODUCT_NAME};

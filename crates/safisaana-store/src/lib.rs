//! Document storage layer for safisaana.
//!
//! Records live in named collections and are addressed by string keys. The one
//! write primitive the payment flow relies on is the **merge-upsert**: create the
//! document if absent, otherwise overwrite only the fields present in the patch.
//! There is no version check, so concurrent merges on the same key are
//! last-write-wins.
//!
//! # Backends
//!
//! - [`MemoryStore`]: process-local, used by tests and `STORE_BACKEND=memory`
//! - `RocksStore`: one column family per collection, CBOR values
//!   (feature `rocksdb-backend`)
//! - [`PgStore`]: a single PostgreSQL `documents` table with JSONB bodies
//!
//! # Example
//!
//! ```no_run
//! # async fn run() -> safisaana_store::Result<()> {
//! use safisaana_store::{user_owns_product, MemoryStore, Store};
//!
//! let store = MemoryStore::new();
//! let owned = user_owns_product(&store, "u1", "p1").await?;
//! assert!(!owned);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod memory;
pub mod ownership;
pub mod postgres;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;

use async_trait::async_trait;
use serde_json::{json, Value};

use safisaana_core::{
    InvoiceId, PaymentRecord, PricingId, PricingItem, Product, ProductId, PurchaseRecord, UserId,
};

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use ownership::{owned_product_ids, user_owns_product};
pub use postgres::PgStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;
pub use schema::Collection;

/// The storage trait defining all database operations.
///
/// Backends implement the five document primitives; the typed record helpers
/// are provided on top of them.
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Document Primitives
    // =========================================================================

    /// Fetch a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_document(&self, collection: Collection, key: &str) -> Result<Option<Value>>;

    /// Create or replace a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn put_document(&self, collection: Collection, key: &str, doc: Value) -> Result<()>;

    /// Merge-upsert a document and return the stored result.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn merge_document(&self, collection: Collection, key: &str, patch: Value)
        -> Result<Value>;

    /// Delete a document, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn delete_document(&self, collection: Collection, key: &str) -> Result<bool>;

    /// List every document in a collection in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_documents(&self, collection: Collection) -> Result<Vec<(String, Value)>>;

    // =========================================================================
    // Payment Operations
    // =========================================================================

    /// Merge-upsert a payment record keyed by its transaction id.
    ///
    /// Returns the record as stored after the merge.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation or (de)serialization fails.
    async fn upsert_payment(&self, record: &PaymentRecord) -> Result<PaymentRecord> {
        let patch = serde_json::to_value(record)?;
        let merged = self
            .merge_document(
                Collection::Payments,
                keys::payment_key(&record.transaction_id),
                patch,
            )
            .await?;
        Ok(serde_json::from_value(merged)?)
    }

    /// Get a payment record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation or deserialization fails.
    async fn get_payment(&self, invoice_id: &InvoiceId) -> Result<Option<PaymentRecord>> {
        decode_opt(
            self.get_document(Collection::Payments, keys::payment_key(invoice_id))
                .await?,
        )
    }

    // =========================================================================
    // Purchase Operations
    // =========================================================================

    /// Merge-upsert a purchase record keyed by `{user_id}_{product_id}`.
    ///
    /// Delivering the same purchase twice leaves one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation or (de)serialization fails.
    async fn upsert_purchase(&self, purchase: &PurchaseRecord) -> Result<PurchaseRecord> {
        let patch = serde_json::to_value(purchase)?;
        let merged = self
            .merge_document(Collection::Purchases, &purchase.key(), patch)
            .await?;
        Ok(serde_json::from_value(merged)?)
    }

    /// Get the purchase record for a buyer/product pair.
    ///
    /// Distinct pairs can share a key when ids contain `_`, so a record stored
    /// under the key is only returned if its own ids match the pair asked for.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation or deserialization fails.
    async fn get_purchase(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<Option<PurchaseRecord>> {
        let purchase: Option<PurchaseRecord> = decode_opt(
            self.get_document(
                Collection::Purchases,
                &keys::purchase_record_key(user_id, product_id),
            )
            .await?,
        )?;
        Ok(purchase.filter(|p| &p.user_id == user_id && &p.product_id == product_id))
    }

    /// List every purchase record of a buyer, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation or deserialization fails.
    async fn list_purchases_by_user(&self, user_id: &UserId) -> Result<Vec<PurchaseRecord>> {
        let mut purchases = Vec::new();
        for (_, doc) in self.list_documents(Collection::Purchases).await? {
            if doc.get("userId").and_then(Value::as_str) != Some(user_id.as_str()) {
                continue;
            }
            purchases.push(serde_json::from_value(doc)?);
        }
        Ok(purchases)
    }

    // =========================================================================
    // Catalogue Operations
    // =========================================================================

    /// Create or replace a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation or serialization fails.
    async fn put_product(&self, product: &Product) -> Result<()> {
        self.put_document(
            Collection::Products,
            keys::product_key(&product.id),
            serde_json::to_value(product)?,
        )
        .await
    }

    /// Get a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation or deserialization fails.
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        decode_opt(
            self.get_document(Collection::Products, keys::product_key(product_id))
                .await?,
        )
    }

    /// List products, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation or deserialization fails.
    async fn list_products(&self) -> Result<Vec<Product>> {
        let mut products: Vec<Product> = decode_all(self.list_documents(Collection::Products).await?)?;
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    /// Delete a product, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn delete_product(&self, product_id: &ProductId) -> Result<bool> {
        self.delete_document(Collection::Products, keys::product_key(product_id))
            .await
    }

    /// Create or replace a pricing plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation or serialization fails.
    async fn put_pricing(&self, item: &PricingItem) -> Result<()> {
        self.put_document(
            Collection::Pricing,
            keys::pricing_key(&item.id),
            serde_json::to_value(item)?,
        )
        .await
    }

    /// Get a pricing plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation or deserialization fails.
    async fn get_pricing(&self, pricing_id: &PricingId) -> Result<Option<PricingItem>> {
        decode_opt(
            self.get_document(Collection::Pricing, keys::pricing_key(pricing_id))
                .await?,
        )
    }

    /// List pricing plans, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation or deserialization fails.
    async fn list_pricing(&self) -> Result<Vec<PricingItem>> {
        let mut items: Vec<PricingItem> = decode_all(self.list_documents(Collection::Pricing).await?)?;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    /// Delete a pricing plan, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn delete_pricing(&self, pricing_id: &PricingId) -> Result<bool> {
        self.delete_document(Collection::Pricing, keys::pricing_key(pricing_id))
            .await
    }

    // =========================================================================
    // Admin Markers
    // =========================================================================

    /// Whether a user has an admin marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn is_admin(&self, user_id: &UserId) -> Result<bool> {
        Ok(self
            .get_document(Collection::Admins, keys::admin_key(user_id))
            .await?
            .is_some())
    }

    /// Add an admin marker for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn grant_admin(&self, user_id: &UserId) -> Result<()> {
        self.put_document(
            Collection::Admins,
            keys::admin_key(user_id),
            json!({ "grantedAt": chrono::Utc::now() }),
        )
        .await
    }
}

fn decode_opt<T: serde::de::DeserializeOwned>(doc: Option<Value>) -> Result<Option<T>> {
    doc.map(|d| serde_json::from_value(d).map_err(StoreError::from))
        .transpose()
}

fn decode_all<T: serde::de::DeserializeOwned>(docs: Vec<(String, Value)>) -> Result<Vec<T>> {
    docs.into_iter()
        .map(|(_, d)| serde_json::from_value(d).map_err(StoreError::from))
        .collect()
}

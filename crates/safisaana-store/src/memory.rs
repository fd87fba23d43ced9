//! In-memory storage implementation.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::keys::merge_fields;
use crate::schema::Collection;
use crate::Store;

type Documents = HashMap<Collection, BTreeMap<String, Value>>;

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<Documents>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_document(&self, collection: Collection, key: &str) -> Result<Option<Value>> {
        let docs = self.docs.read().await;
        Ok(docs.get(&collection).and_then(|c| c.get(key)).cloned())
    }

    async fn put_document(&self, collection: Collection, key: &str, doc: Value) -> Result<()> {
        let mut docs = self.docs.write().await;
        docs.entry(collection).or_default().insert(key.to_string(), doc);
        Ok(())
    }

    async fn merge_document(
        &self,
        collection: Collection,
        key: &str,
        patch: Value,
    ) -> Result<Value> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .entry(collection)
            .or_default()
            .entry(key.to_string())
            .or_insert(Value::Null);
        merge_fields(doc, patch);
        Ok(doc.clone())
    }

    async fn delete_document(&self, collection: Collection, key: &str) -> Result<bool> {
        let mut docs = self.docs.write().await;
        Ok(docs
            .get_mut(&collection)
            .and_then(|c| c.remove(key))
            .is_some())
    }

    async fn list_documents(&self, collection: Collection) -> Result<Vec<(String, Value)>> {
        let docs = self.docs.read().await;
        Ok(docs
            .get(&collection)
            .map(|c| c.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use safisaana_core::{
        InvoiceId, PaymentRecord, ProductId, ProductInput, ProductType, PurchaseRecord,
        PurchaseStatus, StatusBucket, UserId,
    };
    use serde_json::json;

    fn payment(invoice: &str, status: &str) -> PaymentRecord {
        let now = Utc::now();
        PaymentRecord {
            transaction_id: invoice.parse().unwrap(),
            invoice_id: Some(invoice.to_string()),
            api_ref: None,
            amount: dec!(100),
            currency: "KES".into(),
            status: status.into(),
            status_bucket: StatusBucket::classify(status),
            phone: None,
            email: None,
            charges: dec!(0),
            net_amount: dec!(100),
            mpesa_reference: None,
            card_holder_name: None,
            failed_reason: None,
            created_at: now,
            updated_at: now,
            webhook_received_at: now,
            raw_payload: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn document_crud() {
        let store = MemoryStore::new();
        store
            .put_document(Collection::Admins, "u1", json!({ "a": 1 }))
            .await
            .unwrap();
        assert_eq!(
            store.get_document(Collection::Admins, "u1").await.unwrap(),
            Some(json!({ "a": 1 }))
        );
        assert!(store.get_document(Collection::Payments, "u1").await.unwrap().is_none());
        assert!(store.delete_document(Collection::Admins, "u1").await.unwrap());
        assert!(!store.delete_document(Collection::Admins, "u1").await.unwrap());
    }

    #[tokio::test]
    async fn payment_merge_keeps_earlier_fields() {
        let store = MemoryStore::new();
        let mut first = payment("INV1", "PROCESSING");
        first.mpesa_reference = Some("QWE123".into());
        store.upsert_payment(&first).await.unwrap();

        let second = payment("INV1", "COMPLETE");
        let merged = store.upsert_payment(&second).await.unwrap();

        assert_eq!(merged.status, "COMPLETE");
        assert_eq!(merged.status_bucket, StatusBucket::Success);
        assert_eq!(merged.mpesa_reference.as_deref(), Some("QWE123"));

        let invoice: InvoiceId = "INV1".parse().unwrap();
        let stored = store.get_payment(&invoice).await.unwrap().unwrap();
        assert_eq!(stored.status, "COMPLETE");
        assert_eq!(
            store.list_documents(Collection::Payments).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn purchase_upsert_is_idempotent() {
        let store = MemoryStore::new();
        let user: UserId = "u1".parse().unwrap();
        let product: ProductId = "p1".parse().unwrap();
        let purchase = PurchaseRecord::completed(
            user.clone(),
            product.clone(),
            "Guide",
            dec!(500),
            "KES",
            "INV1".parse().unwrap(),
        );

        store.upsert_purchase(&purchase).await.unwrap();
        store.upsert_purchase(&purchase).await.unwrap();

        let all = store.list_purchases_by_user(&user).await.unwrap();
        assert_eq!(all.len(), 1);
        let stored = store.get_purchase(&user, &product).await.unwrap().unwrap();
        assert_eq!(stored.status, PurchaseStatus::Completed);
        assert_eq!(stored.product_name, "Guide");
    }

    #[tokio::test]
    async fn purchases_are_filtered_by_user() {
        let store = MemoryStore::new();
        for (user, product) in [("u1", "p1"), ("u1", "p2"), ("u2", "p1")] {
            let purchase = PurchaseRecord::completed(
                user.parse().unwrap(),
                product.parse().unwrap(),
                "X",
                dec!(1),
                "KES",
                "INV".parse().unwrap(),
            );
            store.upsert_purchase(&purchase).await.unwrap();
        }
        let user: UserId = "u1".parse().unwrap();
        assert_eq!(store.list_purchases_by_user(&user).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn products_listed_newest_first() {
        let store = MemoryStore::new();
        let base = Utc::now();
        for (offset, title) in [(0, "old"), (10, "new")] {
            let input = ProductInput {
                title: title.into(),
                product_type: ProductType::Ebook,
                price: dec!(10),
                image_url: String::new(),
                file_url: String::new(),
                short_description: String::new(),
                description: String::new(),
                payment_link: None,
            };
            let product = input.into_product(base + chrono::Duration::seconds(offset));
            store.put_product(&product).await.unwrap();
        }
        let titles: Vec<_> = store
            .list_products()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn admin_markers() {
        let store = MemoryStore::new();
        let user: UserId = "admin".parse().unwrap();
        assert!(!store.is_admin(&user).await.unwrap());
        store.grant_admin(&user).await.unwrap();
        assert!(store.is_admin(&user).await.unwrap());
    }
}

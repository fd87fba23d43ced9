//! `RocksDB` storage implementation.
//!
//! Each collection is a column family. Documents are stored as CBOR.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options,
};
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::keys::merge_fields;
use crate::schema::{all_column_families, Collection};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    /// Serializes read-modify-write merges.
    merge_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            merge_lock: Mutex::new(()),
        })
    }

    fn cf(&self, collection: Collection) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db.cf_handle(collection.name()).ok_or_else(|| {
            StoreError::Database(format!("column family not found: {collection}"))
        })
    }

    fn serialize(value: &Value) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    fn deserialize(data: &[u8]) -> Result<Value> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn read(&self, collection: Collection, key: &str) -> Result<Option<Value>> {
        let cf = self.cf(collection)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn write(&self, collection: Collection, key: &str, doc: &Value) -> Result<()> {
        let cf = self.cf(collection)?;
        self.db
            .put_cf(&cf, key, Self::serialize(doc)?)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

#[async_trait]
impl Store for RocksStore {
    async fn get_document(&self, collection: Collection, key: &str) -> Result<Option<Value>> {
        self.read(collection, key)
    }

    async fn put_document(&self, collection: Collection, key: &str, doc: Value) -> Result<()> {
        self.write(collection, key, &doc)
    }

    async fn merge_document(
        &self,
        collection: Collection,
        key: &str,
        patch: Value,
    ) -> Result<Value> {
        let _guard = self
            .merge_lock
            .lock()
            .map_err(|_| StoreError::Database("merge lock poisoned".into()))?;

        let mut doc = self.read(collection, key)?.unwrap_or(Value::Null);
        merge_fields(&mut doc, patch);
        self.write(collection, key, &doc)?;
        Ok(doc)
    }

    async fn delete_document(&self, collection: Collection, key: &str) -> Result<bool> {
        if self.read(collection, key)?.is_none() {
            return Ok(false);
        }
        let cf = self.cf(collection)?;
        self.db
            .delete_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(true)
    }

    async fn list_documents(&self, collection: Collection) -> Result<Vec<(String, Value)>> {
        let cf = self.cf(collection)?;
        let mut docs = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let key = String::from_utf8(key.to_vec())
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            docs.push((key, Self::deserialize(&value)?));
        }
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use safisaana_core::{PurchaseRecord, UserId};
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn merge_preserves_absent_fields() {
        let (store, _dir) = create_test_store();
        store
            .merge_document(Collection::Payments, "INV1", json!({ "status": "PENDING", "phone": "2547" }))
            .await
            .unwrap();
        let merged = store
            .merge_document(Collection::Payments, "INV1", json!({ "status": "COMPLETE" }))
            .await
            .unwrap();
        assert_eq!(merged, json!({ "status": "COMPLETE", "phone": "2547" }));
        assert_eq!(
            store.get_document(Collection::Payments, "INV1").await.unwrap(),
            Some(merged)
        );
    }

    #[tokio::test]
    async fn purchases_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let purchase = PurchaseRecord::completed(
            "u1".parse().unwrap(),
            "p1".parse().unwrap(),
            "Guide",
            dec!(250.50),
            "KES",
            "INV1".parse().unwrap(),
        );
        {
            let store = RocksStore::open(dir.path()).unwrap();
            store.upsert_purchase(&purchase).await.unwrap();
        }

        let store = RocksStore::open(dir.path()).unwrap();
        let user: UserId = "u1".parse().unwrap();
        let stored = store.list_purchases_by_user(&user).await.unwrap();
        assert_eq!(stored, vec![purchase]);
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let (store, _dir) = create_test_store();
        store
            .put_document(Collection::Products, "p1", json!({ "title": "x" }))
            .await
            .unwrap();
        assert!(store.delete_document(Collection::Products, "p1").await.unwrap());
        assert!(!store.delete_document(Collection::Products, "p1").await.unwrap());
        assert!(store.list_documents(Collection::Products).await.unwrap().is_empty());
    }
}

//! PostgreSQL storage implementation.
//!
//! All collections share one `documents` table with a JSONB body. Merges use
//! `jsonb ||`, which has the same top-level semantics as
//! [`merge_fields`](crate::keys::merge_fields).

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

use safisaana_core::{PurchaseRecord, UserId};

use crate::error::{Result, StoreError};
use crate::schema::Collection;
use crate::Store;

/// PostgreSQL-backed storage implementation.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to `database_url` and apply migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        let store = Self::from_pool(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Wrap an existing pool. Migrations are not applied.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        tracing::info!("PostgreSQL migrations applied");
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_document(&self, collection: Collection, key: &str) -> Result<Option<Value>> {
        let row = sqlx::query("SELECT doc FROM documents WHERE collection = $1 AND key = $2")
            .bind(collection.name())
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.try_get::<Value, _>("doc")).transpose()?)
    }

    async fn put_document(&self, collection: Collection, key: &str, doc: Value) -> Result<()> {
        sqlx::query(
            "INSERT INTO documents (collection, key, doc) VALUES ($1, $2, $3) \
             ON CONFLICT (collection, key) DO UPDATE SET doc = EXCLUDED.doc, updated_at = now()",
        )
        .bind(collection.name())
        .bind(key)
        .bind(doc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn merge_document(
        &self,
        collection: Collection,
        key: &str,
        patch: Value,
    ) -> Result<Value> {
        let row = sqlx::query(
            "INSERT INTO documents (collection, key, doc) VALUES ($1, $2, $3) \
             ON CONFLICT (collection, key) \
             DO UPDATE SET doc = documents.doc || EXCLUDED.doc, updated_at = now() \
             RETURNING doc",
        )
        .bind(collection.name())
        .bind(key)
        .bind(patch)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("doc")?)
    }

    async fn delete_document(&self, collection: Collection, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND key = $2")
            .bind(collection.name())
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_documents(&self, collection: Collection) -> Result<Vec<(String, Value)>> {
        let rows = sqlx::query("SELECT key, doc FROM documents WHERE collection = $1 ORDER BY key")
            .bind(collection.name())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|r| -> Result<(String, Value)> { Ok((r.try_get("key")?, r.try_get("doc")?)) })
            .collect()
    }

    // Served by the `documents_purchases_by_user` index.
    async fn list_purchases_by_user(&self, user_id: &UserId) -> Result<Vec<PurchaseRecord>> {
        let rows = sqlx::query(
            "SELECT doc FROM documents \
             WHERE collection = $1 AND doc ->> 'userId' = $2 ORDER BY key",
        )
        .bind(Collection::Purchases.name())
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|r| -> Result<PurchaseRecord> {
                Ok(serde_json::from_value(r.try_get::<Value, _>("doc")?)?)
            })
            .collect()
    }
}

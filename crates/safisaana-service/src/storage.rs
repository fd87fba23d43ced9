//! Object storage for catalogue images.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::crypto::sha256_hex;

/// Errors from object storage.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem error.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The key would escape the storage root.
    #[error("invalid object key: {0}")]
    InvalidKey(String),
}

/// Stores uploaded objects and hands back their public URL.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `bytes` under `key`, returning the URL the object is served from.
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str)
        -> Result<String, StorageError>;
}

/// Writes objects below a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    /// Create a store rooted at `root`, serving objects from `public_base_url`.
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Storage root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        tracing::info!(
            key = %key,
            size = bytes.len(),
            content_type = %content_type,
            "Stored object"
        );

        Ok(format!("{}/{key}", self.public_base_url))
    }
}

/// Content-addressed key for an uploaded product image.
///
/// The same bytes uploaded under the same name always land on the same key.
#[must_use]
pub fn object_key(filename: &str, bytes: &[u8]) -> String {
    let digest = sha256_hex(bytes);
    format!("products/{}-{}", &digest[..16], sanitize(filename))
}

/// Reduce a client-supplied filename to `[A-Za-z0-9._-]`.
fn sanitize(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

//! In-memory blob store for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BlobStore, StorageError, public_url, strip_base, validate_key};

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Blob store held in process memory.
#[derive(Debug)]
pub struct MemoryBlobStore {
    base_url: String,
    objects: RwLock<HashMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    /// Create an empty store whose URLs start with `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Keys currently stored, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Fetch a stored object with its content type.
    pub async fn object(&self, key: &str) -> Option<StoredBlob> {
        self.objects.read().await.get(key).cloned()
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new("memory://blobs")
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        validate_key(key)?;
        self.objects.write().await.insert(
            key.to_owned(),
            StoredBlob {
                bytes,
                content_type: content_type.to_owned(),
            },
        );
        Ok(public_url(&self.base_url, key))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|blob| blob.bytes.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_owned()))
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        strip_base(&self.base_url, url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_and_resolve_url() {
        let store = MemoryBlobStore::new("https://cdn.test");
        let url = store
            .put("original/a.jpg", vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.test/original/a.jpg");
        let key = store.key_for_url(&url).unwrap();
        assert_eq!(store.get(&key).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(store.object(&key).await.unwrap().content_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_missing_and_invalid_keys() {
        let store = MemoryBlobStore::default();
        assert!(matches!(
            store.get("original/none.jpg").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            store.put("../escape", Vec::new(), "image/jpeg").await,
            Err(StorageError::InvalidKey(_))
        ));
    }
}

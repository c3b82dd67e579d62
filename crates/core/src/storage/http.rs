//! Supabase Storage client.
//!
//! Uploads go to `POST {base}/storage/v1/object/{bucket}/{key}` with the
//! service key as a bearer token. Objects are read back through the public
//! bucket URL `{base}/storage/v1/object/public/{bucket}/{key}`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;
use url::Url;

use super::{BlobStore, StorageError, public_url, strip_base, validate_key};

/// Connection settings for a Supabase Storage bucket.
#[derive(Clone)]
pub struct SupabaseStorageConfig {
    /// Project URL, e.g. `https://abcd.supabase.co`.
    pub base_url: Url,
    /// Service role key used for uploads.
    pub service_key: SecretString,
    /// Public bucket name.
    pub bucket: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for SupabaseStorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseStorageConfig")
            .field("base_url", &self.base_url.as_str())
            .field("service_key", &"[REDACTED]")
            .field("bucket", &self.bucket)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Blob store backed by a Supabase Storage bucket.
#[derive(Clone)]
pub struct HttpBlobStore {
    inner: Arc<HttpBlobStoreInner>,
}

struct HttpBlobStoreInner {
    client: reqwest::Client,
    service_key: SecretString,
    upload_base: String,
    public_base: String,
}

impl HttpBlobStore {
    /// Create a client for the configured bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: SupabaseStorageConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let base = config.base_url.as_str().trim_end_matches('/');
        let bucket = config.bucket.trim_matches('/');

        Ok(Self {
            inner: Arc::new(HttpBlobStoreInner {
                client,
                service_key: config.service_key,
                upload_base: format!("{base}/storage/v1/object/{bucket}"),
                public_base: format!("{base}/storage/v1/object/public/{bucket}"),
            }),
        })
    }

    /// Public URL for `key`, whether or not it exists yet.
    #[must_use]
    pub fn public_url_for(&self, key: &str) -> String {
        public_url(&self.inner.public_base, key)
    }
}

impl std::fmt::Debug for HttpBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBlobStore")
            .field("public_base", &self.inner.public_base)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        validate_key(key)?;
        let endpoint = public_url(&self.inner.upload_base, key);

        let response = self
            .inner
            .client
            .post(&endpoint)
            .bearer_auth(self.inner.service_key.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %body, "Storage upload rejected");
            return Err(StorageError::Http(format!("upload returned {status}: {body}")));
        }

        Ok(self.public_url_for(key))
    }

    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        validate_key(key)?;
        let response = self
            .inner
            .client
            .get(self.public_url_for(key))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::BAD_REQUEST {
            return Err(StorageError::NotFound(key.to_owned()));
        }
        if !status.is_success() {
            return Err(StorageError::Http(format!("download returned {status}")));
        }

        Ok(response.bytes().await?.to_vec())
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        strip_base(&self.inner.public_base, url)
    }
}

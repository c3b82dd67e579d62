//! Blob storage for product images.
//!
//! Uploads live under two logical prefixes:
//!
//! - `original/<name>` - the file exactly as the admin uploaded it
//! - `watermarked/<name>` - the composited derivative
//!
//! Both objects of one upload share the same generated `<name>`. Every
//! stored object gets a public URL that is recorded on the product image.

mod http;
mod local;
mod memory;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub use http::{HttpBlobStore, SupabaseStorageConfig};
pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;

/// Prefix for unmodified uploads.
pub const ORIGINAL_PREFIX: &str = "original";

/// Prefix for watermarked derivatives.
pub const WATERMARKED_PREFIX: &str = "watermarked";

/// Errors returned by blob stores.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No object is stored under the key.
    #[error("object not found: {0}")]
    NotFound(String),

    /// The key is empty or tries to escape the store.
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    /// Filesystem failure.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote storage rejected or failed the request.
    #[error("storage HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

/// Object storage that hands out public URLs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key` and return the object's public URL.
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;

    /// Read the object stored under `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Map a public URL produced by this store back to its key.
    ///
    /// Returns `None` for URLs this store did not produce.
    fn key_for_url(&self, url: &str) -> Option<String>;
}

/// Which blob store backend to open.
#[derive(Debug, Clone)]
pub enum StorageSettings {
    /// Files under `dir`, publicly reachable at `public_base/<key>`.
    Local { dir: PathBuf, public_base: String },
    /// A Supabase Storage bucket.
    Supabase(SupabaseStorageConfig),
}

impl StorageSettings {
    /// Open the configured store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client for a remote bucket cannot be built.
    pub fn open(&self) -> Result<Arc<dyn BlobStore>, StorageError> {
        Ok(match self {
            Self::Local { dir, public_base } => {
                Arc::new(LocalBlobStore::new(dir.clone(), public_base.clone()))
            }
            Self::Supabase(config) => Arc::new(HttpBlobStore::new(config.clone())?),
        })
    }

    /// Directory served under `/media` when objects live on local disk.
    #[must_use]
    pub fn local_dir(&self) -> Option<&std::path::Path> {
        match self {
            Self::Local { dir, .. } => Some(dir),
            Self::Supabase(_) => None,
        }
    }
}

/// Generate a collision-resistant object name keeping the upload's extension.
///
/// `Photo.PNG` becomes `<uuid>.png`; a file without an extension gets a bare
/// `<uuid>`.
#[must_use]
pub fn blob_name(file_name: &str) -> String {
    let stem = Uuid::new_v4();
    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase);

    match extension {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    }
}

/// Key for the original upload named `name`.
#[must_use]
pub fn original_key(name: &str) -> String {
    format!("{ORIGINAL_PREFIX}/{name}")
}

/// Key for the watermarked derivative named `name`.
#[must_use]
pub fn watermarked_key(name: &str) -> String {
    format!("{WATERMARKED_PREFIX}/{name}")
}

/// Derivatives are always JPEG, so they keep the stem but not the extension.
#[must_use]
pub fn derivative_name(name: &str) -> String {
    let stem = name.split_once('.').map_or(name, |(stem, _)| stem);
    format!("{stem}.jpg")
}

/// Reject keys that are empty, absolute, or contain parent segments.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if bad {
        return Err(StorageError::InvalidKey(key.to_owned()));
    }
    Ok(())
}

/// Join a public base URL and a key with exactly one slash.
pub(crate) fn public_url(base: &str, key: &str) -> String {
    format!("{}/{key}", base.trim_end_matches('/'))
}

/// Strip `base/` from `url`, returning the key if one remains.
pub(crate) fn strip_base(base: &str, url: &str) -> Option<String> {
    let prefix = format!("{}/", base.trim_end_matches('/'));
    url.strip_prefix(&prefix)
        .filter(|key| validate_key(key).is_ok())
        .map(str::to_owned)
}

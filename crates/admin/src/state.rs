//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use vitrina_core::{BlobStore, CatalogRepository};

use crate::services::{AdminCredentials, ProductUploader, Watermarker};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    catalog: Arc<dyn CatalogRepository>,
    blobs: Arc<dyn BlobStore>,
    watermarker: Arc<Watermarker>,
    credentials: AdminCredentials,
    remote_timeout: Duration,
}

impl AppState {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        blobs: Arc<dyn BlobStore>,
        watermarker: Watermarker,
        credentials: AdminCredentials,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                catalog,
                blobs,
                watermarker: Arc::new(watermarker),
                credentials,
                remote_timeout,
            }),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &dyn CatalogRepository {
        self.inner.catalog.as_ref()
    }

    #[must_use]
    pub fn blobs(&self) -> &dyn BlobStore {
        self.inner.blobs.as_ref()
    }

    #[must_use]
    pub fn credentials(&self) -> &AdminCredentials {
        &self.inner.credentials
    }

    /// Uploader for the create-product flow.
    #[must_use]
    pub fn uploader(&self) -> ProductUploader<'_> {
        ProductUploader::new(
            self.catalog(),
            self.blobs(),
            &self.inner.watermarker,
            self.inner.remote_timeout,
        )
    }
}

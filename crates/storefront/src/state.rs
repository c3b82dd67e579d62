//! Application state shared across handlers.

use std::sync::Arc;

use vitrina_core::{BlobStore, CatalogRepository};

use crate::config::CheckoutConfig;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// catalog, the blob store and checkout settings.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    catalog: Arc<dyn CatalogRepository>,
    blobs: Arc<dyn BlobStore>,
    checkout: CheckoutConfig,
    distributor_url: Option<String>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        blobs: Arc<dyn BlobStore>,
        checkout: CheckoutConfig,
        distributor_url: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                catalog,
                blobs,
                checkout,
                distributor_url,
            }),
        }
    }

    /// Get the catalog repository.
    #[must_use]
    pub fn catalog(&self) -> &dyn CatalogRepository {
        self.inner.catalog.as_ref()
    }

    /// Get the blob store holding product images.
    #[must_use]
    pub fn blobs(&self) -> &dyn BlobStore {
        self.inner.blobs.as_ref()
    }

    /// Get the checkout handoff settings.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutConfig {
        &self.inner.checkout
    }

    /// Distributor group link, if configured.
    #[must_use]
    pub fn distributor_url(&self) -> Option<&str> {
        self.inner.distributor_url.as_deref()
    }
}

//! Product creation with image uploads.
//!
//! Files are handled one at a time: watermark, store the original, store the
//! derivative, record the image. The first failure stops the run and leaves
//! everything already recorded in place for the operator to reconcile.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use vitrina_core::storage::{blob_name, derivative_name, original_key, watermarked_key};
use vitrina_core::{
    BlobStore, CatalogError, CatalogRepository, NewProduct, NewProductImage, Product,
    ProductId, ProductImage, StorageError,
};

use super::watermark::{WatermarkError, Watermarker};

/// A file received from the create form.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A remote step in the upload flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStep {
    CreateProduct,
    StoreOriginal,
    StoreWatermarked,
    RecordImage,
}

impl fmt::Display for UploadStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CreateProduct => "creating the product",
            Self::StoreOriginal => "storing the original",
            Self::StoreWatermarked => "storing the watermarked copy",
            Self::RecordImage => "recording the image",
        })
    }
}

/// Why one step failed.
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Watermark(#[from] WatermarkError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("{step} timed out after {}s", .after.as_secs())]
    Timeout { step: UploadStep, after: Duration },
}

/// Upload flow errors.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Nothing was written.
    #[error("select at least one image")]
    NoImages,

    /// The product insert failed; nothing was written.
    #[error("could not create the product: {0}")]
    CreateProduct(#[source] StepError),

    /// The product exists with `saved` images; file `index` failed.
    #[error(
        "image {} ({file_name}) failed: {source}. The product was created with {saved} image(s)",
        .index + 1
    )]
    Image {
        product_id: ProductId,
        index: usize,
        file_name: String,
        saved: usize,
        #[source]
        source: StepError,
    },
}

impl UploadError {
    /// The product left behind by a partial failure, if any.
    #[must_use]
    pub const fn product_id(&self) -> Option<ProductId> {
        match self {
            Self::Image { product_id, .. } => Some(*product_id),
            Self::NoImages | Self::CreateProduct(_) => None,
        }
    }

    /// Whether the operator's input was the problem.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::NoImages
                | Self::CreateProduct(StepError::Catalog(CatalogError::InvalidInput(_)))
                | Self::Image {
                    source: StepError::Watermark(WatermarkError::Decode(_)),
                    ..
                }
        )
    }
}

/// Result of a completed upload.
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub product: Product,
    pub images: Vec<ProductImage>,
    /// How many images went out without the overlay.
    pub unwatermarked: usize,
}

/// Runs the create-with-images flow.
pub struct ProductUploader<'a> {
    catalog: &'a dyn CatalogRepository,
    blobs: &'a dyn BlobStore,
    watermarker: &'a Arc<Watermarker>,
    timeout: Duration,
}

impl<'a> ProductUploader<'a> {
    #[must_use]
    pub fn new(
        catalog: &'a dyn CatalogRepository,
        blobs: &'a dyn BlobStore,
        watermarker: &'a Arc<Watermarker>,
        timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            blobs,
            watermarker,
            timeout,
        }
    }

    /// Create `product` and attach `files` in order.
    ///
    /// # Errors
    ///
    /// See [`UploadError`]. On `UploadError::Image` the product and the
    /// images before `index` remain.
    #[tracing::instrument(skip_all, fields(product = %product.name, files = files.len()))]
    pub async fn create(
        &self,
        product: NewProduct,
        files: Vec<UploadFile>,
    ) -> Result<UploadReport, UploadError> {
        if files.is_empty() {
            return Err(UploadError::NoImages);
        }

        let product = self
            .bounded(UploadStep::CreateProduct, self.catalog.create_product(product))
            .await
            .map_err(UploadError::CreateProduct)?;
        tracing::info!(product_id = %product.id, "Product created");

        let mut images = Vec::with_capacity(files.len());
        let mut unwatermarked = 0;

        for (index, file) in files.into_iter().enumerate() {
            let file_name = file.file_name.clone();
            match self.store_image(product.id, file).await {
                Ok((image, applied)) => {
                    if !applied {
                        unwatermarked += 1;
                    }
                    tracing::info!(
                        product_id = %product.id,
                        index,
                        watermarked = applied,
                        "Image saved"
                    );
                    images.push(image);
                }
                Err(source) => {
                    tracing::warn!(
                        product_id = %product.id,
                        index,
                        file_name = %file_name,
                        saved = images.len(),
                        error = %source,
                        "Image upload failed, stopping"
                    );
                    return Err(UploadError::Image {
                        product_id: product.id,
                        index,
                        file_name,
                        saved: images.len(),
                        source,
                    });
                }
            }
        }

        Ok(UploadReport {
            product,
            images,
            unwatermarked,
        })
    }

    async fn store_image(
        &self,
        product_id: ProductId,
        file: UploadFile,
    ) -> Result<(ProductImage, bool), StepError> {
        let UploadFile {
            file_name,
            content_type,
            bytes,
        } = file;

        // Decode before anything is stored so a bad file leaves no blobs
        let watermarked = self.watermarker.apply_blocking(bytes.clone()).await?;

        let name = blob_name(&file_name);
        let image_url = self
            .bounded(
                UploadStep::StoreOriginal,
                self.blobs.put(&original_key(&name), bytes, &content_type),
            )
            .await?;

        let watermarked_url = if watermarked.applied {
            let key = watermarked_key(&derivative_name(&name));
            Some(
                self.bounded(
                    UploadStep::StoreWatermarked,
                    self.blobs.put(&key, watermarked.bytes, "image/jpeg"),
                )
                .await?,
            )
        } else {
            None
        };

        let image = self
            .bounded(
                UploadStep::RecordImage,
                self.catalog.add_product_image(
                    product_id,
                    NewProductImage {
                        image_url,
                        watermarked_url,
                    },
                ),
            )
            .await?;

        Ok((image, watermarked.applied))
    }

    async fn bounded<T, E>(
        &self,
        step: UploadStep,
        future: impl Future<Output = Result<T, E>>,
    ) -> Result<T, StepError>
    where
        StepError: From<E>,
    {
        match tokio::time::timeout(self.timeout, future).await {
            Ok(result) => result.map_err(StepError::from),
            Err(_) => Err(StepError::Timeout {
                step,
                after: self.timeout,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::io::Cursor;

    use async_trait::async_trait;
    use image::{ImageFormat, Rgba, RgbaImage};
    use vitrina_core::{MemoryBlobStore, MemoryCatalog, Price};

    use super::*;

    fn png() -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        RgbaImage::from_pixel(120, 80, Rgba([10, 120, 30, 255]))
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn file(name: &str, bytes: Vec<u8>) -> UploadFile {
        UploadFile {
            file_name: name.to_string(),
            content_type: "image/png".to_string(),
            bytes,
        }
    }

    fn new_product() -> NewProduct {
        NewProduct {
            name: "Necklace".to_string(),
            description: String::new(),
            price: Price::parse("12.00").unwrap(),
            category_id: None,
        }
    }

    fn overlay() -> (tempfile::TempDir, Arc<Watermarker>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        let mut out = Cursor::new(Vec::new());
        RgbaImage::from_pixel(20, 10, Rgba([255, 255, 255, 255]))
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        std::fs::write(&path, out.into_inner()).unwrap();
        (dir, Arc::new(Watermarker::new(path)))
    }

    #[tokio::test]
    async fn test_no_images_writes_nothing() {
        let catalog = MemoryCatalog::new();
        let blobs = MemoryBlobStore::default();
        let (_dir, watermarker) = overlay();
        let uploader =
            ProductUploader::new(&catalog, &blobs, &watermarker, Duration::from_secs(5));

        let err = uploader.create(new_product(), Vec::new()).await.unwrap_err();
        assert!(matches!(err, UploadError::NoImages));
        assert!(err.is_input_error());
        assert!(
            catalog
                .list_products(Default::default())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_each_file_gets_original_and_derivative() {
        let catalog = MemoryCatalog::new();
        let blobs = MemoryBlobStore::default();
        let (_dir, watermarker) = overlay();
        let uploader =
            ProductUploader::new(&catalog, &blobs, &watermarker, Duration::from_secs(5));

        let report = uploader
            .create(
                new_product(),
                vec![file("a.png", png()), file("b.png", png())],
            )
            .await
            .unwrap();

        assert_eq!(report.images.len(), 2);
        assert_eq!(report.unwatermarked, 0);
        assert_eq!(blobs.keys().await.len(), 4);
        for image in &report.images {
            let derivative = image.watermarked_url.as_deref().unwrap();
            assert!(image.image_url.contains("/original/"));
            assert!(derivative.contains("/watermarked/"));
            assert!(derivative.ends_with(".jpg"));
        }

        let key = blobs.key_for_url(&report.images[0].image_url).unwrap();
        assert_eq!(blobs.object(&key).await.unwrap().bytes, png());
    }

    #[tokio::test]
    async fn test_missing_overlay_records_no_derivative() {
        let catalog = MemoryCatalog::new();
        let blobs = MemoryBlobStore::default();
        let watermarker = Arc::new(Watermarker::new("/nonexistent/logo.png"));
        let uploader =
            ProductUploader::new(&catalog, &blobs, &watermarker, Duration::from_secs(5));

        let report = uploader
            .create(new_product(), vec![file("a.png", png())])
            .await
            .unwrap();

        assert_eq!(report.unwatermarked, 1);
        assert_eq!(report.images[0].watermarked_url, None);
        assert_eq!(blobs.keys().await.len(), 1);
    }

    #[tokio::test]
    async fn test_bad_file_stops_and_keeps_earlier_images() {
        let catalog = MemoryCatalog::new();
        let blobs = MemoryBlobStore::default();
        let (_dir, watermarker) = overlay();
        let uploader =
            ProductUploader::new(&catalog, &blobs, &watermarker, Duration::from_secs(5));

        let err = uploader
            .create(
                new_product(),
                vec![
                    file("a.png", png()),
                    file("broken.png", b"garbage".to_vec()),
                    file("c.png", png()),
                ],
            )
            .await
            .unwrap_err();

        let UploadError::Image {
            product_id,
            index,
            saved,
            ..
        } = &err
        else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!((*index, *saved), (1, 1));
        assert!(err.is_input_error());
        assert!(err.to_string().contains("image 2 (broken.png)"));

        let product = catalog.get_product(*product_id).await.unwrap().unwrap();
        assert_eq!(product.images.len(), 1);
        assert_eq!(blobs.keys().await.len(), 2);
    }

    struct StalledStore;

    #[async_trait]
    impl BlobStore for StalledStore {
        async fn put(
            &self,
            _key: &str,
            _bytes: Vec<u8>,
            _content_type: &str,
        ) -> Result<String, StorageError> {
            std::future::pending().await
        }

        async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
            Err(StorageError::NotFound(key.to_string()))
        }

        fn key_for_url(&self, _url: &str) -> Option<String> {
            None
        }
    }

    #[tokio::test]
    async fn test_stalled_store_times_out() {
        let catalog = MemoryCatalog::new();
        let store = StalledStore;
        let (_dir, watermarker) = overlay();
        let uploader = ProductUploader::new(
            &catalog,
            &store,
            &watermarker,
            Duration::from_millis(50),
        );

        let err = uploader
            .create(new_product(), vec![file("a.png", png())])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            UploadError::Image {
                saved: 0,
                source: StepError::Timeout {
                    step: UploadStep::StoreOriginal,
                    ..
                },
                ..
            }
        ));
        assert!(!err.is_input_error());
    }
}

//! In-memory catalog for tests and local demos.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{
    CatalogError, CatalogRepository, Category, NewProduct, NewProductImage, Product, ProductFilter,
    ProductImage, ProductUpdate, validate_category_name,
};
use crate::types::{CategoryId, ProductId};

/// Catalog held in process memory.
///
/// Products are kept in insertion order; listings walk them newest first.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    products: Vec<Product>,
    categories: Vec<Category>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogRepository for MemoryCatalog {
    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>, CatalogError> {
        let inner = self.inner.read().await;
        Ok(inner
            .products
            .iter()
            .rev()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        let inner = self.inner.read().await;
        Ok(inner.products.iter().find(|p| p.id == id).cloned())
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        let product = product.validated()?;
        let created = Product {
            id: ProductId::new(),
            name: product.name,
            description: product.description,
            price: product.price,
            category_id: product.category_id,
            is_out_of_stock: false,
            images: Vec::new(),
            created_at: Utc::now(),
        };
        self.inner.write().await.products.push(created.clone());
        Ok(created)
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<(), CatalogError> {
        let update = update.validated()?;
        let mut inner = self.inner.write().await;
        let product = inner
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(CatalogError::NotFound)?;
        product.name = update.name;
        product.description = update.description;
        product.price = update.price;
        product.category_id = update.category_id;
        Ok(())
    }

    async fn set_out_of_stock(
        &self,
        id: ProductId,
        out_of_stock: bool,
    ) -> Result<(), CatalogError> {
        let mut inner = self.inner.write().await;
        let product = inner
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(CatalogError::NotFound)?;
        product.is_out_of_stock = out_of_stock;
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        let mut inner = self.inner.write().await;
        let before = inner.products.len();
        inner.products.retain(|p| p.id != id);
        if inner.products.len() == before {
            return Err(CatalogError::NotFound);
        }
        Ok(())
    }

    async fn add_product_image(
        &self,
        product_id: ProductId,
        image: NewProductImage,
    ) -> Result<ProductImage, CatalogError> {
        let mut inner = self.inner.write().await;
        let product = inner
            .products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or(CatalogError::NotFound)?;
        let image = ProductImage {
            image_url: image.image_url,
            watermarked_url: image.watermarked_url,
        };
        product.images.push(image.clone());
        Ok(image)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        let mut categories = self.inner.read().await.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn create_category(&self, name: &str) -> Result<Category, CatalogError> {
        let category = Category {
            id: CategoryId::new(),
            name: validate_category_name(name)?,
        };
        self.inner.write().await.categories.push(category.clone());
        Ok(category)
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), CatalogError> {
        let mut inner = self.inner.write().await;
        let before = inner.categories.len();
        inner.categories.retain(|c| c.id != id);
        if inner.categories.len() == before {
            return Err(CatalogError::NotFound);
        }
        Ok(())
    }
}

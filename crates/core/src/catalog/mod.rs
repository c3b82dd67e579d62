//! Catalog model and repository interface.
//!
//! The remote relational store holds three tables:
//!
//! - `products` - name, description, price, optional category, stock flag
//! - `categories` - id and display name
//! - `product_images` - original and watermarked URLs per product, in upload order
//!
//! Handlers only talk to [`CatalogRepository`]; the PostgreSQL adapter lives
//! in [`postgres`] (feature `postgres`) and [`MemoryCatalog`] backs tests.

mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CategoryId, Price, ProductId};

pub use memory::MemoryCatalog;

/// Label shown for products without a resolvable category.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Errors returned by catalog repositories.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The referenced product or category does not exist.
    #[error("not found")]
    NotFound,

    /// Input failed validation before reaching the store.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The backing store failed.
    #[error("catalog backend error: {0}")]
    Backend(String),
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            other => Self::Backend(other.to_string()),
        }
    }
}

/// A product image pair.
///
/// `image_url` points at the untouched upload, `watermarked_url` at the
/// derivative (absent when watermarking was skipped).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermarked_url: Option<String>,
}

impl ProductImage {
    /// URL to hand out for downloads: the watermarked copy when present.
    #[must_use]
    pub fn download_url(&self) -> &str {
        self.watermarked_url.as_deref().unwrap_or(&self.image_url)
    }
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub is_out_of_stock: bool,
    /// Images in display order (the order they were uploaded).
    #[serde(default)]
    pub images: Vec<ProductImage>,
    pub created_at: DateTime<Utc>,
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// Fields for inserting a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub category_id: Option<CategoryId>,
}

impl NewProduct {
    /// Trim text fields and reject an empty name.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidInput` if the name is blank.
    pub fn validated(self) -> Result<Self, CatalogError> {
        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err(CatalogError::InvalidInput("product name is required".into()));
        }
        Ok(Self {
            name,
            description: self.description.trim().to_owned(),
            ..self
        })
    }
}

/// Editable product fields.
pub type ProductUpdate = NewProduct;

/// An image record to attach to a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProductImage {
    pub image_url: String,
    pub watermarked_url: Option<String>,
}

/// Optional filters for product listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category_id: Option<CategoryId>,
}

impl ProductFilter {
    /// Whether a product passes the filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.category_id
            .is_none_or(|wanted| product.category_id == Some(wanted))
    }
}

/// Narrow interface over the remote catalog store.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// List products, newest first, each with its images in upload order.
    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>, CatalogError>;

    /// Get one product with its images.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, CatalogError>;

    /// Insert a product and return it with its generated id.
    async fn create_product(&self, product: NewProduct) -> Result<Product, CatalogError>;

    /// Overwrite a product's editable fields.
    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<(), CatalogError>;

    /// Set the out-of-stock flag.
    async fn set_out_of_stock(&self, id: ProductId, out_of_stock: bool)
    -> Result<(), CatalogError>;

    /// Delete a product and its image records. Stored blobs are left in place.
    async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError>;

    /// Append an image record to a product.
    async fn add_product_image(
        &self,
        product_id: ProductId,
        image: NewProductImage,
    ) -> Result<ProductImage, CatalogError>;

    /// List categories ordered by name.
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError>;

    /// Create a category. The name is trimmed and must not be empty.
    async fn create_category(&self, name: &str) -> Result<Category, CatalogError>;

    /// Delete a category. Products referencing it keep the dangling id.
    async fn delete_category(&self, id: CategoryId) -> Result<(), CatalogError>;

    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), CatalogError> {
        Ok(())
    }
}

/// Normalise a category name.
pub(crate) fn validate_category_name(name: &str) -> Result<String, CatalogError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::InvalidInput("category name is required".into()));
    }
    Ok(name.to_owned())
}

/// Products under one category heading.
#[derive(Debug, Clone)]
pub struct CategorySection {
    pub category_id: Option<CategoryId>,
    pub label: String,
    pub products: Vec<Product>,
}

/// Lookup from category id to display name.
///
/// Dangling or missing references resolve to [`UNCATEGORIZED`].
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    ordered: Vec<Category>,
    names: HashMap<CategoryId, String>,
}

impl CategoryIndex {
    /// Build an index over `categories`.
    #[must_use]
    pub fn new(categories: &[Category]) -> Self {
        let mut ordered = categories.to_vec();
        ordered.sort_by(|a, b| a.name.cmp(&b.name));
        let names = ordered.iter().map(|c| (c.id, c.name.clone())).collect();
        Self { ordered, names }
    }

    /// Display label for a product's category.
    #[must_use]
    pub fn label(&self, id: Option<CategoryId>) -> &str {
        id.and_then(|id| self.names.get(&id))
            .map_or(UNCATEGORIZED, String::as_str)
    }

    /// Whether `id` refers to a known category.
    #[must_use]
    pub fn contains(&self, id: CategoryId) -> bool {
        self.names.contains_key(&id)
    }

    /// Group products into sections in category name order.
    ///
    /// Product order inside each section is preserved. Products with no or
    /// a dangling category go to a trailing "Uncategorized" section. Empty
    /// sections are omitted.
    #[must_use]
    pub fn group(&self, products: Vec<Product>) -> Vec<CategorySection> {
        let mut by_category: HashMap<CategoryId, Vec<Product>> = HashMap::new();
        let mut uncategorized = Vec::new();

        for product in products {
            match product.category_id.filter(|id| self.contains(*id)) {
                Some(id) => by_category.entry(id).or_default().push(product),
                None => uncategorized.push(product),
            }
        }

        let mut sections: Vec<CategorySection> = self
            .ordered
            .iter()
            .filter_map(|category| {
                by_category
                    .remove(&category.id)
                    .map(|products| CategorySection {
                        category_id: Some(category.id),
                        label: category.name.clone(),
                        products,
                    })
            })
            .collect();

        if !uncategorized.is_empty() {
            sections.push(CategorySection {
                category_id: None,
                label: UNCATEGORIZED.to_owned(),
                products: uncategorized,
            });
        }

        sections
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn product(name: &str, category_id: Option<CategoryId>) -> Product {
        Product {
            id: ProductId::new(),
            name: name.to_owned(),
            description: String::new(),
            price: Price::parse("1.00").unwrap(),
            category_id,
            is_out_of_stock: false,
            images: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn category(name: &str) -> Category {
        Category {
            id: CategoryId::new(),
            name: name.to_owned(),
        }
    }

    #[test]
    fn test_download_url_prefers_watermarked() {
        let mut image = ProductImage {
            image_url: "https://cdn.test/original/a.jpg".into(),
            watermarked_url: Some("https://cdn.test/watermarked/a.jpg".into()),
        };
        assert_eq!(image.download_url(), "https://cdn.test/watermarked/a.jpg");
        image.watermarked_url = None;
        assert_eq!(image.download_url(), "https://cdn.test/original/a.jpg");
    }

    #[test]
    fn test_new_product_validation() {
        let new = NewProduct {
            name: "  Mug ".into(),
            description: " Ceramic\n".into(),
            price: Price::ZERO,
            category_id: None,
        };
        let valid = new.validated().unwrap();
        assert_eq!(valid.name, "Mug");
        assert_eq!(valid.description, "Ceramic");

        let blank = NewProduct {
            name: "   ".into(),
            description: String::new(),
            price: Price::ZERO,
            category_id: None,
        };
        assert!(matches!(blank.validated(), Err(CatalogError::InvalidInput(_))));
    }

    #[test]
    fn test_label_for_dangling_category() {
        let shoes = category("Shoes");
        let index = CategoryIndex::new(std::slice::from_ref(&shoes));
        assert_eq!(index.label(Some(shoes.id)), "Shoes");
        assert_eq!(index.label(Some(CategoryId::new())), UNCATEGORIZED);
        assert_eq!(index.label(None), UNCATEGORIZED);
    }

    #[test]
    fn test_group_orders_sections_by_name() {
        let toys = category("Toys");
        let books = category("Books");
        let index = CategoryIndex::new(&[toys.clone(), books.clone()]);

        let products = vec![
            product("robot", Some(toys.id)),
            product("novel", Some(books.id)),
            product("orphan", Some(CategoryId::new())),
            product("kite", Some(toys.id)),
            product("loose", None),
        ];

        let sections = index.group(products);
        let labels: Vec<&str> = sections.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Books", "Toys", UNCATEGORIZED]);

        let toy_names: Vec<&str> = sections[1].products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(toy_names, vec!["robot", "kite"]);
        assert_eq!(sections[2].products.len(), 2);
    }

    #[test]
    fn test_group_skips_empty_sections() {
        let empty = category("Empty");
        let index = CategoryIndex::new(&[empty]);
        let sections = index.group(vec![product("solo", None)]);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].label, UNCATEGORIZED);
    }

    #[test]
    fn test_filter_matches_category() {
        let books = CategoryId::new();
        let filter = ProductFilter {
            category_id: Some(books),
        };
        assert!(filter.matches(&product("novel", Some(books))));
        assert!(!filter.matches(&product("robot", None)));
        assert!(ProductFilter::default().matches(&product("robot", None)));
    }
}

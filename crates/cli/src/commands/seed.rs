//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! categories:
//!   - Rings
//!   - Necklaces
//! products:
//!   - name: Silver band
//!     description: Plain 3mm band
//!     price: "12.50"
//!     category: Rings
//!   - name: Old pendant
//!     price: "8"
//!     out_of_stock: true
//! ```
//!
//! Products reference categories by name; a name that is not listed under
//! `categories` is an error. Images are added through the admin panel.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use vitrina_core::catalog::postgres::{PgCatalog, create_pool};
use vitrina_core::{CatalogError, CatalogRepository, CategoryId, NewProduct, Price, ProductFilter};

use super::migrate::database_url;

/// Seed file contents.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

/// One product entry.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub out_of_stock: bool,
}

/// What a seed run changed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub removed_products: usize,
    pub removed_categories: usize,
    pub categories: usize,
    pub products: usize,
}

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid seed file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Product {product:?} references unknown category {category:?}")]
    UnknownCategory { product: String, category: String },

    #[error(transparent)]
    Migration(#[from] super::migrate::MigrationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Seed the catalog from a YAML file.
///
/// # Arguments
///
/// * `file_path` - Path to the YAML file
/// * `clear_existing` - If true, delete all products and categories first
///
/// # Errors
///
/// Returns an error if the file is missing or invalid, or if a database
/// operation fails.
pub async fn catalog(file_path: &str, clear_existing: bool) -> Result<(), SeedError> {
    dotenvy::dotenv().ok();

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(SeedError::FileNotFound(file_path.to_owned()));
    }

    info!(path = %file_path, "Loading seed file");

    // Parse before connecting so a typo never touches the database
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;
    check_categories(&seed)?;

    info!(
        categories = seed.categories.len(),
        products = seed.products.len(),
        "Parsed seed file"
    );

    let pool = create_pool(&database_url()?).await?;
    info!("Connected to database");

    let summary = apply(&PgCatalog::new(pool), seed, clear_existing).await?;

    info!(
        removed_products = summary.removed_products,
        removed_categories = summary.removed_categories,
        categories = summary.categories,
        products = summary.products,
        "Seeding complete"
    );
    Ok(())
}

/// Reject products whose category is not declared in the file.
fn check_categories(seed: &SeedFile) -> Result<(), SeedError> {
    for product in &seed.products {
        let Some(category) = &product.category else {
            continue;
        };
        if !seed.categories.contains(category) {
            return Err(SeedError::UnknownCategory {
                product: product.name.clone(),
                category: category.clone(),
            });
        }
    }
    Ok(())
}

/// Write a parsed seed file through the catalog repository.
///
/// # Errors
///
/// Returns an error if a product references an undeclared category or a
/// repository call fails. Rows written before the failure are kept.
pub async fn apply(
    catalog: &dyn CatalogRepository,
    seed: SeedFile,
    clear_existing: bool,
) -> Result<SeedSummary, SeedError> {
    check_categories(&seed)?;
    let mut summary = SeedSummary::default();

    if clear_existing {
        for product in catalog.list_products(ProductFilter::default()).await? {
            catalog.delete_product(product.id).await?;
            summary.removed_products += 1;
        }
        for category in catalog.list_categories().await? {
            catalog.delete_category(category.id).await?;
            summary.removed_categories += 1;
        }
    }

    let mut category_ids: HashMap<String, CategoryId> = HashMap::new();
    for name in seed.categories {
        if category_ids.contains_key(&name) {
            continue;
        }
        let category = catalog.create_category(&name).await?;
        category_ids.insert(name, category.id);
        summary.categories += 1;
    }

    for entry in seed.products {
        let category_id = entry
            .category
            .as_ref()
            .and_then(|name| category_ids.get(name).copied());

        let product = catalog
            .create_product(NewProduct {
                name: entry.name,
                description: entry.description,
                price: entry.price,
                category_id,
            })
            .await?;

        if entry.out_of_stock {
            catalog.set_out_of_stock(product.id, true).await?;
        }
        summary.products += 1;
    }

    Ok(summary)
}

//! PostgreSQL catalog repository.
//!
//! Schema lives in `crates/core/migrations/` and is applied with
//! `vitrina-cli migrate`. Queries are checked at runtime so the crate builds
//! without a live database.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::instrument;
use uuid::Uuid;

use super::{
    CatalogError, CatalogRepository, Category, NewProduct, NewProductImage, Product, ProductFilter,
    ProductImage, ProductUpdate, validate_category_name,
};
use crate::types::{CategoryId, Price, ProductId};

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: String,
    price: Decimal,
    category_id: Option<CategoryId>,
    is_out_of_stock: bool,
    created_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self, images: Vec<ProductImage>) -> Result<Product, CatalogError> {
        let price = Price::new(self.price).map_err(|e| {
            CatalogError::Backend(format!("invalid price for product {}: {e}", self.id))
        })?;
        Ok(Product {
            id: self.id,
            name: self.name,
            description: self.description,
            price,
            category_id: self.category_id,
            is_out_of_stock: self.is_out_of_stock,
            images,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ImageRow {
    product_id: ProductId,
    image_url: String,
    watermarked_url: Option<String>,
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
        }
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, category_id, is_out_of_stock, created_at";

/// Catalog repository backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    /// Create a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn images_for(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<ProductId, Vec<ProductImage>>, CatalogError> {
        let rows = sqlx::query_as::<_, ImageRow>(
            "SELECT product_id, image_url, watermarked_url \
             FROM product_images \
             WHERE product_id = ANY($1) \
             ORDER BY id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut images: HashMap<ProductId, Vec<ProductImage>> = HashMap::new();
        for row in rows {
            images.entry(row.product_id).or_default().push(ProductImage {
                image_url: row.image_url,
                watermarked_url: row.watermarked_url,
            });
        }
        Ok(images)
    }

    async fn with_images(&self, rows: Vec<ProductRow>) -> Result<Vec<Product>, CatalogError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id.as_uuid()).collect();
        let mut images = self.images_for(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let row_images = images.remove(&row.id).unwrap_or_default();
                row.into_product(row_images)
            })
            .collect()
    }
}

#[async_trait]
impl CatalogRepository for PgCatalog {
    async fn ping(&self) -> Result<(), CatalogError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>, CatalogError> {
        let rows = match filter.category_id {
            Some(category_id) => {
                sqlx::query_as::<_, ProductRow>(&format!(
                    "SELECT {PRODUCT_COLUMNS} FROM products \
                     WHERE category_id = $1 ORDER BY created_at DESC"
                ))
                .bind(category_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ProductRow>(&format!(
                    "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        self.with_images(rows).await
    }

    #[instrument(skip(self))]
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.with_images(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, product), fields(name = %product.name))]
    async fn create_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        let product = product.validated()?;
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products (name, description, price, category_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.amount())
        .bind(product.category_id)
        .fetch_one(&self.pool)
        .await?;

        row.into_product(Vec::new())
    }

    #[instrument(skip(self, update))]
    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<(), CatalogError> {
        let update = update.validated()?;
        let result = sqlx::query(
            "UPDATE products \
             SET name = $2, description = $3, price = $4, category_id = $5 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.description)
        .bind(update.price.amount())
        .bind(update.category_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_out_of_stock(
        &self,
        id: ProductId,
        out_of_stock: bool,
    ) -> Result<(), CatalogError> {
        let result = sqlx::query("UPDATE products SET is_out_of_stock = $2 WHERE id = $1")
            .bind(id)
            .bind(out_of_stock)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, image))]
    async fn add_product_image(
        &self,
        product_id: ProductId,
        image: NewProductImage,
    ) -> Result<ProductImage, CatalogError> {
        let result = sqlx::query(
            "INSERT INTO product_images (product_id, image_url, watermarked_url) \
             VALUES ($1, $2, $3)",
        )
        .bind(product_id)
        .bind(&image.image_url)
        .bind(image.watermarked_url.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return CatalogError::NotFound;
            }
            CatalogError::from(e)
        })?;

        tracing::debug!(rows = result.rows_affected(), "product image recorded");
        Ok(ProductImage {
            image_url: image.image_url,
            watermarked_url: image.watermarked_url,
        })
    }

    #[instrument(skip(self))]
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        let rows =
            sqlx::query_as::<_, CategoryRow>("SELECT id, name FROM categories ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    #[instrument(skip(self))]
    async fn create_category(&self, name: &str) -> Result<Category, CatalogError> {
        let name = validate_category_name(name)?;
        let row = sqlx::query_as::<_, CategoryRow>(
            "INSERT INTO categories (name) VALUES ($1) RETURNING id, name",
        )
        .bind(&name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete_category(&self, id: CategoryId) -> Result<(), CatalogError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound);
        }
        Ok(())
    }
}

//! Integration tests for the `PostgreSQL` catalog adapter.
//!
//! These tests require a disposable database:
//!
//! ```bash
//! VITRINA_TEST_DATABASE_URL=postgres://localhost/vitrina_test \
//!     cargo test -p vitrina-integration-tests --test postgres_catalog -- --ignored
//! ```
//!
//! Each test works inside its own freshly created category so runs do not
//! interfere with each other.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use secrecy::SecretString;
use vitrina_core::catalog::postgres::{PgCatalog, create_pool};
use vitrina_core::{
    CatalogError, CatalogRepository, Category, CategoryId, NewProduct, NewProductImage, Price,
    ProductFilter, ProductId,
};

async fn catalog() -> PgCatalog {
    let url = std::env::var("VITRINA_TEST_DATABASE_URL")
        .expect("VITRINA_TEST_DATABASE_URL must point at a disposable database");
    let pool = create_pool(&SecretString::from(url)).await.unwrap();
    sqlx::migrate!("../core/migrations").run(&pool).await.unwrap();
    PgCatalog::new(pool)
}

async fn scratch_category(catalog: &PgCatalog) -> Category {
    catalog
        .create_category(&format!("test-{}", CategoryId::new()))
        .await
        .unwrap()
}

fn new_product(name: &str, price: &str, category: &Category) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        description: "  trimmed  ".to_string(),
        price: Price::parse(price).unwrap(),
        category_id: Some(category.id),
    }
}

#[tokio::test]
#[ignore = "Requires VITRINA_TEST_DATABASE_URL"]
async fn test_product_round_trip_with_images_in_upload_order() {
    let catalog = catalog().await;
    let category = scratch_category(&catalog).await;

    let product = catalog
        .create_product(new_product("Silver band", "12.50", &category))
        .await
        .unwrap();
    assert_eq!(product.description, "trimmed");
    assert!(!product.is_out_of_stock);

    for i in 0..3 {
        catalog
            .add_product_image(
                product.id,
                NewProductImage {
                    image_url: format!("https://cdn.example/original/{i}.png"),
                    watermarked_url: (i != 1)
                        .then(|| format!("https://cdn.example/watermarked/{i}.jpg")),
                },
            )
            .await
            .unwrap();
    }

    let stored = catalog.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(stored.price, Price::parse("12.50").unwrap());
    assert_eq!(stored.images.len(), 3);
    for (i, image) in stored.images.iter().enumerate() {
        assert_eq!(image.image_url, format!("https://cdn.example/original/{i}.png"));
    }
    assert!(stored.images[1].watermarked_url.is_none());
    assert_eq!(
        stored.images[2].download_url(),
        "https://cdn.example/watermarked/2.jpg"
    );
}

#[tokio::test]
#[ignore = "Requires VITRINA_TEST_DATABASE_URL"]
async fn test_category_filter_and_newest_first() {
    let catalog = catalog().await;
    let category = scratch_category(&catalog).await;

    let older = catalog
        .create_product(new_product("Older", "1", &category))
        .await
        .unwrap();
    let newer = catalog
        .create_product(new_product("Newer", "2", &category))
        .await
        .unwrap();

    let products = catalog
        .list_products(ProductFilter {
            category_id: Some(category.id),
        })
        .await
        .unwrap();
    let ids: Vec<ProductId> = products.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);
}

#[tokio::test]
#[ignore = "Requires VITRINA_TEST_DATABASE_URL"]
async fn test_stock_update_and_delete() {
    let catalog = catalog().await;
    let category = scratch_category(&catalog).await;
    let product = catalog
        .create_product(new_product("Vase", "9", &category))
        .await
        .unwrap();

    catalog.set_out_of_stock(product.id, true).await.unwrap();
    assert!(
        catalog
            .get_product(product.id)
            .await
            .unwrap()
            .unwrap()
            .is_out_of_stock
    );

    let mut update = new_product("Tall vase", "10", &category);
    update.category_id = None;
    catalog.update_product(product.id, update).await.unwrap();
    let updated = catalog.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(updated.name, "Tall vase");
    assert_eq!(updated.category_id, None);

    catalog.delete_product(product.id).await.unwrap();
    assert!(catalog.get_product(product.id).await.unwrap().is_none());
    assert!(matches!(
        catalog.delete_product(product.id).await,
        Err(CatalogError::NotFound)
    ));

    catalog.delete_category(category.id).await.unwrap();
}

#[tokio::test]
#[ignore = "Requires VITRINA_TEST_DATABASE_URL"]
async fn test_image_for_missing_product_is_not_found() {
    let catalog = catalog().await;
    let result = catalog
        .add_product_image(
            ProductId::new(),
            NewProductImage {
                image_url: "https://cdn.example/original/x.png".to_string(),
                watermarked_url: None,
            },
        )
        .await;
    assert!(matches!(result, Err(CatalogError::NotFound)));
}

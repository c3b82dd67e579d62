//! Cart mutations and the checkout handoff, driven through the storefront
//! router with an in-memory catalog.

#![allow(clippy::unwrap_used)]

use axum::http::{StatusCode, header};
use tower::ServiceExt;
use vitrina_core::CatalogRepository;
use vitrina_integration_tests::{
    Overlay, TestShop, body_text, form_request, get_request, session_cookie,
};

/// Post `path` with a product id, keeping the session cookie.
async fn cart_post(shop: &TestShop, path: &str, id: &str, cookie: &mut Option<String>) {
    let response = shop
        .storefront
        .clone()
        .oneshot(form_request(
            path,
            &format!("product_id={id}"),
            cookie.as_deref(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path} failed");
    if cookie.is_none() {
        *cookie = session_cookie(&response);
    }
}

async fn checkout_message(shop: &TestShop, cookie: &str) -> String {
    let response = shop
        .storefront
        .clone()
        .oneshot(get_request("/checkout", Some(cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let location = response.headers()[header::LOCATION].to_str().unwrap();
    let (base, text) = location.split_once("?text=").unwrap();
    assert_eq!(base, "https://wa.me/15550100100");
    decode(text)
}

/// Percent-decode a query value.
fn decode(encoded: &str) -> String {
    let mut bytes = Vec::new();
    let mut chars = encoded.bytes();
    while let Some(b) = chars.next() {
        if b == b'%' {
            let hex = [chars.next().unwrap(), chars.next().unwrap()];
            let hex = std::str::from_utf8(&hex).unwrap();
            bytes.push(u8::from_str_radix(hex, 16).unwrap());
        } else {
            bytes.push(b);
        }
    }
    String::from_utf8(bytes).unwrap()
}

#[tokio::test]
async fn test_checkout_message_lists_lines_and_total() {
    let shop = TestShop::new(Overlay::Missing);
    let a = shop.product("ProductA", "10.00").await;
    let b = shop.product("ProductB", "5.50").await;

    let mut cookie = None;
    cart_post(&shop, "/cart/add", &a.id.to_string(), &mut cookie).await;
    cart_post(&shop, "/cart/add", &a.id.to_string(), &mut cookie).await;
    cart_post(&shop, "/cart/add", &b.id.to_string(), &mut cookie).await;

    let message = checkout_message(&shop, &cookie.unwrap()).await;
    assert!(message.starts_with("Hello, I would like to place this order:"));
    assert!(message.contains("ProductA x2 - $20.00"));
    assert!(message.contains("ProductB x1 - $5.50"));
    assert!(message.ends_with("Total: $25.50"));

    // First-added order is kept
    let a_at = message.find("ProductA").unwrap();
    let b_at = message.find("ProductB").unwrap();
    assert!(a_at < b_at);
}

#[tokio::test]
async fn test_add_twice_then_decrease_leaves_one() {
    let shop = TestShop::new(Overlay::Missing);
    let product = shop.product("Candle", "4.00").await;
    let id = product.id.to_string();

    let mut cookie = None;
    cart_post(&shop, "/cart/add", &id, &mut cookie).await;
    cart_post(&shop, "/cart/add", &id, &mut cookie).await;
    cart_post(&shop, "/cart/decrease", &id, &mut cookie).await;
    let cookie = cookie.unwrap();

    let response = shop
        .storefront
        .clone()
        .oneshot(get_request("/cart/count", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains(">1<"));

    let message = checkout_message(&shop, &cookie).await;
    assert!(message.contains("Candle x1 - $4.00"));
    assert!(message.ends_with("Total: $4.00"));
}

#[tokio::test]
async fn test_decrease_last_unit_empties_cart() {
    let shop = TestShop::new(Overlay::Missing);
    let product = shop.product("Candle", "4.00").await;
    let id = product.id.to_string();

    let mut cookie = None;
    cart_post(&shop, "/cart/add", &id, &mut cookie).await;
    cart_post(&shop, "/cart/decrease", &id, &mut cookie).await;

    let response = shop
        .storefront
        .clone()
        .oneshot(get_request("/checkout", cookie.as_deref()))
        .await
        .unwrap();
    assert_eq!(response.headers()[header::LOCATION], "/cart");
}

#[tokio::test]
async fn test_product_marked_out_of_stock_cannot_be_added() {
    let shop = TestShop::new(Overlay::Missing);
    let product = shop.product("Vase", "12.00").await;
    shop.catalog.set_out_of_stock(product.id, true).await.unwrap();

    let response = shop
        .storefront
        .clone()
        .oneshot(form_request(
            "/cart/add",
            &format!("product_id={}", product.id),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_catalog_groups_products_under_category_headings() {
    let shop = TestShop::new(Overlay::Missing);
    let rings = shop.catalog.create_category("Rings").await.unwrap();
    shop.catalog
        .create_product(vitrina_core::NewProduct {
            name: "Band".to_string(),
            description: String::new(),
            price: vitrina_core::Price::parse("3").unwrap(),
            category_id: Some(rings.id),
        })
        .await
        .unwrap();
    shop.product("Loose stone", "1").await;

    let response = shop
        .storefront
        .clone()
        .oneshot(get_request("/", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("Rings"));
    assert!(html.contains("Uncategorized"));
    assert!(html.contains("Band"));
    assert!(html.contains("Loose stone"));
}

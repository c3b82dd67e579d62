//! Carts live in the visitor's session: they survive across requests from
//! the same browser and are invisible to other browsers.
//!
//! These tests serve the storefront on a local port and drive it with a
//! cookie-keeping HTTP client.

#![allow(clippy::unwrap_used)]

use axum::Router;
use reqwest::{Client, StatusCode, redirect};
use vitrina_integration_tests::{Overlay, TestShop};

/// Serve `router` on an ephemeral port and return its base URL.
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn browser() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

async fn cart_count(client: &Client, base_url: &str) -> String {
    let response = client
        .get(format!("{base_url}/cart/count"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response.text().await.unwrap()
}

#[tokio::test]
async fn test_cart_survives_across_requests() {
    let shop = TestShop::new(Overlay::Missing);
    let product = shop.product("Candle", "4.00").await;
    let base_url = serve(shop.storefront.clone()).await;
    let client = browser();

    for _ in 0..3 {
        let response = client
            .post(format!("{base_url}/cart/add"))
            .form(&[("product_id", product.id.to_string())])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    assert!(cart_count(&client, &base_url).await.contains(">3<"));

    let page = client
        .get(format!("{base_url}/cart"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Candle"));
    assert!(page.contains("$12.00"));
}

#[tokio::test]
async fn test_carts_are_per_browser() {
    let shop = TestShop::new(Overlay::Missing);
    let product = shop.product("Candle", "4.00").await;
    let base_url = serve(shop.storefront.clone()).await;

    let first = browser();
    first
        .post(format!("{base_url}/cart/add"))
        .form(&[("product_id", product.id.to_string())])
        .send()
        .await
        .unwrap();

    let second = browser();
    assert!(cart_count(&first, &base_url).await.contains(">1<"));
    assert!(!cart_count(&second, &base_url).await.contains("badge"));
}

#[tokio::test]
async fn test_cleared_cart_stays_empty() {
    let shop = TestShop::new(Overlay::Missing);
    let product = shop.product("Candle", "4.00").await;
    let base_url = serve(shop.storefront.clone()).await;
    let client = browser();

    client
        .post(format!("{base_url}/cart/add"))
        .form(&[("product_id", product.id.to_string())])
        .send()
        .await
        .unwrap();
    let response = client
        .post(format!("{base_url}/cart/clear"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = client
        .get(format!("{base_url}/checkout"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/cart");
}

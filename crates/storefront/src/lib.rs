//! Vitrina Storefront library.
//!
//! The public catalog, product detail actions, the session-persisted cart
//! and the checkout handoff. [`app`] assembles the router so the binary and
//! the integration tests serve the same stack.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

use std::path::Path;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, routing::get};
use tower_http::services::ServeDir;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::state::AppState;

/// Build the storefront router.
///
/// `media_dir` is served under `/media` when product images are stored on
/// local disk.
pub fn app<S>(
    state: AppState,
    session_layer: SessionManagerLayer<S>,
    media_dir: Option<&Path>,
) -> Router
where
    S: SessionStore + Clone,
{
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new("crates/storefront/static"));

    if let Some(dir) = media_dir {
        router = router.nest_service("/media", ServeDir::new(dir));
    }

    router
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(session_layer)
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the catalog store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.catalog().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, header};
    use tower::ServiceExt;
    use tower_sessions::MemoryStore;
    use vitrina_core::{
        CatalogRepository, MemoryBlobStore, MemoryCatalog, NewProduct, Price, ProductId,
    };

    use super::*;
    use crate::config::CheckoutConfig;

    async fn fixture() -> (Router, Arc<MemoryCatalog>) {
        let catalog = Arc::new(MemoryCatalog::new());
        let state = AppState::new(
            catalog.clone(),
            Arc::new(MemoryBlobStore::default()),
            CheckoutConfig {
                phone: "+1 555 0100".to_string(),
                greeting: "Hi!".to_string(),
            },
            None,
        );
        let layer = middleware::session_layer(MemoryStore::default(), false);
        (app(state, layer, None), catalog)
    }

    async fn product(catalog: &MemoryCatalog, name: &str, out_of_stock: bool) -> ProductId {
        let product = catalog
            .create_product(NewProduct {
                name: name.to_string(),
                description: String::new(),
                price: Price::parse("4.00").unwrap(),
                category_id: None,
            })
            .await
            .unwrap();
        if out_of_stock {
            catalog.set_out_of_stock(product.id, true).await.unwrap();
        }
        product.id
    }

    fn add_request(id: &str) -> Request<Body> {
        Request::post("/cart/add")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("product_id={id}")))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_and_security_headers() {
        let (app, _) = fixture().await;
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-frame-options"], "DENY");
        assert!(response.headers().contains_key(header::CONTENT_SECURITY_POLICY));
    }

    #[tokio::test]
    async fn test_readiness_with_memory_catalog() {
        let (app, _) = fixture().await;
        let response = app
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_add_out_of_stock_is_conflict() {
        let (app, catalog) = fixture().await;
        let id = product(&catalog, "Sold out", true).await;

        let response = app.oneshot(add_request(&id.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_add_unknown_product_is_not_found() {
        let (app, _) = fixture().await;
        let response = app
            .oneshot(add_request(&ProductId::new().to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_add_garbage_id_is_bad_request() {
        let (app, _) = fixture().await;
        let response = app.oneshot(add_request("not-a-uuid")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_checkout_with_empty_cart_returns_to_cart() {
        let (app, _) = fixture().await;
        let response = app
            .oneshot(Request::get("/checkout").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/cart");
    }

    #[tokio::test]
    async fn test_session_cookie_expires_after_thirty_idle_days() {
        let (app, catalog) = fixture().await;
        let id = product(&catalog, "Candle", false).await;

        let response = app.oneshot(add_request(&id.to_string())).await.unwrap();
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("vitrina_session="));
        let max_age: i64 = cookie
            .split(';')
            .find_map(|part| part.trim().strip_prefix("Max-Age="))
            .unwrap()
            .parse()
            .unwrap();
        // Sub-second drift between building the session and the cookie
        assert!((2_591_990..=2_592_000).contains(&max_age));
    }

    #[tokio::test]
    async fn test_add_then_checkout_redirects_to_chat() {
        let (app, catalog) = fixture().await;
        let id = product(&catalog, "Candle", false).await;

        let response = app
            .clone()
            .oneshot(add_request(&id.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = response.headers()[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();

        let response = app
            .oneshot(
                Request::get("/checkout")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://wa.me/15550100?text=Hi%21"));
        assert!(location.contains("Candle%20x1"));
    }
}

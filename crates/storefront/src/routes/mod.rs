//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Catalog grid (?category=<id>)
//!
//! # Products
//! GET  /products/{id}          - Product detail
//! GET  /products/{id}/share    - "Copy info" text
//! GET  /products/{id}/images/{index}/download - Image download
//!
//! # Cart
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add one unit
//! POST /cart/decrease          - Remove one unit
//! POST /cart/remove            - Remove a line
//! POST /cart/clear             - Empty the cart
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout
//! GET  /checkout               - Redirect to the messaging handoff
//! ```

pub mod cart;
pub mod catalog;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};
use vitrina_core::Cart;

use crate::state::AppState;

/// Data shared by every full page.
pub struct PageLayout {
    pub cart_count: u32,
    pub distributor_url: Option<String>,
}

impl PageLayout {
    /// Header data for the current visitor.
    #[must_use]
    pub fn new(state: &AppState, cart: &Cart) -> Self {
        Self {
            cart_count: cart.item_count(),
            distributor_url: state.distributor_url().map(str::to_owned),
        }
    }
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(products::show))
        .route("/{id}/share", get(products::share))
        .route("/{id}/images/{index}/download", get(products::download))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/decrease", post(cart::decrease))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::index))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", get(cart::checkout))
}

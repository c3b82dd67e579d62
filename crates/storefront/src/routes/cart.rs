//! Cart route handlers.
//!
//! Mutations are plain form posts that redirect back to the cart. Requests
//! sent with `HX-Request: true` get a fragment and a `cart-updated` trigger
//! instead, so the badge refreshes without a page load.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use vitrina_core::checkout::{checkout_url, order_message};
use vitrina_core::{Cart, CartItem, format_amount};

use super::PageLayout;
use super::products::parse_product_id;
use crate::error::{AppError, Result};
use crate::services::SessionCartStore;
use crate::state::AppState;

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub product_id: String,
    pub name: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total: String,
    pub item_count: u32,
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product.id.to_string(),
            name: item.product.name.clone(),
            image: item
                .product
                .images
                .first()
                .map(|image| image.download_url().to_owned()),
            quantity: item.quantity(),
            price: item.product.price.display(),
            line_price: format_amount(item.line_total()),
        }
    }
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.items().iter().map(CartItemView::from).collect(),
            total: format_amount(cart.total()),
            item_count: cart.item_count(),
        }
    }
}

/// Form carrying a product id.
#[derive(Debug, Deserialize)]
pub struct ProductForm {
    pub product_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: PageLayout,
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

fn is_fragment_request(headers: &HeaderMap) -> bool {
    headers
        .get("HX-Request")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == "true")
}

/// Response after a removal-type mutation.
fn items_response(headers: &HeaderMap, cart: &Cart) -> Response {
    if is_fragment_request(headers) {
        (
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            CartItemsTemplate {
                cart: CartView::from(cart),
            },
        )
            .into_response()
    } else {
        Redirect::to("/cart").into_response()
    }
}

/// Display cart page.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<impl IntoResponse> {
    let store = SessionCartStore::load(session).await?;
    Ok(CartShowTemplate {
        layout: PageLayout::new(&state, store.cart()),
        cart: CartView::from(store.cart()),
    })
}

/// Add one unit of a product.
///
/// Unknown products are 404 and out-of-stock products are 409; neither
/// touches the cart.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let id = parse_product_id(&form.product_id)?;
    let product = state
        .catalog()
        .get_product(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    if product.is_out_of_stock {
        return Err(AppError::Conflict(format!(
            "{} is out of stock",
            product.name
        )));
    }

    let mut store = SessionCartStore::load(session).await?;
    store.add_item(&product).await?;
    tracing::info!(product_id = %id, quantity = store.cart().quantity_of(id), "Added to cart");

    if is_fragment_request(&headers) {
        return Ok((
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            CartCountTemplate {
                count: store.cart().item_count(),
            },
        )
            .into_response());
    }
    Ok(Redirect::to("/cart").into_response())
}

/// Take one unit of a product off the cart.
#[instrument(skip(session, headers))]
pub async fn decrease(
    session: Session,
    headers: HeaderMap,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let id = parse_product_id(&form.product_id)?;
    let mut store = SessionCartStore::load(session).await?;
    store.decrease_item(id).await?;
    Ok(items_response(&headers, store.cart()))
}

/// Remove a product's line from the cart.
#[instrument(skip(session, headers))]
pub async fn remove(
    session: Session,
    headers: HeaderMap,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let id = parse_product_id(&form.product_id)?;
    let mut store = SessionCartStore::load(session).await?;
    store.remove_item(id).await?;
    Ok(items_response(&headers, store.cart()))
}

/// Empty the cart.
#[instrument(skip(session, headers))]
pub async fn clear(session: Session, headers: HeaderMap) -> Result<Response> {
    let mut store = SessionCartStore::load(session).await?;
    store.clear().await?;
    Ok(items_response(&headers, store.cart()))
}

/// Get cart count badge (HTMX).
#[instrument(skip(session))]
pub async fn count(session: Session) -> Result<impl IntoResponse> {
    let store = SessionCartStore::load(session).await?;
    Ok(CartCountTemplate {
        count: store.cart().item_count(),
    })
}

/// Hand the order off to the messaging channel.
///
/// The cart is left untouched; the visitor clears it once the order is sent.
#[instrument(skip(state, session))]
pub async fn checkout(State(state): State<AppState>, session: Session) -> Result<Response> {
    let store = SessionCartStore::load(session).await?;
    if store.cart().is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }

    let checkout = state.checkout();
    let message = order_message(store.cart(), &checkout.greeting);
    tracing::info!(
        lines = store.cart().items().len(),
        total = %store.cart().total(),
        "Checkout handoff"
    );
    Ok(Redirect::to(&checkout_url(&checkout.phone, &message)).into_response())
}

//! Product route handlers.
//!
//! The detail page offers add-to-cart, per-image download, download-all and
//! "copy info". Downloads prefer the watermarked derivative and are named
//! `{product name}-{n}.jpg`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;
use vitrina_core::checkout::share_text;
use vitrina_core::{CategoryIndex, Product, ProductId};

use super::PageLayout;
use crate::error::{AppError, Result};
use crate::services::SessionCartStore;
use crate::state::AppState;

/// Delay between consecutive downloads triggered by "download all".
pub const DOWNLOAD_ALL_SPACING_MS: u64 = 500;

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub category: String,
    pub is_out_of_stock: bool,
    pub cover: Option<String>,
    pub images: Vec<ImageView>,
}

/// Image display data for templates.
#[derive(Clone)]
pub struct ImageView {
    /// What visitors see: the watermarked copy when there is one.
    pub url: String,
    pub download_path: String,
    pub file_name: String,
}

impl ProductView {
    /// Build the view of `product` with its category label resolved.
    #[must_use]
    pub fn new(product: &Product, categories: &CategoryIndex) -> Self {
        let images: Vec<ImageView> = product
            .images
            .iter()
            .enumerate()
            .map(|(index, image)| ImageView {
                url: image.download_url().to_owned(),
                download_path: format!("/products/{}/images/{index}/download", product.id),
                file_name: download_file_name(&product.name, index),
            })
            .collect();

        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.display(),
            category: categories.label(product.category_id).to_owned(),
            is_out_of_stock: product.is_out_of_stock,
            cover: images.first().map(|image| image.url.clone()),
            images,
        }
    }
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub layout: PageLayout,
    pub product: ProductView,
    pub share_text: String,
    pub download_spacing_ms: u64,
}

/// File name offered for the image at `index` (zero based).
#[must_use]
pub fn download_file_name(product_name: &str, index: usize) -> String {
    format!("{product_name}-{}.jpg", index + 1)
}

/// Parse a product id from a path or form value.
pub(crate) fn parse_product_id(raw: &str) -> Result<ProductId> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("invalid product id '{raw}'")))
}

async fn find_product(state: &AppState, raw_id: &str) -> Result<Product> {
    let id = parse_product_id(raw_id)?;
    state
        .catalog()
        .get_product(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// Display product detail page.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let product = find_product(&state, &id).await?;
    let categories = CategoryIndex::new(&state.catalog().list_categories().await?);
    let cart = SessionCartStore::load(session).await?;

    Ok(ProductShowTemplate {
        layout: PageLayout::new(&state, cart.cart()),
        share_text: share_text(&product),
        product: ProductView::new(&product, &categories),
        download_spacing_ms: DOWNLOAD_ALL_SPACING_MS,
    })
}

/// Plain-text product summary for the "copy info" action.
#[instrument(skip(state))]
pub async fn share(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let product = find_product(&state, &id).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        share_text(&product),
    )
        .into_response())
}

/// Download one product image as an attachment.
///
/// Objects held by the configured blob store are streamed back with a
/// `Content-Disposition` header; foreign URLs are redirected to.
#[instrument(skip(state))]
pub async fn download(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, usize)>,
) -> Result<Response> {
    let product = find_product(&state, &id).await?;
    let image = product
        .images
        .get(index)
        .ok_or_else(|| AppError::NotFound(format!("image {index} of product {}", product.id)))?;
    let url = image.download_url();

    let Some(key) = state.blobs().key_for_url(url) else {
        return Ok(Redirect::to(url).into_response());
    };

    let bytes = state.blobs().get(&key).await?;
    let file_name = download_file_name(&product.name, index);

    let mut response = Response::new(Body::from(bytes));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&key)),
    );
    if let Ok(value) = HeaderValue::from_str(&content_disposition(&file_name)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

/// MIME type from an object key's extension.
fn content_type_for(key: &str) -> &'static str {
    let extension = key.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 name.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    )
}

//! Product manager route handlers.

use askama::Template;
use axum::{
    Form, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use vitrina_core::{
    Category, CategoryId, CategoryIndex, NewProduct, Price, Product, ProductFilter, ProductId,
};

use super::{AdminLayout, render};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::models::{CurrentAdmin, Flash};
use crate::services::{UploadError, UploadFile};
use crate::state::AppState;

/// Multipart field carrying image files.
const IMAGES_FIELD: &str = "images";

/// Product row for the manager list.
pub struct ProductRow {
    pub id: String,
    pub name: String,
    pub price: String,
    pub category: String,
    pub cover: Option<String>,
    pub image_count: usize,
    pub is_out_of_stock: bool,
    pub created_at: String,
}

impl ProductRow {
    fn new(product: &Product, categories: &CategoryIndex) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            price: product.price.display(),
            category: categories.label(product.category_id).to_string(),
            cover: product
                .images
                .first()
                .map(|image| image.download_url().to_owned()),
            image_count: product.images.len(),
            is_out_of_stock: product.is_out_of_stock,
            created_at: product.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Category choice in the product form.
pub struct CategoryOption {
    pub id: String,
    pub name: String,
    pub selected: bool,
}

fn category_options(categories: &[Category], selected: &str) -> Vec<CategoryOption> {
    categories
        .iter()
        .map(|category| {
            let id = category.id.to_string();
            CategoryOption {
                selected: id == selected,
                id,
                name: category.name.clone(),
            }
        })
        .collect()
}

/// Editable product fields as submitted.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProductFields {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub category_id: String,
}

impl ProductFields {
    fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.amount().to_string(),
            category_id: product
                .category_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
        }
    }

    /// Parse into catalog fields, returning a message for the operator.
    fn parse(&self) -> std::result::Result<NewProduct, String> {
        let price = Price::parse(&self.price).map_err(|e| format!("Price: {e}"))?;
        let category_id = match self.category_id.trim() {
            "" => None,
            raw => Some(
                raw.parse::<CategoryId>()
                    .map_err(|_| "Unknown category".to_string())?,
            ),
        };

        let product = NewProduct {
            name: self.name.clone(),
            description: self.description.clone(),
            price,
            category_id,
        };
        product.validated().map_err(|e| e.to_string())
    }
}

/// Products list page template.
#[derive(Template)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub layout: AdminLayout,
    pub products: Vec<ProductRow>,
}

/// Create form template.
#[derive(Template)]
#[template(path = "products/new.html")]
pub struct ProductNewTemplate {
    pub layout: AdminLayout,
    pub form: ProductFields,
    pub categories: Vec<CategoryOption>,
    pub error: Option<String>,
}

/// Edit form template.
#[derive(Template)]
#[template(path = "products/edit.html")]
pub struct ProductEditTemplate {
    pub layout: AdminLayout,
    pub product: ProductRow,
    pub images: Vec<String>,
    pub form: ProductFields,
    pub categories: Vec<CategoryOption>,
    pub error: Option<String>,
}

/// Build the products router.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(index)
                .post(create)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/new", get(new))
        .route("/{id}", post(update))
        .route("/{id}/edit", get(edit))
        .route("/{id}/stock", post(toggle_stock))
        .route("/{id}/delete", post(delete))
}

async fn find_product(state: &AppState, id: ProductId) -> Result<Product> {
    state
        .catalog()
        .get_product(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// Product manager list, newest first.
///
/// GET /products
#[instrument(skip(admin, state, session))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse> {
    let categories = state.catalog().list_categories().await?;
    let index = CategoryIndex::new(&categories);
    let products = state
        .catalog()
        .list_products(ProductFilter::default())
        .await?;

    let template = ProductsIndexTemplate {
        layout: AdminLayout::load(&admin, &session, "/products").await?,
        products: products
            .iter()
            .map(|product| ProductRow::new(product, &index))
            .collect(),
    };
    Ok(render(&template))
}

/// Create form.
///
/// GET /products/new
#[instrument(skip(admin, state, session))]
pub async fn new(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse> {
    let categories = state.catalog().list_categories().await?;
    let template = ProductNewTemplate {
        layout: AdminLayout::load(&admin, &session, "/products").await?,
        form: ProductFields::default(),
        categories: category_options(&categories, ""),
        error: None,
    };
    Ok(render(&template))
}

/// Read the create form: text fields plus every non-empty `images` part.
async fn read_create_form(
    mut multipart: Multipart,
) -> Result<(ProductFields, Vec<UploadFile>)> {
    let mut fields = ProductFields::default();
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == IMAGES_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await?;
            // Browsers send an empty part when no file is chosen
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }
            files.push(UploadFile {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let value = field.text().await?;
        match name.as_str() {
            "name" => fields.name = value,
            "description" => fields.description = value,
            "price" => fields.price = value,
            "category_id" => fields.category_id = value,
            _ => {}
        }
    }

    Ok((fields, files))
}

/// Create a product with its images.
///
/// POST /products
#[instrument(skip(admin, state, session, multipart))]
pub async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    multipart: Multipart,
) -> Result<Response> {
    let (form, files) = read_create_form(multipart).await?;

    let product = match form.parse() {
        Ok(product) => product,
        Err(message) => return render_new(&admin, &state, &session, form, message).await,
    };

    match state.uploader().create(product, files).await {
        Ok(report) => {
            let mut message = format!(
                "Created {} with {} image(s)",
                report.product.name,
                report.images.len()
            );
            if report.unwatermarked > 0 {
                message.push_str(
                    ". The watermark logo was unavailable, so images were stored without it",
                );
            }
            Flash::success(message).set(&session).await?;
            Ok(Redirect::to("/products").into_response())
        }
        Err(err) => {
            if !err.is_input_error() {
                let event_id = sentry::capture_error(&err);
                tracing::error!(error = %err, sentry_event_id = %event_id, "Product upload failed");
            }
            match err.product_id() {
                // Partial failure: the product exists, send the operator to it
                Some(id) => {
                    Flash::error(err.to_string()).set(&session).await?;
                    Ok(Redirect::to(&format!("/products/{id}/edit")).into_response())
                }
                None => render_new(&admin, &state, &session, form, upload_message(&err)).await,
            }
        }
    }
}

/// Show the create form again with the operator's input and a message.
async fn render_new(
    admin: &CurrentAdmin,
    state: &AppState,
    session: &Session,
    form: ProductFields,
    error: String,
) -> Result<Response> {
    let categories = state.catalog().list_categories().await?;
    let template = ProductNewTemplate {
        layout: AdminLayout::load(admin, session, "/products").await?,
        categories: category_options(&categories, &form.category_id),
        form,
        error: Some(error),
    };
    Ok((StatusCode::UNPROCESSABLE_ENTITY, render(&template)).into_response())
}

fn upload_message(err: &UploadError) -> String {
    match err {
        UploadError::NoImages => "Select at least one image".to_string(),
        other if other.is_input_error() => other.to_string(),
        _ => "Could not create the product. Please try again".to_string(),
    }
}

async fn render_edit(
    admin: &CurrentAdmin,
    state: &AppState,
    session: &Session,
    product: &Product,
    form: ProductFields,
    error: Option<String>,
) -> Result<ProductEditTemplate> {
    let categories = state.catalog().list_categories().await?;
    let index = CategoryIndex::new(&categories);

    Ok(ProductEditTemplate {
        layout: AdminLayout::load(admin, session, "/products").await?,
        product: ProductRow::new(product, &index),
        images: product
            .images
            .iter()
            .map(|image| image.download_url().to_owned())
            .collect(),
        categories: category_options(&categories, &form.category_id),
        form,
        error,
    })
}

/// Edit form.
///
/// GET /products/{id}/edit
#[instrument(skip(admin, state, session))]
pub async fn edit(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse> {
    let product = find_product(&state, id).await?;
    let form = ProductFields::from_product(&product);
    let template = render_edit(&admin, &state, &session, &product, form, None).await?;
    Ok(render(&template))
}

/// Update a product's fields.
///
/// POST /products/{id}
#[instrument(skip(admin, state, session, form))]
pub async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
    Form(form): Form<ProductFields>,
) -> Result<Response> {
    let product = find_product(&state, id).await?;

    let update = match form.parse() {
        Ok(update) => update,
        Err(message) => {
            let template =
                render_edit(&admin, &state, &session, &product, form, Some(message)).await?;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, render(&template)).into_response());
        }
    };

    let name = update.name.clone();
    state.catalog().update_product(id, update).await?;
    tracing::info!(product_id = %id, "Product updated");

    Flash::success(format!("Saved {name}")).set(&session).await?;
    Ok(Redirect::to("/products").into_response())
}

/// Flip the out-of-stock flag.
///
/// POST /products/{id}/stock
#[instrument(skip(_admin, state, session))]
pub async fn toggle_stock(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    let product = find_product(&state, id).await?;
    let out_of_stock = !product.is_out_of_stock;
    state.catalog().set_out_of_stock(id, out_of_stock).await?;
    tracing::info!(product_id = %id, out_of_stock, "Stock flag changed");

    let message = if out_of_stock {
        format!("{} marked out of stock", product.name)
    } else {
        format!("{} is back in stock", product.name)
    };
    Flash::success(message).set(&session).await?;
    Ok(Redirect::to("/products").into_response())
}

/// Delete a product and its image records.
///
/// POST /products/{id}/delete
#[instrument(skip(_admin, state, session))]
pub async fn delete(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    let product = find_product(&state, id).await?;
    state.catalog().delete_product(id).await?;
    tracing::info!(product_id = %id, "Product deleted");

    Flash::success(format!("Deleted {}", product.name))
        .set(&session)
        .await?;
    Ok(Redirect::to("/products").into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fields(price: &str, category_id: &str) -> ProductFields {
        ProductFields {
            name: "  Ring ".to_string(),
            description: String::new(),
            price: price.to_string(),
            category_id: category_id.to_string(),
        }
    }

    #[test]
    fn test_parse_trims_and_accepts_empty_category() {
        let product = fields("9.50", "").parse().unwrap();
        assert_eq!(product.name, "Ring");
        assert_eq!(product.price, Price::parse("9.50").unwrap());
        assert_eq!(product.category_id, None);
    }

    #[test]
    fn test_parse_rejects_bad_price() {
        let message = fields("nine", "").parse().unwrap_err();
        assert!(message.starts_with("Price:"));
        assert!(fields("-1", "").parse().is_err());
    }

    #[test]
    fn test_parse_rejects_price_the_catalog_cannot_store() {
        assert_eq!(
            fields("1.005", "").parse().unwrap_err(),
            "Price: price can have at most 2 decimal places"
        );
        assert_eq!(
            fields("10000000000", "").parse().unwrap_err(),
            "Price: price must be below 10000000000"
        );
    }

    #[test]
    fn test_parse_rejects_garbage_category() {
        assert_eq!(
            fields("1", "not-a-uuid").parse().unwrap_err(),
            "Unknown category"
        );
    }

    #[test]
    fn test_parse_rejects_blank_name() {
        let mut form = fields("1", "");
        form.name = "   ".to_string();
        assert!(form.parse().is_err());
    }

    #[test]
    fn test_upload_message_hides_backend_details() {
        let err = UploadError::CreateProduct(crate::services::StepError::Catalog(
            vitrina_core::CatalogError::Backend("connection refused".to_string()),
        ));
        assert!(!upload_message(&err).contains("connection refused"));
        assert_eq!(
            upload_message(&UploadError::NoImages),
            "Select at least one image"
        );
    }
}

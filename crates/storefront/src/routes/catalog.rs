//! Catalog grid.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use vitrina_core::{CategoryId, CategoryIndex, ProductFilter};

use super::PageLayout;
use super::products::ProductView;
use crate::error::{AppError, Result};
use crate::services::SessionCartStore;
use crate::state::AppState;

/// Catalog query parameters.
#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
}

/// A category heading with its products.
pub struct SectionView {
    pub label: String,
    pub products: Vec<ProductView>,
}

/// Category link in the filter bar.
pub struct CategoryLink {
    pub id: String,
    pub name: String,
    pub active: bool,
}

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/index.html")]
pub struct CatalogTemplate {
    pub layout: PageLayout,
    pub categories: Vec<CategoryLink>,
    pub filtered: bool,
    pub sections: Vec<SectionView>,
}

/// Display the catalog grouped by category.
#[instrument(skip(state, session))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse> {
    let category_id = match query.category.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<CategoryId>()
                .map_err(|_| AppError::BadRequest(format!("invalid category '{raw}'")))?,
        ),
    };

    let categories = state.catalog().list_categories().await?;
    let products = state
        .catalog()
        .list_products(ProductFilter { category_id })
        .await?;
    let index = CategoryIndex::new(&categories);

    let sections = index
        .group(products)
        .into_iter()
        .map(|section| SectionView {
            products: section
                .products
                .iter()
                .map(|product| ProductView::new(product, &index))
                .collect(),
            label: section.label,
        })
        .collect();

    let cart = SessionCartStore::load(session).await?;

    Ok(CatalogTemplate {
        layout: PageLayout::new(&state, cart.cart()),
        categories: categories
            .iter()
            .map(|category| CategoryLink {
                id: category.id.to_string(),
                name: category.name.clone(),
                active: category_id == Some(category.id),
            })
            .collect(),
        filtered: category_id.is_some(),
        sections,
    })
}

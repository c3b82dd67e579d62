//! Category route handlers.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, State},
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use vitrina_core::{CatalogError, CategoryId};

use super::{AdminLayout, render};
use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::models::Flash;
use crate::state::AppState;

/// Category row for templates.
pub struct CategoryRow {
    pub id: String,
    pub name: String,
}

/// Categories page template.
#[derive(Template)]
#[template(path = "categories/index.html")]
pub struct CategoriesIndexTemplate {
    pub layout: AdminLayout,
    pub categories: Vec<CategoryRow>,
}

/// New category form.
#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub name: String,
}

/// Build the categories router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/{id}/delete", post(delete))
}

/// Category list with the create form.
///
/// GET /categories
#[instrument(skip(admin, state, session))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse> {
    let categories = state.catalog().list_categories().await?;
    let template = CategoriesIndexTemplate {
        layout: AdminLayout::load(&admin, &session, "/categories").await?,
        categories: categories
            .into_iter()
            .map(|category| CategoryRow {
                id: category.id.to_string(),
                name: category.name,
            })
            .collect(),
    };
    Ok(render(&template))
}

/// Create a category.
///
/// POST /categories
#[instrument(skip(_admin, state, session))]
pub async fn create(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CategoryForm>,
) -> Result<impl IntoResponse> {
    let flash = match state.catalog().create_category(&form.name).await {
        Ok(category) => {
            tracing::info!(category_id = %category.id, "Category created");
            Flash::success(format!("Added {}", category.name))
        }
        Err(CatalogError::InvalidInput(message)) => Flash::error(message),
        Err(e) => return Err(e.into()),
    };

    flash.set(&session).await?;
    Ok(Redirect::to("/categories"))
}

/// Delete a category.
///
/// Products keep the id and show as uncategorized.
///
/// POST /categories/{id}/delete
#[instrument(skip(_admin, state, session))]
pub async fn delete(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<CategoryId>,
) -> Result<impl IntoResponse> {
    state.catalog().delete_category(id).await?;
    tracing::info!(category_id = %id, "Category deleted");

    Flash::success("Category deleted").set(&session).await?;
    Ok(Redirect::to("/categories"))
}

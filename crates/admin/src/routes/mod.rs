//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Redirect to the product manager
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Check credentials
//! POST /auth/logout            - Logout
//!
//! # Products
//! GET  /products               - Product manager list
//! POST /products               - Create with images (multipart)
//! GET  /products/new           - Create form
//! GET  /products/{id}/edit     - Edit form
//! POST /products/{id}          - Update fields
//! POST /products/{id}/stock    - Toggle out-of-stock
//! POST /products/{id}/delete   - Delete
//!
//! # Categories
//! GET  /categories             - List with create form
//! POST /categories             - Create
//! POST /categories/{id}/delete - Delete
//! ```

pub mod auth;
pub mod categories;
pub mod products;

use askama::Template;
use axum::{
    Router,
    response::{Html, Redirect},
    routing::get,
};
use tower_sessions::Session;

use crate::error::Result;
use crate::models::{CurrentAdmin, Flash};
use crate::state::AppState;

/// Data shared by every page behind the login.
pub struct AdminLayout {
    pub email: String,
    pub current_path: &'static str,
    pub flash: Option<Flash>,
}

impl AdminLayout {
    /// Build the layout, consuming any pending flash message.
    ///
    /// # Errors
    ///
    /// Returns error if the session cannot be read.
    pub async fn load(
        admin: &CurrentAdmin,
        session: &Session,
        current_path: &'static str,
    ) -> Result<Self> {
        Ok(Self {
            email: admin.email.to_string(),
            current_path,
            flash: Flash::take(session).await?,
        })
    }
}

/// Render a template, logging failures.
pub fn render(template: &impl Template) -> Html<String> {
    Html(template.render().unwrap_or_else(|e| {
        tracing::error!("Template render error: {}", e);
        "Internal Server Error".to_string()
    }))
}

/// Create all routes for the admin panel.
///
/// `max_upload_bytes` bounds the multipart create request.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/products") }))
        .merge(auth::router())
        .nest("/products", products::router(max_upload_bytes))
        .nest("/categories", categories::router())
}

//! Vitrina Admin library.
//!
//! The operator panel for products and categories. Product creation runs
//! the watermark pipeline and stores both the original and the derivative
//! of every image. [`app`] assembles the router so the binary and the
//! integration tests serve the same stack.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, routing::get};
use tower_http::services::ServeDir;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::state::AppState;

/// Build the admin router.
pub fn app<S>(
    state: AppState,
    session_layer: SessionManagerLayer<S>,
    max_upload_bytes: usize,
) -> Router
where
    S: SessionStore + Clone,
{
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes(max_upload_bytes))
        .nest_service("/static", ServeDir::new("crates/admin/static"))
        .layer(session_layer)
        .with_state(state)
}

/// Liveness health check endpoint.
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

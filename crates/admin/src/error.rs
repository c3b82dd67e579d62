//! Unified error handling for admin.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use vitrina_core::{CatalogError, StorageError};

/// Application-level error type for the admin panel.
#[derive(Debug, Error)]
pub enum AppError {
    /// Catalog store operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Blob store operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Session store read or write failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        Self::BadRequest(err.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(
            self,
            Self::Catalog(CatalogError::Backend(_))
                | Self::Storage(StorageError::Io(_) | StorageError::Http(_))
                | Self::Session(_)
                | Self::Internal(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        let status = match &self {
            Self::Catalog(CatalogError::NotFound)
            | Self::Storage(StorageError::NotFound(_))
            | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Catalog(CatalogError::InvalidInput(_))
            | Self::Storage(StorageError::InvalidKey(_))
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Storage(StorageError::Http(_)) => StatusCode::BAD_GATEWAY,
            Self::Catalog(_) | Self::Storage(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Catalog(CatalogError::InvalidInput(msg)) => msg.clone(),
            Self::Catalog(CatalogError::NotFound) => "Not found".to_string(),
            Self::Storage(StorageError::Http(_)) => "External service error".to_string(),
            Self::Catalog(_) | Self::Storage(_) | Self::Session(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the logged-in operator.
pub fn set_sentry_user(email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

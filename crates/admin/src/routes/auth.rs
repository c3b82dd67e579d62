//! Authentication route handlers for admin.

use askama::Template;
use axum::{
    Form, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::render;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_admin, login_rate_limiter, set_current_admin};
use crate::models::CurrentAdmin;
use crate::services::AuthError;
use crate::state::AppState;

/// Login page template.
#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginPageTemplate {
    pub email: String,
    pub error: Option<String>,
}

/// Login form fields.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Build the auth router.
///
/// Credential checks are throttled per client address; the login page is not.
pub fn router() -> Router<AppState> {
    let check = match login_rate_limiter() {
        Some(limiter) => post(login).layer(limiter),
        None => {
            tracing::error!("Login rate limiter config rejected; logins are unthrottled");
            post(login)
        }
    };

    Router::new()
        .route("/auth/login", get(login_page).merge(check))
        .route("/auth/logout", post(logout))
}

/// Render the login page.
///
/// GET /auth/login
async fn login_page() -> impl IntoResponse {
    render(&LoginPageTemplate {
        email: String::new(),
        error: None,
    })
}

/// Check credentials and start the operator session.
///
/// POST /auth/login
#[instrument(skip(state, session, form))]
async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    match state.credentials().verify(&form.email, &form.password) {
        Ok(email) => {
            set_current_admin(&session, &CurrentAdmin::new(email.clone())).await?;
            set_sentry_user(email.as_str());
            tracing::info!("Operator logged in");
            Ok(Redirect::to("/products").into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            let message = match e {
                AuthError::InvalidEmail(_) => "Enter a valid email address",
                _ => "Invalid email or password",
            };
            Ok((
                StatusCode::UNAUTHORIZED,
                render(&LoginPageTemplate {
                    email: form.email,
                    error: Some(message.to_string()),
                }),
            )
                .into_response())
        }
    }
}

/// Logout and clear session.
///
/// POST /auth/logout
async fn logout(session: Session) -> impl IntoResponse {
    if let Err(e) = clear_current_admin(&session).await {
        tracing::warn!(error = %e, "Failed to clear admin session");
    }
    clear_sentry_user();

    Redirect::to("/auth/login")
}

//! Session middleware configuration for admin.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions with
//! stricter settings than the storefront (SameSite=Strict, 24hr expiry).

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

/// Session cookie name for admin.
pub const SESSION_COOKIE_NAME: &str = "vitrina_admin_session";

/// Admin sessions live apart from storefront carts.
pub const SESSION_TABLE: &str = "admin_session";

/// Session expiry time in seconds (24 hours).
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// Create the admin session store.
///
/// The table is created by `vitrina-cli migrate`.
///
/// # Errors
///
/// Returns the store's message if the table name is rejected.
pub fn create_session_store(pool: &PgPool) -> Result<PostgresStore, String> {
    PostgresStore::new(pool.clone()).with_table_name(SESSION_TABLE)
}

/// Build the session layer over any store.
///
/// `secure` should be true when the panel is served over HTTPS.
#[must_use]
pub fn session_layer<S: SessionStore + Clone>(store: S, secure: bool) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(secure)
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}

//! Session middleware configuration.
//!
//! Carts are kept in `PostgreSQL`-backed sessions in production. Tests pass
//! a `MemoryStore` to [`session_layer`] instead.

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "vitrina_session";

/// Session expiry time in seconds (30 days).
///
/// Carts have no expiry of their own; an idle session is the only way one
/// goes away.
const SESSION_EXPIRY_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Create the session layer with `PostgreSQL` store.
///
/// The `tower_sessions` table is created by `vitrina-cli migrate`.
#[must_use]
pub fn create_session_layer(pool: &PgPool, base_url: &str) -> SessionManagerLayer<PostgresStore> {
    let store = PostgresStore::new(pool.clone());
    session_layer(store, base_url.starts_with("https://"))
}

/// Build the session layer over any store.
#[must_use]
pub fn session_layer<S: SessionStore + Clone>(store: S, secure: bool) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions, holds the cart)
//! 4. Security headers

pub mod security_headers;
pub mod session;

pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, session_layer};

//! HTTP middleware for admin.
//!
//! - `session` - tower-sessions layer (SameSite=Strict, 24hr expiry)
//! - `auth` - `RequireAdminAuth` extractor and login/logout helpers
//! - `rate_limit` - governor throttle on the login form

pub mod auth;
pub mod rate_limit;
pub mod session;

pub use auth::{RequireAdminAuth, clear_current_admin, set_current_admin};
pub use rate_limit::login_rate_limiter;
pub use session::{create_session_store, session_layer};

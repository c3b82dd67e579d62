//! Session-related types for admin authentication.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vitrina_core::Email;

/// Session-stored operator identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentAdmin {
    pub email: Email,
    pub logged_in_at: DateTime<Utc>,
}

impl CurrentAdmin {
    #[must_use]
    pub fn new(email: Email) -> Self {
        Self {
            email,
            logged_in_at: Utc::now(),
        }
    }
}

/// Session keys for admin data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";

    /// Key for the one-shot message shown on the next page.
    pub const FLASH: &str = "flash";
}

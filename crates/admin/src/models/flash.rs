//! One-shot messages carried across a redirect.
//!
//! Every operator-visible outcome is a single human-readable line. It is
//! stored in the session by the handler that redirects and removed by the
//! page that shows it.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::session::keys;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Error,
}

impl FlashKind {
    /// CSS class for the banner.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "flash-success",
            Self::Error => "flash-error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    /// Store the message for the next page.
    ///
    /// # Errors
    ///
    /// Returns error if the session cannot be written.
    pub async fn set(self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.insert(keys::FLASH, self).await
    }

    /// Remove and return the pending message, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the session cannot be read.
    pub async fn take(session: &Session) -> Result<Option<Self>, tower_sessions::session::Error> {
        session.remove(keys::FLASH).await
    }
}

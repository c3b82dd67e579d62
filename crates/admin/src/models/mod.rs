//! Session-stored models for admin.

pub mod flash;
pub mod session;

pub use flash::{Flash, FlashKind};
pub use session::{CurrentAdmin, keys as session_keys};

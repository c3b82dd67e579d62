//! Business logic services for admin.
//!
//! # Services
//!
//! - `auth` - Operator password authentication
//! - `watermark` - Overlay compositing and JPEG re-encoding
//! - `uploads` - Product creation with sequential image uploads

pub mod auth;
pub mod uploads;
pub mod watermark;

pub use auth::{AdminCredentials, AuthError, hash_password};
pub use uploads::{ProductUploader, StepError, UploadError, UploadFile, UploadReport};
pub use watermark::{WatermarkError, Watermarked, Watermarker};

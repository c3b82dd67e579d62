//! Watermark pipeline for product images.
//!
//! The overlay logo is composited into the top-left corner of each upload at
//! low opacity and the result is re-encoded as JPEG. When the logo cannot be
//! read the source is re-encoded without it; only an undecodable source is
//! an error.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageError, RgbaImage};
use thiserror::Error;

/// Overlay width as a fraction of the source width.
pub const OVERLAY_WIDTH_RATIO: f64 = 0.15;

/// Offset from the top-left corner as a fraction of the source width.
///
/// Used for both axes.
pub const PADDING_RATIO: f64 = 0.05;

/// Alpha multiplier applied to the overlay before compositing.
pub const OVERLAY_OPACITY: f64 = 0.25;

/// Encoder quality (0-100) for the JPEG derivative.
pub const JPEG_QUALITY: u8 = 80;

/// Watermark pipeline errors.
#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("unsupported or corrupt image: {0}")]
    Decode(#[source] ImageError),

    #[error("could not encode watermarked image: {0}")]
    Encode(#[source] ImageError),

    #[error("watermark task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Output of the pipeline.
#[derive(Debug, Clone)]
pub struct Watermarked {
    /// JPEG bytes, same dimensions as the source.
    pub bytes: Vec<u8>,
    /// Whether the overlay was composited. `false` means a plain re-encode.
    pub applied: bool,
}

/// Composites the overlay logo read from disk.
///
/// The logo is read on every call so it can be replaced without a restart.
#[derive(Debug, Clone)]
pub struct Watermarker {
    overlay_path: PathBuf,
}

impl Watermarker {
    #[must_use]
    pub fn new(overlay_path: impl Into<PathBuf>) -> Self {
        Self {
            overlay_path: overlay_path.into(),
        }
    }

    #[must_use]
    pub fn overlay_path(&self) -> &Path {
        &self.overlay_path
    }

    /// Run [`Self::apply`] on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Same as [`Self::apply`], plus `WatermarkError::Task` if the worker panics.
    pub async fn apply_blocking(
        self: &Arc<Self>,
        source: Vec<u8>,
    ) -> Result<Watermarked, WatermarkError> {
        let watermarker = Arc::clone(self);
        tokio::task::spawn_blocking(move || watermarker.apply(&source)).await?
    }

    /// Watermark `source` and encode it as JPEG.
    ///
    /// # Errors
    ///
    /// Returns `WatermarkError::Decode` if `source` is not a supported image
    /// and `WatermarkError::Encode` if the result cannot be written.
    pub fn apply(&self, source: &[u8]) -> Result<Watermarked, WatermarkError> {
        let mut canvas = image::load_from_memory(source)
            .map_err(WatermarkError::Decode)?
            .to_rgba8();

        let applied = match self.load_overlay() {
            Some(overlay) => {
                composite(&mut canvas, &overlay);
                true
            }
            None => false,
        };

        Ok(Watermarked {
            bytes: encode_jpeg(canvas)?,
            applied,
        })
    }

    fn load_overlay(&self) -> Option<RgbaImage> {
        let bytes = match std::fs::read(&self.overlay_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(
                    path = %self.overlay_path.display(),
                    error = %e,
                    "Watermark overlay unavailable, storing images without it"
                );
                return None;
            }
        };

        match image::load_from_memory(&bytes) {
            Ok(overlay) => Some(overlay.to_rgba8()),
            Err(e) => {
                tracing::warn!(
                    path = %self.overlay_path.display(),
                    error = %e,
                    "Watermark overlay unreadable, storing images without it"
                );
                None
            }
        }
    }
}

/// Overlay placement for a source of the given size: `(x, y, width, height)`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn overlay_geometry(
    source_width: u32,
    overlay_width: u32,
    overlay_height: u32,
) -> (i64, i64, u32, u32) {
    let width = (f64::from(source_width) * OVERLAY_WIDTH_RATIO).round().max(1.0);
    let aspect = f64::from(overlay_height) / f64::from(overlay_width.max(1));
    let height = (width * aspect).round().max(1.0);
    let padding = (f64::from(source_width) * PADDING_RATIO).round() as i64;

    (padding, padding, width as u32, height as u32)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn composite(canvas: &mut RgbaImage, overlay: &RgbaImage) {
    let (x, y, width, height) =
        overlay_geometry(canvas.width(), overlay.width(), overlay.height());

    let mut logo = imageops::resize(overlay, width, height, FilterType::Lanczos3);
    for pixel in logo.pixels_mut() {
        pixel[3] = (f64::from(pixel[3]) * OVERLAY_OPACITY).round() as u8;
    }

    imageops::overlay(canvas, &logo, x, y);
}

fn encode_jpeg(canvas: RgbaImage) -> Result<Vec<u8>, WatermarkError> {
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();

    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(WatermarkError::Encode)?;
    Ok(out.into_inner())
}

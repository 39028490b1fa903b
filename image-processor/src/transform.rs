//! Image transformation
//!
//! Decodes an upload, shrinks both axes by a fixed integer divisor and re-encodes the result as
//! JPEG. Grayscale inputs stay single-channel. The policy is deterministic for identical input bytes and an identical `image` crate
//! version; encoder output is not stable across encoder versions.

use std::fmt;

use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, ImageError};
use image_storage::environment::ServiceConfig;
use thiserror::Error;

/// Result type for transform operations
pub type TransformResult<T> = Result<T, TransformError>;

/// Errors that can occur while transforming an image
#[derive(Error, Debug)]
pub enum TransformError {
    /// Input bytes are not a decodable image
    #[error("Failed to decode image: {0}")]
    Decode(#[source] ImageError),

    /// Derived image could not be encoded
    #[error("Failed to encode image: {0}")]
    Encode(#[source] ImageError),

    /// Image is too small to shrink by the configured factor
    #[error("Image of {0} is too small to resize")]
    EmptyOutput(Dimensions),
}

/// Pixel dimensions of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Dimensions {
    /// Creates dimensions from a width and height
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Floor-divides both axes by `factor`
    #[must_use]
    pub const fn shrink(self, factor: u32) -> Self {
        Self {
            width: self.width / factor,
            height: self.height / factor,
        }
    }

    const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Formats as `WxH`
impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Derived image together with the dimensions before and after
#[derive(Debug, Clone)]
pub struct TransformOutput {
    /// Encoded JPEG bytes
    pub bytes: Vec<u8>,
    /// Dimensions of the decoded input
    pub original: Dimensions,
    /// Dimensions of the derived image
    pub derived: Dimensions,
}

/// Fixed resize-and-recompress policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformEngine {
    resize_factor: u32,
    jpeg_quality: u8,
}

impl Default for TransformEngine {
    fn default() -> Self {
        Self::new(2, 70)
    }
}

impl TransformEngine {
    /// MIME type of every derived image
    pub const OUTPUT_CONTENT_TYPE: &'static str = "image/jpeg";

    /// Creates an engine
    ///
    /// # Arguments
    ///
    /// * `resize_factor` - Divisor applied to both axes, clamped to at least 1
    /// * `jpeg_quality` - JPEG quality, clamped to 1-100
    #[must_use]
    pub fn new(resize_factor: u32, jpeg_quality: u8) -> Self {
        Self {
            resize_factor: resize_factor.max(1),
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    /// Creates an engine from the service configuration
    #[must_use]
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.resize_factor, config.jpeg_quality)
    }

    /// Decodes `raw`, shrinks it and re-encodes it as JPEG
    ///
    /// Alpha channels are dropped since JPEG cannot carry them. Grayscale inputs are encoded as
    /// 8-bit luma, everything else as 8-bit RGB.
    ///
    /// # Errors
    ///
    /// Returns `TransformError::Decode` if `raw` is not a supported image
    /// Returns `TransformError::EmptyOutput` if an axis would shrink to zero pixels
    /// Returns `TransformError::Encode` if JPEG encoding fails
    pub fn transform(&self, raw: &[u8]) -> TransformResult<TransformOutput> {
        let image = image::load_from_memory(raw).map_err(TransformError::Decode)?;

        let original = Dimensions::new(image.width(), image.height());
        let derived = original.shrink(self.resize_factor);
        if derived.is_empty() {
            return Err(TransformError::EmptyOutput(original));
        }

        let scaled = image.resize_exact(derived.width, derived.height, FilterType::CatmullRom);
        let resized = if scaled.color().has_color() {
            DynamicImage::ImageRgb8(scaled.to_rgb8())
        } else {
            DynamicImage::ImageLuma8(scaled.to_luma8())
        };

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, self.jpeg_quality)
            .encode(
                resized.as_bytes(),
                resized.width(),
                resized.height(),
                resized.color().into(),
            )
            .map_err(TransformError::Encode)?;

        Ok(TransformOutput {
            bytes,
            original,
            derived,
        })
    }
}

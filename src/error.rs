//! Error types for the watermark-inpaint crate.

use crate::geometry::Rect;

/// Errors that can occur during watermark detection, masking, and reconstruction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The vision engine has not finished loading; no detection or
    /// reconstruction call may proceed until it reports ready.
    #[error("vision engine is not ready")]
    EngineNotReady,

    /// Automatic detection found no region qualifying as a watermark.
    #[error("no watermark region detected")]
    NoWatermarkDetected,

    /// The reconstruction mask does not match the image dimensions.
    #[error("mask dimensions {mask_width}x{mask_height} do not match image {image_width}x{image_height}")]
    DimensionMismatch {
        /// Image width in pixels.
        image_width: u32,
        /// Image height in pixels.
        image_height: u32,
        /// Mask width in pixels.
        mask_width: u32,
        /// Mask height in pixels.
        mask_height: u32,
    },

    /// A supplied region lies entirely outside the image bounds.
    #[error("region {0:?} lies outside image bounds")]
    InvalidRegion(Rect),

    /// The requested operating mode is not recognized.
    #[error("unknown operating mode: {0:?}")]
    UnknownMode(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred during image processing (load, save, encode).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while encoding or writing output.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 3), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero or larger than a JPEG can hold
    #[error("Invalid dimensions: {width}x{height}, each side must be 1-65535 pixels")]
    InvalidDimensions { width: u32, height: u32 },

    /// Quality search parameters are out of range
    #[error("Invalid encode options: {0}")]
    InvalidOptions(String),

    /// JPEG encoding failed
    #[error("JPEG encoding failed: {0}")]
    EncodingFailed(String),

    /// The output file could not be written
    #[error("Failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

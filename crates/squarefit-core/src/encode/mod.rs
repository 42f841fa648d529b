//! Image encoding pipeline for squarefit.
//!
//! This module provides functionality for:
//! - Encoding images to JPEG format with configurable quality
//! - Searching downward for the highest quality that fits a byte budget
//! - Writing the result atomically next to its final path
//!
//! # Examples
//!
//! ```ignore
//! use squarefit_core::encode::{square_and_shrink, ShrinkOptions};
//! use squarefit_core::transform::PaddingSpec;
//!
//! let image = squarefit_core::decode::load(Path::new("photo.jpg"))?;
//! let result = square_and_shrink(&image, Path::new("out/photo.jpg"),
//!     &PaddingSpec::default(), &ShrinkOptions::default())?;
//! println!("q{} {} bytes", result.quality, result.size_bytes);
//! ```

mod error;
mod jpeg;
mod shrink;

pub use error::EncodeError;
pub use jpeg::encode_jpeg;
pub use shrink::{
    megabytes_to_bytes, search_quality, square_and_shrink, EncodeResult, QualitySearch,
    ShrinkOptions, BYTES_PER_MEGABYTE, DEFAULT_MAX_MEGABYTES, DEFAULT_QUALITY_MIN,
    DEFAULT_QUALITY_START, QUALITY_STEP,
};

//! Image loading for squarefit.
//!
//! This module provides functionality for:
//! - Decoding JPEG images (with EXIF orientation applied)
//! - Decoding HEIF/HEIC images through libheif (`heif` feature)
//! - Picking the decode path from the file extension
//!
//! Every path produces the same [`DecodedImage`] layout: interleaved RGB,
//! 3 bytes per pixel, row-major.

mod heif;
mod jpeg;
mod types;

use std::path::Path;

pub use heif::decode_heif_file;
pub use jpeg::decode_jpeg;
pub use types::{DecodeError, DecodedImage, LoadError, Orientation, SourceFormat};

/// Load and decode the image at `path`.
///
/// The decoder is chosen by extension (case-insensitive). Unsupported
/// extensions, unreadable files and decode failures all come back as a
/// [`LoadError`] carrying the path; callers skip the file and move on.
pub fn load(path: &Path) -> Result<DecodedImage, LoadError> {
    let format = SourceFormat::from_path(path).ok_or_else(|| {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        LoadError::new(path, DecodeError::UnsupportedExtension(ext))
    })?;

    let decoded = match format {
        SourceFormat::Jpeg => std::fs::read(path)
            .map_err(|e| DecodeError::IoError(e.to_string()))
            .and_then(|bytes| decode_jpeg(&bytes)),
        SourceFormat::Heif => decode_heif_file(path),
    };

    decoded
        .and_then(|img| {
            if img.is_empty() {
                Err(DecodeError::CorruptedFile("image has no pixels".to_string()))
            } else {
                Ok(img)
            }
        })
        .map_err(|source| LoadError::new(path, source))
}

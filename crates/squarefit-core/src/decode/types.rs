//! Core types for image decoding.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for image decoding operations.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The file extension is not one of the supported input formats.
    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(String),

    /// The image file is corrupted or incomplete.
    #[error("Corrupted or incomplete image file: {0}")]
    CorruptedFile(String),

    /// I/O error during file reading.
    #[error("I/O error: {0}")]
    IoError(String),

    /// HEIF/HEIC input without the `heif` feature compiled in.
    #[error("HEIF support is not available in this build")]
    HeifUnavailable,

    /// The HEIF decoder produced no interleaved RGB plane.
    #[error("Decoder produced no RGB data")]
    MissingPixelData,
}

/// A decode failure tied to the file that caused it.
#[derive(Debug, Error)]
#[error("Failed to load '{}': {source}", path.display())]
pub struct LoadError {
    /// The input file.
    pub path: PathBuf,
    /// Why decoding failed.
    #[source]
    pub source: DecodeError,
}

impl LoadError {
    pub fn new(path: impl Into<PathBuf>, source: DecodeError) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// Input container formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    /// `.jpg` / `.jpeg`, decoded directly.
    Jpeg,
    /// `.heif` / `.heic`, decoded through libheif.
    Heif,
}

impl SourceFormat {
    /// Extensions accepted as input, lowercase and without the dot.
    pub const EXTENSIONS: [&'static str; 4] = ["jpg", "jpeg", "heif", "heic"];

    /// Classify an extension (case-insensitive, without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(SourceFormat::Jpeg),
            "heif" | "heic" => Some(SourceFormat::Heif),
            _ => None,
        }
    }

    /// Classify a path by its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Whether output keeps the source file name.
    ///
    /// HEIF sources are re-encoded as JPEG and get a `.jpg` extension.
    pub fn keeps_extension(self) -> bool {
        matches!(self, SourceFormat::Jpeg)
    }
}

/// EXIF orientation values (1-8).
/// See: https://exiftool.org/TagNames/EXIF.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Orientation {
    /// Normal (no transformation needed).
    #[default]
    Normal = 1,
    /// Horizontal flip.
    FlipHorizontal = 2,
    /// Rotate 180 degrees.
    Rotate180 = 3,
    /// Vertical flip.
    FlipVertical = 4,
    /// Transpose (flip horizontal + rotate 270 CW).
    Transpose = 5,
    /// Rotate 90 degrees clockwise.
    Rotate90CW = 6,
    /// Transverse (flip horizontal + rotate 90 CW).
    Transverse = 7,
    /// Rotate 270 degrees clockwise (90 CCW).
    Rotate270CW = 8,
}

impl From<u32> for Orientation {
    fn from(value: u32) -> Self {
        match value {
            1 => Orientation::Normal,
            2 => Orientation::FlipHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::FlipVertical,
            5 => Orientation::Transpose,
            6 => Orientation::Rotate90CW,
            7 => Orientation::Transverse,
            8 => Orientation::Rotate270CW,
            _ => Orientation::Normal,
        }
    }
}

/// A decoded image with RGB pixel data.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// RGB pixel data in row-major order (3 bytes per pixel).
    /// Length should be width * height * 3.
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Create a new DecodedImage with the given dimensions and pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            width as usize * height as usize * 3,
            "Pixel buffer size mismatch"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Create an image filled with a single colour.
    pub fn filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * 3);
        for _ in 0..count {
            pixels.extend_from_slice(&color);
        }
        Self::new(width, height, pixels)
    }

    /// Create a DecodedImage from an image::RgbImage.
    pub fn from_rgb_image(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        let pixels = img.into_raw();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Get the RGB value at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        [self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2]]
    }

    /// Check if this is an empty/invalid image.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_format_from_extension() {
        assert_eq!(SourceFormat::from_extension("jpg"), Some(SourceFormat::Jpeg));
        assert_eq!(SourceFormat::from_extension("JPEG"), Some(SourceFormat::Jpeg));
        assert_eq!(SourceFormat::from_extension("HeIc"), Some(SourceFormat::Heif));
        assert_eq!(SourceFormat::from_extension("heif"), Some(SourceFormat::Heif));
        assert_eq!(SourceFormat::from_extension("png"), None);
        assert_eq!(SourceFormat::from_extension("gif"), None);

        for ext in SourceFormat::EXTENSIONS {
            assert!(SourceFormat::from_extension(ext).is_some(), "{}", ext);
        }
    }

    #[test]
    fn test_source_format_from_path() {
        assert_eq!(
            SourceFormat::from_path(Path::new("/photos/IMG_0001.JPG")),
            Some(SourceFormat::Jpeg)
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("IMG_0002.heic")),
            Some(SourceFormat::Heif)
        );
        assert_eq!(SourceFormat::from_path(Path::new("README")), None);
        assert_eq!(SourceFormat::from_path(Path::new("jpg")), None);
    }

    #[test]
    fn test_keeps_extension() {
        assert!(SourceFormat::Jpeg.keeps_extension());
        assert!(!SourceFormat::Heif.keeps_extension());
    }

    #[test]
    fn test_orientation_from_u32() {
        assert_eq!(Orientation::from(1), Orientation::Normal);
        assert_eq!(Orientation::from(6), Orientation::Rotate90CW);
        assert_eq!(Orientation::from(99), Orientation::Normal); // Invalid defaults to Normal
    }

    #[test]
    fn test_decoded_image_filled() {
        let img = DecodedImage::filled(4, 2, [10, 20, 30]);

        assert_eq!(img.width, 4);
        assert_eq!(img.height, 2);
        assert_eq!(img.pixels.len(), 24);
        assert_eq!(img.pixel(3, 1), [10, 20, 30]);
        assert!(!img.is_empty());
    }

    #[test]
    fn test_decoded_image_empty() {
        let img = DecodedImage::new(0, 0, vec![]);
        assert!(img.is_empty());
    }

    #[test]
    fn test_load_error_display() {
        let err = LoadError::new("a/b.jpg", DecodeError::CorruptedFile("bad huffman".into()));
        assert_eq!(
            err.to_string(),
            "Failed to load 'a/b.jpg': Corrupted or incomplete image file: bad huffman"
        );

        let err = DecodeError::HeifUnavailable;
        assert_eq!(err.to_string(), "HEIF support is not available in this build");
    }
}

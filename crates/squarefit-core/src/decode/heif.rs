//! HEIF/HEIC decoding through libheif.
//!
//! Only compiled with the `heif` feature; without it every HEIF input fails
//! with [`DecodeError::HeifUnavailable`] and the batch skips the file.

use std::path::Path;

use super::{DecodeError, DecodedImage};

/// Decode the primary image of a HEIF file into interleaved RGB.
///
/// An embedded ICC profile is applied through [`crate::color::normalize_to_srgb`].
#[cfg(feature = "heif")]
pub fn decode_heif_file(path: &Path) -> Result<DecodedImage, DecodeError> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let path_str = path
        .to_str()
        .ok_or_else(|| DecodeError::IoError(format!("non UTF-8 path: {}", path.display())))?;

    let lib_heif = LibHeif::new();
    let ctx = HeifContext::read_from_file(path_str)
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;
    let icc_profile = handle.color_profile_raw().map(|profile| profile.data);

    let image = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;
    let planes = image.planes();
    let plane = planes.interleaved.ok_or(DecodeError::MissingPixelData)?;

    let pixels = pack_rows(plane.data, plane.width, plane.height, plane.stride)?;
    let decoded = DecodedImage::new(plane.width, plane.height, pixels);

    let (normalized, strategy) =
        crate::color::normalize_to_srgb(decoded, icc_profile.as_deref());
    log::debug!("{}: colour normalised with {:?}", path.display(), strategy);
    Ok(normalized)
}

#[cfg(not(feature = "heif"))]
pub fn decode_heif_file(_path: &Path) -> Result<DecodedImage, DecodeError> {
    Err(DecodeError::HeifUnavailable)
}

/// Copy `height` rows of `width * 3` bytes out of a strided plane.
#[cfg_attr(not(feature = "heif"), allow(dead_code))]
fn pack_rows(data: &[u8], width: u32, height: u32, stride: usize) -> Result<Vec<u8>, DecodeError> {
    let row_bytes = width as usize * 3;
    if stride < row_bytes || data.len() < stride * (height as usize).saturating_sub(1) + row_bytes {
        return Err(DecodeError::MissingPixelData);
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in data.chunks(stride).take(height as usize) {
        pixels.extend_from_slice(&row[..row_bytes]);
    }
    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_rows_drops_stride_padding() {
        // 2x2 image, stride 8 (6 bytes of pixels + 2 padding per row)
        let data = [1, 2, 3, 4, 5, 6, 0, 0, 7, 8, 9, 10, 11, 12, 0, 0];
        let pixels = pack_rows(&data, 2, 2, 8).unwrap();
        assert_eq!(pixels, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn test_pack_rows_last_row_may_be_unpadded() {
        let data = [1, 2, 3, 0, 4, 5, 6];
        let pixels = pack_rows(&data, 1, 2, 4).unwrap();
        assert_eq!(pixels, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_pack_rows_rejects_short_plane() {
        assert!(matches!(
            pack_rows(&[0u8; 5], 2, 1, 6),
            Err(DecodeError::MissingPixelData)
        ));
        assert!(matches!(
            pack_rows(&[0u8; 12], 2, 2, 4),
            Err(DecodeError::MissingPixelData)
        ));
    }

    #[cfg(not(feature = "heif"))]
    #[test]
    fn test_heif_unavailable_without_feature() {
        assert!(matches!(
            decode_heif_file(Path::new("photo.heic")),
            Err(DecodeError::HeifUnavailable)
        ));
    }
}

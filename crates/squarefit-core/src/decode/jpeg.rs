//! JPEG decoding with EXIF orientation handling.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageFormat, ImageReader};

use super::{DecodeError, DecodedImage, Orientation};

/// Decode a JPEG image from bytes, applying EXIF orientation correction.
///
/// Phones store portrait shots as landscape pixels plus an orientation tag,
/// so the tag is applied before the image is padded.
///
/// # Errors
///
/// Returns `DecodeError::CorruptedFile` if the bytes are not a decodable JPEG.
pub fn decode_jpeg(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    let orientation = extract_orientation(bytes);

    let img = ImageReader::with_format(Cursor::new(bytes), ImageFormat::Jpeg)
        .decode()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    let rgb_img = apply_orientation(img, orientation).into_rgb8();
    Ok(DecodedImage::from_rgb_image(rgb_img))
}

/// Read the EXIF orientation tag.
///
/// Returns `Orientation::Normal` if no EXIF data is found or the tag is absent.
fn extract_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);
    let Ok(exif) = Reader::new().read_from_container(&mut cursor) else {
        return Orientation::Normal;
    };

    exif.get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .map(Orientation::from)
        .unwrap_or_default()
}

fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => img,
        Orientation::FlipHorizontal => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipVertical => img.flipv(),
        Orientation::Transpose => img.rotate90().fliph(),
        Orientation::Rotate90CW => img.rotate90(),
        Orientation::Transverse => img.rotate270().fliph(),
        Orientation::Rotate270CW => img.rotate270(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode_jpeg;

    fn wide_strip() -> DynamicImage {
        // 2x1: red on the left, green on the right
        let pixels = vec![255, 0, 0, 0, 255, 0];
        DynamicImage::ImageRgb8(image::RgbImage::from_raw(2, 1, pixels).unwrap())
    }

    #[test]
    fn test_decode_encoded_jpeg() {
        let jpeg = encode_jpeg(&vec![200u8; 30 * 20 * 3], 30, 20, 90).unwrap();

        let img = decode_jpeg(&jpeg).unwrap();
        assert_eq!((img.width, img.height), (30, 20));
        assert_eq!(img.pixels.len(), 30 * 20 * 3);
    }

    #[test]
    fn test_decode_garbage_is_corrupted_file() {
        match decode_jpeg(&[0x00, 0x01, 0x02, 0x03]) {
            Err(DecodeError::CorruptedFile(_)) => {}
            other => panic!("Expected CorruptedFile error, got: {:?}", other),
        }
    }

    #[test]
    fn test_decode_empty_and_truncated() {
        assert!(decode_jpeg(&[]).is_err());

        let jpeg = encode_jpeg(&vec![90u8; 16 * 16 * 3], 16, 16, 90).unwrap();
        assert!(decode_jpeg(&jpeg[..20]).is_err());
    }

    #[test]
    fn test_no_exif_means_normal_orientation() {
        let jpeg = encode_jpeg(&[1, 2, 3], 1, 1, 90).unwrap();
        assert_eq!(extract_orientation(&jpeg), Orientation::Normal);
        assert_eq!(extract_orientation(&[0x00, 0x01]), Orientation::Normal);
    }

    #[test]
    fn test_apply_orientation_rotate90_swaps_dimensions() {
        let rotated = apply_orientation(wide_strip(), Orientation::Rotate90CW).into_rgb8();
        assert_eq!(rotated.dimensions(), (1, 2));
    }

    #[test]
    fn test_apply_orientation_flips() {
        let flipped = apply_orientation(wide_strip(), Orientation::FlipHorizontal).into_rgb8();
        assert_eq!(flipped.get_pixel(0, 0).0, [0, 255, 0]);
        assert_eq!(flipped.get_pixel(1, 0).0, [255, 0, 0]);

        let turned = apply_orientation(wide_strip(), Orientation::Rotate180).into_rgb8();
        assert_eq!(turned.get_pixel(0, 0).0, [0, 255, 0]);

        let same = apply_orientation(wide_strip(), Orientation::Normal).into_rgb8();
        assert_eq!(same.get_pixel(0, 0).0, [255, 0, 0]);
    }
}

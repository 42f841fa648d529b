//! Square padding with a constant-colour border.
//!
//! The shorter axis is padded up to the longer one, then `margin` pixels are
//! added on every side. When the shortfall is odd the extra pixel goes to the
//! bottom (or right) edge, so the result is always exactly square with side
//! `max(width, height) + 2 * margin`.
//!
//! # Example
//!
//! ```ignore
//! // 1000x600 landscape, margin 100 -> 1200x1200
//! let padded = pad_to_square(&image, &PaddingSpec::default()).unwrap();
//! ```

use image::{imageops, ImageBuffer, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::decode::DecodedImage;

/// Default border around the squared image, in pixels.
pub const DEFAULT_MARGIN: u32 = 100;

/// Largest side a baseline JPEG can hold.
pub const MAX_PADDED_SIDE: u32 = 65_535;

/// Border colour and extra margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaddingSpec {
    /// RGB colour of the border.
    pub color: [u8; 3],
    /// Extra border added on every side after squaring.
    pub margin: u32,
}

impl Default for PaddingSpec {
    fn default() -> Self {
        Self {
            color: [255, 255, 255],
            margin: DEFAULT_MARGIN,
        }
    }
}

impl PaddingSpec {
    pub fn new(color: [u8; 3], margin: u32) -> Self {
        Self { color, margin }
    }
}

/// Border widths per side, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl Padding {
    /// Dimensions of an image of `width x height` after this padding.
    ///
    /// `None` if either side overflows `u32`.
    pub fn padded_size(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        let w = width.checked_add(self.left)?.checked_add(self.right)?;
        let h = height.checked_add(self.top)?.checked_add(self.bottom)?;
        Some((w, h))
    }
}

/// Compute the border that squares a `width x height` image plus `margin`.
///
/// `None` if a border width overflows `u32`.
pub fn compute_padding(width: u32, height: u32, margin: u32) -> Option<Padding> {
    if width == height {
        return Some(Padding {
            top: margin,
            bottom: margin,
            left: margin,
            right: margin,
        });
    }

    let side = width.max(height);
    let (top, bottom) = split(side - height, margin)?;
    let (left, right) = split(side - width, margin)?;
    Some(Padding {
        top,
        bottom,
        left,
        right,
    })
}

/// Split `gap` across two edges (low edge gets the floor) and add `margin`.
fn split(gap: u32, margin: u32) -> Option<(u32, u32)> {
    let low = gap / 2;
    Some((low.checked_add(margin)?, (gap - low).checked_add(margin)?))
}

/// Side length of the square `pad_to_square` would produce.
///
/// `None` on overflow or when the side exceeds [`MAX_PADDED_SIDE`].
pub fn padded_side(width: u32, height: u32, margin: u32) -> Option<u32> {
    let (side, _) = compute_padding(width, height, margin)?.padded_size(width, height)?;
    (side <= MAX_PADDED_SIDE).then_some(side)
}

/// Pad `image` to a square canvas filled with `spec.color`.
///
/// Returns `None` without allocating when the square would be larger than
/// [`MAX_PADDED_SIDE`] on a side.
pub fn pad_to_square(image: &DecodedImage, spec: &PaddingSpec) -> Option<DecodedImage> {
    let side = padded_side(image.width, image.height, spec.margin)?;
    let padding = compute_padding(image.width, image.height, spec.margin)?;

    let mut canvas = RgbImage::from_pixel(side, side, Rgb(spec.color));
    if !image.is_empty() {
        let source: ImageBuffer<Rgb<u8>, &[u8]> =
            ImageBuffer::from_raw(image.width, image.height, image.pixels.as_slice())?;
        imageops::overlay(
            &mut canvas,
            &source,
            i64::from(padding.left),
            i64::from(padding.top),
        );
    }

    Some(DecodedImage::from_rgb_image(canvas))
}


// ============================================================================
// Property-Based Tests
// ============================================================================

//! Colour profile normalisation.
//!
//! Decoders hand back RGB in whatever space the source was authored in.
//! [`normalize_to_srgb`] walks an ordered list of conversion strategies and
//! keeps the first one that succeeds:
//!
//! 1. [`ColorConversion::IccToSrgb`] - transform through the embedded ICC
//!    profile with Little CMS 2 (`cms` feature).
//! 2. [`ColorConversion::Passthrough`] - keep the decoder's generic RGB
//!    conversion. Lossy for wide-gamut sources, but always succeeds.

use thiserror::Error;

use crate::decode::DecodedImage;

/// Why a conversion strategy was skipped.
#[derive(Debug, Error)]
pub enum ColorError {
    /// The source carries no ICC profile.
    #[error("no embedded ICC profile")]
    NoProfile,

    /// Colour management was not compiled in.
    #[error("colour management is not available in this build")]
    Unavailable,

    /// The profile could not be parsed or the transform failed.
    #[error("ICC transform failed: {0}")]
    Transform(String),
}

/// A single colour conversion strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorConversion {
    /// Embedded ICC profile to sRGB.
    IccToSrgb,
    /// Leave the decoder's RGB untouched.
    Passthrough,
}

/// Strategies in the order they are tried.
pub const STRATEGIES: [ColorConversion; 2] =
    [ColorConversion::IccToSrgb, ColorConversion::Passthrough];

impl ColorConversion {
    /// Run this strategy. On failure the image is handed back unchanged.
    pub fn convert(
        self,
        image: DecodedImage,
        icc_profile: Option<&[u8]>,
    ) -> Result<DecodedImage, (DecodedImage, ColorError)> {
        match self {
            ColorConversion::Passthrough => Ok(image),
            ColorConversion::IccToSrgb => {
                let Some(profile) = icc_profile else {
                    return Err((image, ColorError::NoProfile));
                };
                match icc_to_srgb(&image.pixels, profile) {
                    Ok(pixels) => Ok(DecodedImage::new(image.width, image.height, pixels)),
                    Err(e) => Err((image, e)),
                }
            }
        }
    }
}

/// Convert `image` to sRGB using the first strategy that succeeds.
///
/// Returns the converted image and the strategy that produced it.
pub fn normalize_to_srgb(
    image: DecodedImage,
    icc_profile: Option<&[u8]>,
) -> (DecodedImage, ColorConversion) {
    let mut image = image;
    for strategy in STRATEGIES {
        match strategy.convert(image, icc_profile) {
            Ok(converted) => return (converted, strategy),
            Err((unchanged, reason)) => {
                log::debug!("colour strategy {:?} skipped: {}", strategy, reason);
                image = unchanged;
            }
        }
    }
    // Passthrough is last and infallible.
    (image, ColorConversion::Passthrough)
}

#[cfg(feature = "cms")]
fn icc_to_srgb(rgb: &[u8], icc_profile: &[u8]) -> Result<Vec<u8>, ColorError> {
    use lcms2::{Intent, PixelFormat, Profile, Transform};

    let input = Profile::new_icc(icc_profile).map_err(|e| ColorError::Transform(e.to_string()))?;
    let srgb = Profile::new_srgb();

    let transform: Transform<[u8; 3], [u8; 3]> = Transform::new(
        &input,
        PixelFormat::RGB_8,
        &srgb,
        PixelFormat::RGB_8,
        Intent::Perceptual,
    )
    .map_err(|e| ColorError::Transform(e.to_string()))?;

    let source: Vec<[u8; 3]> = rgb.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
    let mut output = vec![[0u8; 3]; source.len()];
    transform.transform_pixels(&source, &mut output);

    Ok(output.into_iter().flatten().collect())
}

#[cfg(not(feature = "cms"))]
fn icc_to_srgb(_rgb: &[u8], _icc_profile: &[u8]) -> Result<Vec<u8>, ColorError> {
    Err(ColorError::Unavailable)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DecodedImage {
        DecodedImage::new(2, 1, vec![10, 20, 30, 200, 150, 100])
    }

    #[test]
    fn test_no_profile_falls_through_to_passthrough() {
        let (img, used) = normalize_to_srgb(sample(), None);
        assert_eq!(used, ColorConversion::Passthrough);
        assert_eq!(img.pixels, vec![10, 20, 30, 200, 150, 100]);
    }

    #[test]
    fn test_unusable_profile_falls_through_to_passthrough() {
        // Not an ICC profile: either the CMS rejects it or none is compiled in.
        let bogus = b"definitely not an icc profile";
        let (img, used) = normalize_to_srgb(sample(), Some(bogus));
        assert_eq!(used, ColorConversion::Passthrough);
        assert_eq!((img.width, img.height), (2, 1));
        assert_eq!(img.pixels, vec![10, 20, 30, 200, 150, 100]);
    }

    #[test]
    fn test_icc_strategy_hands_image_back_on_failure() {
        let result = ColorConversion::IccToSrgb.convert(sample(), None);
        match result {
            Err((img, ColorError::NoProfile)) => assert_eq!(img.pixels.len(), 6),
            other => panic!("Expected NoProfile, got {:?}", other.map(|i| i.pixels)),
        }
    }

    #[test]
    fn test_strategy_order() {
        assert_eq!(STRATEGIES[0], ColorConversion::IccToSrgb);
        assert_eq!(STRATEGIES[STRATEGIES.len() - 1], ColorConversion::Passthrough);
    }

    #[cfg(feature = "cms")]
    #[test]
    fn test_srgb_profile_roundtrip_is_near_identity() {
        let srgb = lcms2::Profile::new_srgb().icc().unwrap();
        let (img, used) = normalize_to_srgb(sample(), Some(&srgb));

        assert_eq!(used, ColorConversion::IccToSrgb);
        for (a, b) in img.pixels.iter().zip(sample().pixels.iter()) {
            assert!((*a as i16 - *b as i16).abs() <= 2, "{} vs {}", a, b);
        }
    }
}

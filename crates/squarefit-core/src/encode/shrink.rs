//! Square-and-shrink: pad, then search for a JPEG quality that fits a size budget.
//!
//! The search is a plain downward walk rather than a bisection. JPEG size is
//! only roughly monotonic in quality, and most photos fit within one to three
//! steps of the starting quality.
//!
//! Output is written through a temporary file in the destination directory and
//! renamed into place, so an interrupted run never leaves a half-written or
//! oversized file under the final name.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::{encode_jpeg, EncodeError};
use crate::decode::DecodedImage;
use crate::transform::{pad_to_square, PaddingSpec, MAX_PADDED_SIDE};

/// Binary megabyte.
pub const BYTES_PER_MEGABYTE: u64 = 1_048_576;

/// Default size budget in megabytes.
pub const DEFAULT_MAX_MEGABYTES: f64 = 9.0;

/// First quality tried.
pub const DEFAULT_QUALITY_START: u8 = 95;

/// Lowest quality the search will go to.
pub const DEFAULT_QUALITY_MIN: u8 = 10;

/// Quality decrement between attempts.
pub const QUALITY_STEP: u8 = 3;

/// Convert a megabyte budget to bytes (floored).
///
/// Returns `None` for non-finite, zero or negative budgets.
pub fn megabytes_to_bytes(megabytes: f64) -> Option<u64> {
    if !megabytes.is_finite() || megabytes <= 0.0 {
        return None;
    }
    let bytes = (megabytes * BYTES_PER_MEGABYTE as f64).floor();
    (bytes >= 1.0).then_some(bytes as u64)
}

/// Parameters of the quality search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShrinkOptions {
    /// Largest acceptable output, in bytes.
    pub max_bytes: u64,
    /// First quality tried (1-100).
    pub quality_start: u8,
    /// Lowest quality tried (1-`quality_start`).
    pub quality_min: u8,
    /// Decrement between attempts.
    pub quality_step: u8,
}

impl Default for ShrinkOptions {
    fn default() -> Self {
        Self {
            max_bytes: (DEFAULT_MAX_MEGABYTES * BYTES_PER_MEGABYTE as f64) as u64,
            quality_start: DEFAULT_QUALITY_START,
            quality_min: DEFAULT_QUALITY_MIN,
            quality_step: QUALITY_STEP,
        }
    }
}

impl ShrinkOptions {
    /// Replace the budget with `megabytes` binary megabytes.
    pub fn with_max_megabytes(self, megabytes: f64) -> Result<Self, EncodeError> {
        let max_bytes = megabytes_to_bytes(megabytes).ok_or_else(|| {
            EncodeError::InvalidOptions(format!("size budget must be positive, got {megabytes}"))
        })?;
        Ok(Self { max_bytes, ..self })
    }

    /// Check the parameters describe a non-empty, bounded search.
    pub fn validate(&self) -> Result<(), EncodeError> {
        if self.max_bytes == 0 {
            return Err(EncodeError::InvalidOptions(
                "size budget must be positive".to_string(),
            ));
        }
        if !(1..=100).contains(&self.quality_start) {
            return Err(EncodeError::InvalidOptions(format!(
                "start quality {} is outside 1-100",
                self.quality_start
            )));
        }
        if self.quality_min == 0 || self.quality_min > self.quality_start {
            return Err(EncodeError::InvalidOptions(format!(
                "minimum quality {} must be between 1 and the start quality {}",
                self.quality_min, self.quality_start
            )));
        }
        if self.quality_step == 0 {
            return Err(EncodeError::InvalidOptions(
                "quality step must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Most encode attempts a search with these options can make.
    pub fn max_attempts(&self) -> u32 {
        let span = u32::from(self.quality_start.saturating_sub(self.quality_min));
        span.div_ceil(u32::from(self.quality_step.max(1))) + 1
    }
}

/// Outcome of [`search_quality`].
#[derive(Debug, Clone)]
pub struct QualitySearch {
    /// Encoded bytes at the final quality.
    pub bytes: Vec<u8>,
    /// Quality of `bytes`.
    pub quality: u8,
    /// Number of encodes performed.
    pub attempts: u32,
    /// False when even the lowest quality tried exceeded the budget.
    pub within_budget: bool,
}

/// Walk quality down from `quality_start` until `encode` fits the budget.
///
/// `encode` is called with strictly decreasing qualities. A step that would
/// land below `quality_min` is clamped to it, so the floor is always tried
/// before the search gives up with `within_budget == false`.
pub fn search_quality<F>(options: &ShrinkOptions, mut encode: F) -> Result<QualitySearch, EncodeError>
where
    F: FnMut(u8) -> Result<Vec<u8>, EncodeError>,
{
    options.validate()?;

    let mut quality = options.quality_start;
    let mut attempts = 0;
    loop {
        let bytes = encode(quality)?;
        attempts += 1;
        log::debug!("quality {}: {} bytes", quality, bytes.len());

        let within_budget = bytes.len() as u64 <= options.max_bytes;
        let next = (quality > options.quality_min).then(|| {
            quality
                .saturating_sub(options.quality_step)
                .max(options.quality_min)
        });

        match next {
            Some(q) if !within_budget => quality = q,
            _ => {
                return Ok(QualitySearch {
                    bytes,
                    quality,
                    attempts,
                    within_budget,
                })
            }
        }
    }
}

/// What was written for one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeResult {
    /// Output file.
    pub path: PathBuf,
    /// Quality of the written JPEG.
    pub quality: u8,
    /// Size of the written file.
    pub size_bytes: u64,
    /// Encodes performed by the search.
    pub attempts: u32,
    /// False when the budget could not be met at the minimum quality.
    pub within_budget: bool,
    /// Width of the padded image.
    pub width: u32,
    /// Height of the padded image.
    pub height: u32,
}

/// Pad `image` square, find a quality within budget and write it to `output_path`.
///
/// A budget miss at the minimum quality is not an error: the smallest output
/// is still written and a warning is logged.
pub fn square_and_shrink(
    image: &DecodedImage,
    output_path: &Path,
    padding: &PaddingSpec,
    options: &ShrinkOptions,
) -> Result<EncodeResult, EncodeError> {
    options.validate()?;

    let squared = pad_to_square(image, padding).ok_or_else(|| {
        let side = image
            .width
            .max(image.height)
            .saturating_add(padding.margin.saturating_mul(2));
        log::debug!(
            "{}x{} with margin {} exceeds the {} pixel side limit",
            image.width,
            image.height,
            padding.margin,
            MAX_PADDED_SIDE
        );
        EncodeError::InvalidDimensions {
            width: side,
            height: side,
        }
    })?;
    let search = search_quality(options, |quality| {
        encode_jpeg(&squared.pixels, squared.width, squared.height, quality)
    })?;

    if !search.within_budget {
        log::warn!(
            "{}: {} bytes at minimum quality {} still exceeds the {} byte budget",
            output_path.display(),
            search.bytes.len(),
            search.quality,
            options.max_bytes
        );
    }

    write_atomic(output_path, &search.bytes)?;

    Ok(EncodeResult {
        path: output_path.to_path_buf(),
        quality: search.quality,
        size_bytes: search.bytes.len() as u64,
        attempts: search.attempts,
        within_budget: search.within_budget,
        width: squared.width,
        height: squared.height,
    })
}

/// Write `bytes` to a temp file next to `path`, then rename it over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), EncodeError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let write_err = |source: std::io::Error| EncodeError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: Qualities never increase and the attempt count is bounded.
        #[test]
        fn prop_search_monotonic_and_bounded(
            quality_start in 1u8..=100,
            min_offset in 0u8..=99,
            sizes in prop::collection::vec(1usize..=2000, 100),
            max_bytes in 1u64..=2000,
        ) {
            let quality_min = quality_start.saturating_sub(min_offset).max(1);
            let opts = ShrinkOptions {
                max_bytes,
                quality_start,
                quality_min,
                quality_step: QUALITY_STEP,
            };

            let mut calls = Vec::new();
            let search = search_quality(&opts, |q| {
                calls.push(q);
                Ok(vec![0u8; sizes[q as usize - 1]])
            }).unwrap();

            prop_assert!(calls.windows(2).all(|w| w[1] < w[0]));
            prop_assert!(calls.iter().all(|q| *q >= quality_min && *q <= quality_start));

            let span = u32::from(quality_start - quality_min);
            let bound = span.div_ceil(3) + 1;
            prop_assert!(search.attempts <= bound);
            prop_assert!(search.attempts <= opts.max_attempts());
            prop_assert_eq!(search.attempts as usize, calls.len());

            // Either it fits, or it gave up at the floor.
            if search.within_budget {
                prop_assert!(search.bytes.len() as u64 <= max_bytes);
            } else {
                prop_assert_eq!(search.quality, quality_min);
                prop_assert_eq!(search.attempts, opts.max_attempts());
            }
        }

        /// Property: A first encode within budget is the only encode.
        #[test]
        fn prop_first_fit_stops_immediately(
            quality_start in 10u8..=100,
            size in 1usize..=1000,
        ) {
            let opts = ShrinkOptions {
                max_bytes: size as u64,
                quality_start,
                quality_min: 10,
                quality_step: QUALITY_STEP,
            };
            let search = search_quality(&opts, |_| Ok(vec![0u8; size])).unwrap();
            prop_assert_eq!(search.attempts, 1);
            prop_assert_eq!(search.quality, quality_start);
        }
    }
}

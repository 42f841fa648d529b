//! squarefit core - square padding and size-bounded JPEG export
//!
//! This crate turns photos into square, margin-padded JPEGs that fit under a
//! file size limit, the shape most social feeds want. The pipeline per file is:
//!
//! 1. [`decode::load`] - JPEG or HEIF/HEIC into interleaved RGB
//! 2. [`transform::pad_to_square`] - constant-colour border to a square
//! 3. [`encode::square_and_shrink`] - walk JPEG quality down until it fits
//!
//! [`batch`] runs that pipeline over a directory on a worker pool.

pub mod batch;
pub mod color;
pub mod decode;
pub mod encode;
pub mod transform;

pub use batch::{
    collect_inputs, run_batch, BatchError, BatchOptions, BatchReport, FileError, InputSet,
    PathError, OUTPUT_DIR_NAME,
};
pub use decode::{load, DecodeError, DecodedImage, LoadError, SourceFormat};
pub use encode::{square_and_shrink, EncodeError, EncodeResult, ShrinkOptions};
pub use transform::{pad_to_square, PaddingSpec};

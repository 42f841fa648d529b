//! Geometry operations applied between decode and encode.
//!
//! # Coordinate System
//!
//! - Origin is the top-left corner
//! - Padding is measured in whole pixels per edge

mod pad;

pub use pad::{
    compute_padding, pad_to_square, padded_side, Padding, PaddingSpec, DEFAULT_MARGIN,
    MAX_PADDED_SIDE,
};

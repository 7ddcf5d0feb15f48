//! Text recognition and normalization.
//!
//! The OCR engine itself is a black box behind the [`TextRecognizer`] trait:
//! binary image in, raw text out. This module turns that raw text into either
//! a canonical location id (fuzzy-matched against the corpus) or a duration
//! in milliseconds.

pub mod duration;
pub mod engine;
pub mod location;

pub use duration::parse_duration;
pub use engine::{TesseractRecognizer, TextRecognizer};
pub use location::match_location;

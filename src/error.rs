//! Failure taxonomy for the capture-to-link pipeline.
//!
//! Duplicate and expired links are expected outcomes of normal use (players
//! re-discover known connections all the time), so callers need to tell them
//! apart from genuine failures like an unreadable screenshot.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The capture does not look like the game screen (palette probe missed).
    #[error("screenshot is not a recognizable game screen")]
    InvalidFrame,

    /// No charge-border pixel was found along the scan path from the cursor.
    #[error("failed to find portal frame near cursor ({0}, {1})")]
    PortalFrameNotFound(u32, u32),

    /// OCR text did not match any known location above the score threshold.
    #[error("unrecognized location: {0:?}")]
    UnrecognizedLocation(String),

    /// The timer crop did not yield any usable numeric tokens.
    #[error("could not parse duration from {0:?}")]
    DurationParse(String),

    /// The link's expiration is already in the past. The endpoint fields
    /// avoid the name `source`, which the error derive reserves for causes.
    #[error("link is expired: {from} > {to}")]
    ExpiredLink { from: String, to: String },

    /// An active link already connects the endpoints (either direction).
    #[error("duplicate link: {from} > {to}")]
    DuplicateLink { from: String, to: String },

    /// Import payload failed base64/JSON decoding or schema validation.
    #[error("invalid import data: {0}")]
    InvalidImport(String),
}

impl PipelineError {
    /// True for outcomes that are part of normal use rather than failures.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::ExpiredLink { .. } | Self::DuplicateLink { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_outcomes() {
        let dup = PipelineError::DuplicateLink {
            from: "LYMHURST".into(),
            to: "LYMHURST_PORTAL".into(),
        };
        assert!(dup.is_expected());

        let expired = PipelineError::ExpiredLink {
            from: "A".into(),
            to: "B".into(),
        };
        assert!(expired.is_expected());

        assert!(!PipelineError::InvalidFrame.is_expected());
        assert!(!PipelineError::UnrecognizedLocation("??".into()).is_expected());
    }

    #[test]
    fn test_link_errors_are_plain_leaf_errors() {
        use std::error::Error as _;

        let dup = PipelineError::DuplicateLink {
            from: "LYMHURST".into(),
            to: "FOREST_CROSS".into(),
        };
        assert_eq!(dup.to_string(), "duplicate link: LYMHURST > FOREST_CROSS");
        assert!(dup.source().is_none());

        let expired = PipelineError::ExpiredLink {
            from: "A".into(),
            to: "B".into(),
        };
        assert_eq!(expired.to_string(), "link is expired: A > B");
        assert!(expired.source().is_none());
    }
}

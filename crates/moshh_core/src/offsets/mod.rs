//! Offset estimation between sources and anchoring on one timeline.
//!
//! - [`compute_offset`]: histogram of landmark time differences, mode wins
//! - [`resolve_global_offsets`]: anchoring walk over any pairwise correlator
//! - [`compute_global_offsets`]: the two combined over constellations

mod global;
mod pairwise;

use thiserror::Error;

pub use global::{compute_global_offsets, resolve_global_offsets};
pub use pairwise::{compute_offset, OffsetEstimate};

/// Errors from offset estimation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OffsetError {
    #[error("Sample rate/hop mismatch: base {base_rate} Hz/{base_hop}, source {src_rate} Hz/{src_hop}")]
    SampleRateMismatch {
        base_rate: u32,
        base_hop: u32,
        src_rate: u32,
        src_hop: u32,
    },

    #[error("No frequency bins in common")]
    NoCommonLandmarks,

    #[error("Best offset has {votes} votes, below the minimum of {min_matches}")]
    BelowThreshold { votes: usize, min_matches: usize },

    #[error("Expected {expected} durations, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

impl OffsetError {
    /// Whether the global walk must stop instead of trying another base.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            OffsetError::SampleRateMismatch { .. } | OffsetError::LengthMismatch { .. }
        )
    }
}

/// Result type for offset operations.
pub type OffsetResult<T> = Result<T, OffsetError>;

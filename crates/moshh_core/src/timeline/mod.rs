//! Weighted random timeline compilation.
//!
//! The walk ([`build_plan`]) is independent of any engine: it asks a render
//! callback for each subclip and advances by the duration the callback
//! reports. [`TimelineCompiler`] supplies a callback that re-encodes through
//! the media engine and then concatenates the result.

mod compiler;
mod walk;

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::{CommandFailed, EngineError};
use crate::models::GlobalOffset;
use crate::storage::StorageError;

pub use compiler::{CompiledVideo, TimelineCompiler};
pub use walk::{build_plan, pick_weighted};

/// Errors from timeline compilation.
#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("Invalid timeline input: {0}")]
    Precondition(String),

    #[error("No source is placed on the timeline")]
    NoResolvedSources,

    #[error("No source covers timeline position {at_secs:.3}s")]
    CoverageGap { at_secs: f64 },

    #[error("Subclip from source {source_index} at {at_secs:.3}s rendered empty")]
    EmptySubclip { source_index: usize, at_secs: f64 },

    /// A window ended with more left unrendered than the bounds' slack.
    #[error("Rendered subclips left {gap_secs:.3}s uncovered at {at_secs:.3}s")]
    RenderShortfall { at_secs: f64, gap_secs: f64 },

    #[error(transparent)]
    Engine(#[from] CommandFailed),

    #[error("Failed to probe subclip: {0}")]
    Probe(#[from] EngineError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for timeline operations.
pub type TimelineResult<T> = Result<T, TimelineError>;

/// One source as seen by the walk.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSource {
    pub path: PathBuf,
    /// Relative selection weight, > 0.
    pub weight: f64,
    /// Window on the shared timeline; unresolved sources are never picked.
    pub window: Option<GlobalOffset>,
}

/// Subclip duration bounds in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubclipBounds {
    pub min_secs: f64,
    pub max_secs: f64,
    /// Largest unrendered window tail the walk may skip over.
    pub slack_secs: f64,
}

impl SubclipBounds {
    /// Bounds with a 1 ms slack (container timestamp precision).
    pub fn new(min_secs: f64, max_secs: f64) -> Self {
        Self {
            min_secs,
            max_secs,
            slack_secs: walk::SLIVER_SECS,
        }
    }

    /// Allow the encoder to round a window tail short by up to `secs`.
    pub fn with_slack(mut self, secs: f64) -> Self {
        self.slack_secs = secs.max(walk::SLIVER_SECS);
        self
    }

    /// `0 < min <= max`, both finite.
    pub fn validate(&self) -> TimelineResult<()> {
        if !(self.min_secs.is_finite() && self.max_secs.is_finite()) {
            return Err(TimelineError::Precondition(
                "subclip bounds must be finite".to_string(),
            ));
        }
        if self.min_secs <= 0.0 || self.min_secs > self.max_secs {
            return Err(TimelineError::Precondition(format!(
                "need 0 < min <= max, got min {} max {}",
                self.min_secs, self.max_secs
            )));
        }
        Ok(())
    }
}

/// Every weight must be positive and finite.
pub fn validate_weights(weights: &[f64]) -> TimelineResult<()> {
    match weights.iter().position(|w| !(w.is_finite() && *w > 0.0)) {
        Some(idx) => Err(TimelineError::Precondition(format!(
            "weight {} for source {} must be positive and finite",
            weights[idx],
            idx + 1
        ))),
        None => Ok(()),
    }
}

/// Input checks run before any I/O.
pub fn validate_sources(sources: &[TimelineSource], bounds: SubclipBounds) -> TimelineResult<()> {
    if sources.len() < 2 {
        return Err(TimelineError::Precondition(format!(
            "need at least 2 sources, got {}",
            sources.len()
        )));
    }
    let weights: Vec<f64> = sources.iter().map(|s| s.weight).collect();
    validate_weights(&weights)?;
    bounds.validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_require_positive_ordered_range() {
        assert!(SubclipBounds::new(4.0, 6.0).validate().is_ok());
        assert!(SubclipBounds::new(5.0, 5.0).validate().is_ok());
        assert!(SubclipBounds::new(0.0, 6.0).validate().is_err());
        assert!(SubclipBounds::new(7.0, 6.0).validate().is_err());
        assert!(SubclipBounds::new(1.0, f64::INFINITY).validate().is_err());
    }

    #[test]
    fn weights_must_be_positive_and_finite() {
        assert!(validate_weights(&[1.0, 0.5]).is_ok());
        assert!(validate_weights(&[1.0, 0.0]).is_err());
        assert!(validate_weights(&[-1.0, 2.0]).is_err());
        assert!(validate_weights(&[f64::NAN, 2.0]).is_err());
    }

    #[test]
    fn single_source_is_rejected() {
        let sources = vec![TimelineSource {
            path: PathBuf::from("a.mov"),
            weight: 1.0,
            window: Some(GlobalOffset::new(0.0, 10.0)),
        }];
        let err = validate_sources(&sources, SubclipBounds::new(4.0, 6.0)).unwrap_err();
        assert!(matches!(err, TimelineError::Precondition(_)));
    }
}

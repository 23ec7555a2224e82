//! Compilation plan produced by the timeline walk.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What to cut from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubclipSpec {
    /// Index of the source in the run's source list.
    pub source_index: usize,
    /// Start time local to the source (seconds).
    pub local_start_secs: f64,
    /// Requested duration (seconds).
    pub duration_secs: f64,
}

impl SubclipSpec {
    pub fn local_end_secs(&self) -> f64 {
        self.local_start_secs + self.duration_secs
    }
}

/// A subclip that has been rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedSubclip {
    pub spec: SubclipSpec,
    /// Position of the subclip on the shared timeline.
    pub global_start_secs: f64,
    /// Duration re-probed from the rendered artifact.
    pub measured_secs: f64,
    /// Rendered artifact.
    pub path: PathBuf,
}

/// Ordered list of rendered subclips spanning the whole timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilationPlan {
    pub subclips: Vec<PlannedSubclip>,
    /// Timeline end the walk ran to (max window end).
    pub timeline_end_secs: f64,
}

impl CompilationPlan {
    pub fn len(&self) -> usize {
        self.subclips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subclips.is_empty()
    }

    /// Sum of measured subclip durations.
    pub fn measured_total_secs(&self) -> f64 {
        self.subclips.iter().map(|s| s.measured_secs).sum()
    }

    /// Rendered paths in playback order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.subclips.iter().map(|s| s.path.clone()).collect()
    }
}

//! Core types for the generation pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::artifacts::TempArtifacts;
use crate::config::Settings;
use crate::engine::MediaEngine;
use crate::fingerprint::ConstellationInfo;
use crate::logging::RunLogger;
use crate::models::{CompilationPlan, GlobalOffset, MediaSource, ProgressStage};
use crate::storage::FileStore;

/// Progress callback: (stage, percent within the stage, message).
pub type ProgressCallback = Box<dyn Fn(ProgressStage, u32, &str) + Send + Sync>;

/// Result of executing a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    /// Step had nothing to do (not an error).
    Skipped(String),
}

/// Read-only context passed to pipeline steps.
pub struct Context {
    /// Run identifier (also the temp namespace name).
    pub run_id: String,
    /// Effective settings (request options applied).
    pub settings: Settings,
    /// Probed sources, in request order.
    pub sources: Vec<MediaSource>,
    pub weights: Vec<f64>,
    /// Constellations supplied by the caller; skips fingerprinting.
    pub precomputed: Option<Vec<ConstellationInfo>>,
    /// Seed for the timeline walk.
    pub seed: u64,
    /// Store-relative run namespace.
    pub work_dir: PathBuf,
    /// Absolute path of the final artifact.
    pub output_path: PathBuf,
    pub engine: Arc<dyn MediaEngine>,
    pub store: Arc<dyn FileStore>,
    pub logger: Arc<RunLogger>,
    progress_callback: Option<ProgressCallback>,
}

impl Context {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_id: impl Into<String>,
        settings: Settings,
        sources: Vec<MediaSource>,
        weights: Vec<f64>,
        work_dir: PathBuf,
        output_path: PathBuf,
        engine: Arc<dyn MediaEngine>,
        store: Arc<dyn FileStore>,
        logger: Arc<RunLogger>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            settings,
            sources,
            weights,
            precomputed: None,
            seed: 0,
            work_dir,
            output_path,
            engine,
            store,
            logger,
            progress_callback: None,
        }
    }

    pub fn with_precomputed(mut self, constellations: Option<Vec<ConstellationInfo>>) -> Self {
        self.precomputed = constellations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_progress_callback(mut self, callback: Option<ProgressCallback>) -> Self {
        self.progress_callback = callback;
        self
    }

    /// Report progress to the callback (if set).
    pub fn report_progress(&self, stage: ProgressStage, percent: u32, message: &str) {
        self.logger.progress(percent);
        if let Some(ref callback) = self.progress_callback {
            callback(stage, percent, message);
        }
    }

    /// Report `done` of `total` items inside `stage`.
    ///
    /// Capped at 99; the pipeline reports 100 once the step's output validates.
    pub fn report_items(&self, stage: ProgressStage, done: usize, total: usize) {
        if total == 0 {
            return;
        }
        let percent = (done.min(total) * 100 / total).min(99) as u32;
        self.report_progress(stage, percent, &format!("{}/{}", done, total));
    }

    /// Store-relative path inside the run namespace.
    pub fn work_path(&self, name: &str) -> PathBuf {
        self.work_dir.join(name)
    }

    pub fn durations(&self) -> Vec<f64> {
        self.sources.iter().map(|s| s.duration_secs).collect()
    }
}

/// Compiled silent video and the plan behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledOutput {
    pub plan: CompilationPlan,
    /// Store-relative.
    pub video: PathBuf,
}

/// Results accumulated by the steps of one run.
///
/// Write-once: each step fills its own section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: String,
    pub started_at: Option<String>,
    /// Extracted WAV per source (store-relative).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<Vec<PathBuf>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constellations: Option<Vec<ConstellationInfo>>,
    /// Window per source; `None` entries are unresolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offsets: Option<Vec<Option<GlobalOffset>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiled: Option<CompiledOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faded: Option<Vec<PathBuf>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mixed: Option<PathBuf>,
    /// Final artifact (absolute).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Every temp file written by the run.
    #[serde(default)]
    pub artifacts: TempArtifacts,
}

impl RunState {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }

    /// Number of sources placed on the timeline.
    pub fn resolved_count(&self) -> usize {
        self.offsets
            .as_ref()
            .map(|o| o.iter().flatten().count())
            .unwrap_or(0)
    }
}

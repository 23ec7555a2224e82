//! Error types for the generation pipeline.
//!
//! Errors carry context that chains through layers:
//! Run → Stage → Operation → Engine diagnostic

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::audio::AudioError;
use crate::engine::{CommandFailed, EngineError};
use crate::fingerprint::FingerprintError;
use crate::models::ProgressStage;
use crate::offsets::OffsetError;
use crate::storage::StorageError;
use crate::timeline::TimelineError;

/// Top-level error from a generation run.
#[derive(Error, Debug)]
pub enum MoshhError {
    /// Rejected before any I/O.
    #[error("Invalid generation request: {0}")]
    Precondition(String),

    /// Could not prepare the run (namespace, output folder, log file).
    #[error("Run '{run_id}' setup failed: {message}")]
    Setup { run_id: String, message: String },

    /// A source could not be probed.
    #[error("Run '{run_id}' could not probe '{path}': {source}")]
    SourceProbe {
        run_id: String,
        path: PathBuf,
        #[source]
        source: EngineError,
    },

    /// A stage failed.
    #[error("Run '{run_id}' failed at '{stage}': {source}")]
    StepFailed {
        run_id: String,
        stage: ProgressStage,
        #[source]
        source: StepError,
    },

    #[error("Run '{run_id}' was cancelled")]
    Cancelled { run_id: String },
}

impl MoshhError {
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    pub fn setup(run_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Setup {
            run_id: run_id.into(),
            message: message.into(),
        }
    }

    pub fn step_failed(run_id: impl Into<String>, stage: ProgressStage, source: StepError) -> Self {
        Self::StepFailed {
            run_id: run_id.into(),
            stage,
            source,
        }
    }

    pub fn cancelled(run_id: impl Into<String>) -> Self {
        Self::Cancelled {
            run_id: run_id.into(),
        }
    }

    /// Stage the run failed in, if it got that far.
    pub fn stage(&self) -> Option<ProgressStage> {
        match self {
            Self::StepFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Engine diagnostic text of the failing command, if an engine call failed.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::StepFailed { source, .. } => source.diagnostic(),
            _ => None,
        }
    }
}

/// Error from a pipeline step with operation context.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// The media engine reported a failure.
    #[error("{operation} failed (exit code {exit_code:?})")]
    EngineFailed {
        operation: String,
        exit_code: Option<i32>,
        diagnostic: String,
    },

    #[error("Probe failed: {0}")]
    Probe(#[from] EngineError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Offset estimation failed: {0}")]
    Offset(#[from] OffsetError),

    #[error("Timeline compilation failed: {0}")]
    Timeline(TimelineError),

    #[error("Fingerprinting failed: {0}")]
    Fingerprint(FingerprintError),

    #[error("Audio processing failed: {0}")]
    Audio(AudioError),

    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Other(String),
}

impl StepError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::EngineFailed { diagnostic, .. } => Some(diagnostic),
            _ => None,
        }
    }
}

impl From<CommandFailed> for StepError {
    fn from(failed: CommandFailed) -> Self {
        Self::EngineFailed {
            operation: failed.operation,
            exit_code: failed.exit_code,
            diagnostic: failed.diagnostic,
        }
    }
}

impl From<AudioError> for StepError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::Engine(failed) => failed.into(),
            AudioError::Storage(e) => Self::Storage(e),
            other => Self::Audio(other),
        }
    }
}

impl From<TimelineError> for StepError {
    fn from(err: TimelineError) -> Self {
        match err {
            TimelineError::Engine(failed) => failed.into(),
            TimelineError::Storage(e) => Self::Storage(e),
            TimelineError::Probe(e) => Self::Probe(e),
            other => Self::Timeline(other),
        }
    }
}

impl From<FingerprintError> for StepError {
    fn from(err: FingerprintError) -> Self {
        match err {
            FingerprintError::Audio(audio) => audio.into(),
            FingerprintError::Engine(e) => Self::Probe(e),
            other => Self::Fingerprint(other),
        }
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for generation runs.
pub type MoshhResult<T> = Result<T, MoshhError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_failure() -> CommandFailed {
        CommandFailed {
            operation: "Merge audio".to_string(),
            output: PathBuf::from("/tmp/mixed.wav"),
            exit_code: Some(1),
            diagnostic: "Error initializing filter 'amix'".to_string(),
        }
    }

    #[test]
    fn engine_diagnostic_reaches_the_top() {
        let step: StepError = AudioError::Engine(engine_failure()).into();
        let err = MoshhError::step_failed("run-1", ProgressStage::MergingAudios, step);

        assert_eq!(err.diagnostic(), Some("Error initializing filter 'amix'"));
        assert_eq!(err.stage(), Some(ProgressStage::MergingAudios));
        let msg = err.to_string();
        assert!(msg.contains("run-1"));
        assert!(msg.contains("Merging Audios"));
    }

    #[test]
    fn timeline_engine_errors_become_engine_failures() {
        let step: StepError = TimelineError::Engine(engine_failure()).into();
        assert!(matches!(step, StepError::EngineFailed { .. }));

        let gap: StepError = TimelineError::CoverageGap { at_secs: 3.0 }.into();
        assert!(matches!(gap, StepError::Timeline(_)));
        assert!(gap.diagnostic().is_none());
    }

    #[test]
    fn preconditions_have_no_diagnostic() {
        let err = MoshhError::precondition("need at least 2 sources");
        assert!(err.diagnostic().is_none());
        assert!(err.stage().is_none());
    }
}

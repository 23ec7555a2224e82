//! External media-processing engine.
//!
//! The pipeline never links a media library directly. It builds
//! [`MediaCommand`]s (see [`commands`]) and hands them to a [`MediaEngine`],
//! which reports success plus the tool's diagnostic text. Output is never
//! parsed beyond passing the diagnostics through on failure; metadata comes
//! from the separate [`MediaEngine::probe`] call.

pub mod commands;
mod ffmpeg;
#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use ffmpeg::FfmpegEngine;

use crate::logging::RunLogger;

/// Errors from probing media metadata.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Media file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed with exit code {exit_code}: {message}")]
    ProbeFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    #[error("Failed to parse probe output for '{path}': {message}")]
    Parse { path: PathBuf, message: String },
}

/// Result type for engine metadata operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// A command the engine reported as failed.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{operation} failed (exit code {exit_code:?}): {}", last_line(.diagnostic))]
pub struct CommandFailed {
    pub operation: String,
    /// File the command was writing (may hold partial output).
    pub output: PathBuf,
    pub exit_code: Option<i32>,
    /// Full diagnostic text from the engine.
    pub diagnostic: String,
}

fn last_line(text: &str) -> &str {
    text.lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("no diagnostic output")
}

/// Arguments for one engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaCommand {
    /// Arguments, not including the tool name.
    pub args: Vec<String>,
    /// File the command writes.
    pub output: PathBuf,
}

impl MediaCommand {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            args: Vec::new(),
            output: output.into(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a path argument.
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    /// Finish with the output path as the last argument.
    pub fn with_output_arg(self) -> Self {
        let output = self.output.clone();
        self.path_arg(&output)
    }

    /// Value following `flag`, if present.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

/// Arguments only, quoted where needed. The program is added by
/// [`MediaEngine::command_line`].
impl fmt::Display for MediaCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if arg.contains(' ') || arg.contains(';') || arg.is_empty() {
                write!(f, "\"{}\"", arg)?;
            } else {
                f.write_str(arg)?;
            }
        }
        Ok(())
    }
}

/// Execution statistics for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

/// Outcome of one engine invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineSession {
    pub success: bool,
    /// Captured tool output (stderr for ffmpeg).
    pub diagnostic_output: String,
    pub stats: EngineStats,
}

impl EngineSession {
    pub fn succeeded(stats: EngineStats) -> Self {
        Self {
            success: true,
            diagnostic_output: String::new(),
            stats,
        }
    }

    pub fn failed(diagnostic_output: impl Into<String>, stats: EngineStats) -> Self {
        Self {
            success: false,
            diagnostic_output: diagnostic_output.into(),
            stats,
        }
    }
}

/// Media metadata from a probe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub duration_secs: f64,
    /// Sample rate of the first audio stream.
    pub sample_rate: Option<u32>,
    /// Frame rate of the first video stream.
    pub frame_rate: Option<f64>,
}

/// An external media-processing engine.
///
/// Implementations must be safe to share between threads: probes of
/// independent files may run concurrently.
pub trait MediaEngine: Send + Sync {
    /// Run one command to completion.
    fn execute(&self, command: &MediaCommand) -> EngineSession;

    /// Read container metadata.
    fn probe(&self, path: &Path) -> EngineResult<MediaInfo>;

    /// Shell-style rendering of `command` for logs.
    fn command_line(&self, command: &MediaCommand) -> String {
        command.to_string()
    }
}

/// Run `command`, logging it to the run log and feeding its diagnostics
/// into the logger's tail buffer.
pub fn run_command(
    engine: &dyn MediaEngine,
    logger: &RunLogger,
    operation: &str,
    command: &MediaCommand,
) -> Result<EngineStats, CommandFailed> {
    logger.command(&engine.command_line(command));
    let session = engine.execute(command);
    logger.engine_output(&session.diagnostic_output);

    if session.success {
        tracing::debug!(
            "{} finished in {:.2}s",
            operation,
            session.stats.elapsed.as_secs_f64()
        );
        Ok(session.stats)
    } else {
        logger.error(&format!("{} failed", operation));
        logger.show_tail(operation);
        Err(CommandFailed {
            operation: operation.to_string(),
            output: command.output.clone(),
            exit_code: session.stats.exit_code,
            diagnostic: session.diagnostic_output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_display_quotes_filters() {
        let cmd = MediaCommand::new("/tmp/out.wav")
            .arg("-y")
            .arg("-filter_complex")
            .arg("[0]adelay=delays=0S:all=1[s0];[s0]amix=inputs=1")
            .with_output_arg();

        let shown = cmd.to_string();
        assert!(shown.starts_with("-y -filter_complex \""));
        assert!(shown.ends_with("/tmp/out.wav"));
    }

    struct FailingEngine;

    impl MediaEngine for FailingEngine {
        fn execute(&self, _command: &MediaCommand) -> EngineSession {
            EngineSession::failed(
                "Input #0\nInvalid data found when processing input\n",
                EngineStats {
                    exit_code: Some(1),
                    elapsed: Duration::from_millis(5),
                },
            )
        }

        fn probe(&self, path: &Path) -> EngineResult<MediaInfo> {
            Err(EngineError::NotFound(path.to_path_buf()))
        }
    }

    #[test]
    fn run_command_reports_diagnostic() {
        let logger = RunLogger::detached("test", crate::logging::LogConfig::default());
        let cmd = MediaCommand::new("/tmp/x.wav").arg("-y").with_output_arg();

        let err = run_command(&FailingEngine, &logger, "Extract audio", &cmd).unwrap_err();

        assert_eq!(err.exit_code, Some(1));
        assert_eq!(err.output, PathBuf::from("/tmp/x.wav"));
        assert!(err.diagnostic.contains("Invalid data"));
        assert!(err.to_string().contains("Invalid data found when processing input"));
        assert_eq!(logger.get_tail().len(), 2);
    }

    #[test]
    fn value_of_finds_flag_argument() {
        let cmd = MediaCommand::new("o.mov").arg("-t").arg("00:00:04.500");
        assert_eq!(cmd.value_of("-t"), Some("00:00:04.500"));
        assert_eq!(cmd.value_of("-ss"), None);
    }
}

//! Logging infrastructure.
//!
//! - Per-run loggers with file + callback output
//! - Compact mode with progress filtering
//! - Tail buffer of engine diagnostics
//! - Process-wide `tracing` subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use moshh_core::logging::{LogConfig, RunLogger};
//!
//! let logger = RunLogger::new("run-42", "/path/to/logs", LogConfig::default(), None).unwrap();
//! logger.phase("Extracting Audio");
//! logger.command("ffmpeg -y -i clip.mov clip.wav");
//! logger.success("Run completed");
//! ```

mod run_logger;
mod types;

use std::path::Path;

pub use run_logger::RunLogger;
pub use types::{no_progress, ItemProgress, LogCallback, LogConfig, LogLevel, MessagePrefix};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global tracing subscriber (stderr).
///
/// Respects `RUST_LOG`, falling back to `default_level`. Call once at startup.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

/// Initialize tracing to stderr plus a daily-rolling file in `log_dir`.
///
/// The returned guard must be kept alive for the file writer to flush.
pub fn init_tracing_with_file(default_level: LogLevel, log_dir: &Path) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()));

    let file_appender = tracing_appender::rolling::daily(log_dir, "moshh.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .with(filter)
        .init();

    guard
}

/// Initialize tracing for tests (warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

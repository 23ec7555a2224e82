//! Per-run logger with file and callback output.
//!
//! Each generation run gets its own logger that:
//! - Writes to a dedicated log file named after the run
//! - Forwards lines to an optional callback
//! - Keeps a tail buffer of engine diagnostics for failure reports

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

/// Per-run logger with dual output (file + callback).
pub struct RunLogger {
    run_id: String,
    log_path: Option<PathBuf>,
    file_writer: Mutex<Option<BufWriter<File>>>,
    callback: Mutex<Option<LogCallback>>,
    config: LogConfig,
    tail_buffer: Mutex<VecDeque<String>>,
    last_progress: Mutex<Option<u32>>,
}

impl RunLogger {
    /// Create a logger writing `<log_dir>/<run_id>.log`.
    pub fn new(
        run_id: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> std::io::Result<Self> {
        let run_id = run_id.into();
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", sanitize_filename(&run_id)));
        let file = File::create(&log_path)?;

        Ok(Self {
            run_id,
            log_path: Some(log_path),
            file_writer: Mutex::new(Some(BufWriter::new(file))),
            callback: Mutex::new(callback),
            config,
            tail_buffer: Mutex::new(VecDeque::new()),
            last_progress: Mutex::new(None),
        })
    }

    /// Logger without a file (callback and tracing only).
    pub fn detached(run_id: impl Into<String>, config: LogConfig) -> Self {
        Self {
            run_id: run_id.into(),
            log_path: None,
            file_writer: Mutex::new(None),
            callback: Mutex::new(None),
            config,
            tail_buffer: Mutex::new(VecDeque::new()),
            last_progress: Mutex::new(None),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }
        match level {
            LogLevel::Error => tracing::error!(run = %self.run_id, "{}", message),
            LogLevel::Warn => tracing::warn!(run = %self.run_id, "{}", message),
            LogLevel::Info => tracing::info!(run = %self.run_id, "{}", message),
            LogLevel::Debug => tracing::debug!(run = %self.run_id, "{}", message),
            LogLevel::Trace => tracing::trace!(run = %self.run_id, "{}", message),
        }
        self.output(&self.format_message(message));
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, &MessagePrefix::Warning.format(message));
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &MessagePrefix::Error.format(message));
    }

    /// Log an engine command line.
    pub fn command(&self, command: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Command.format(command));
    }

    /// Log a stage marker.
    pub fn phase(&self, phase_name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Phase.format(phase_name));
    }

    pub fn section(&self, section_name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Section.format(section_name));
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Success.format(message));
    }

    /// Log progress (filtered to `progress_step` intervals in compact mode).
    ///
    /// Returns true if the progress was logged.
    pub fn progress(&self, percent: u32) -> bool {
        {
            let mut last = self.last_progress.lock();
            if self.config.compact {
                let step = self.config.progress_step.max(1);
                let current_step = percent / step;
                let filtered = match *last {
                    Some(prev) => current_step <= prev / step && percent < 100,
                    None => percent % step != 0 && percent < 100,
                };
                if filtered {
                    return false;
                }
            }
            *last = Some(percent);
        }

        self.log(LogLevel::Info, &format!("Progress: {}%", percent));
        true
    }

    /// Reset progress filtering at a stage boundary.
    pub fn reset_progress(&self) {
        *self.last_progress.lock() = None;
    }

    /// Record engine diagnostic text.
    ///
    /// In compact mode lines only go to the tail buffer.
    pub fn engine_output(&self, diagnostic: &str) {
        for line in diagnostic.lines().filter(|l| !l.trim().is_empty()) {
            {
                let mut buffer = self.tail_buffer.lock();
                if buffer.len() >= self.config.error_tail.max(1) {
                    buffer.pop_front();
                }
                buffer.push_back(line.to_string());
            }

            if !self.config.compact {
                self.output(&self.format_message(&format!("[engine] {}", line)));
            }
        }
    }

    /// Dump the tail buffer (typically after a failure).
    pub fn show_tail(&self, header: &str) {
        let lines = self.get_tail();
        if lines.is_empty() {
            return;
        }

        self.output(&self.format_message(&format!("[{}/tail]", header)));
        for line in lines {
            self.output(&self.format_message(&line));
        }
    }

    pub fn get_tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Flush and release the log file.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            format!("[{}] {}", Local::now().format("%H:%M:%S"), message)
        } else {
            message.to_string()
        }
    }

    fn output(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }

        if let Some(ref callback) = *self.callback.lock() {
            callback(formatted);
        }
    }
}

impl Drop for RunLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Replace characters that are unsafe in file names.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn writes_run_log_file() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new("run-1", dir.path(), LogConfig::default(), None).unwrap();

        logger.phase("Extracting Audio");
        logger.command("ffmpeg -y -i a.mov a.wav");
        logger.flush();

        let path = logger.log_path().unwrap().to_path_buf();
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("=== Extracting Audio ==="));
        assert!(content.contains("$ ffmpeg -y -i a.mov a.wav"));
    }

    #[test]
    fn forwards_to_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let callback: LogCallback = Box::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let dir = tempdir().unwrap();
        let logger =
            RunLogger::new("run-2", dir.path(), LogConfig::default(), Some(callback)).unwrap();
        logger.info("one");
        logger.warn("two");
        logger.debug("filtered at info level");

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn compact_mode_filters_progress() {
        let logger = RunLogger::detached("run-3", LogConfig::default());

        assert!(logger.progress(0));
        assert!(!logger.progress(10));
        assert!(logger.progress(20));
        assert!(!logger.progress(25));
        assert!(logger.progress(40));
        assert!(logger.progress(100));
    }

    #[test]
    fn tail_keeps_last_engine_lines() {
        let mut config = LogConfig::default();
        config.error_tail = 3;
        let logger = RunLogger::detached("run-4", config);

        logger.engine_output("l1\nl2\n\nl3\nl4\nl5");

        assert_eq!(logger.get_tail(), vec!["l3", "l4", "l5"]);
    }

    #[test]
    fn sanitizes_run_ids() {
        assert_eq!(sanitize_filename("run/1:a"), "run_1_a");
    }
}

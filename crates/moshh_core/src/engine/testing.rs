//! Scripted in-process engine for tests.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;

use super::commands::timestamp_to_secs;
use super::{
    EngineError, EngineResult, EngineSession, EngineStats, MediaCommand, MediaEngine, MediaInfo,
};

/// Records every command and writes placeholder outputs.
///
/// `.pcm` outputs get deterministic noise (identical for every call, so all
/// sources correlate at offset zero); other outputs get a few bytes. Probes
/// return the `-t` duration of the command that wrote the file, a configured
/// source duration, or 10 s.
pub struct ScriptedEngine {
    commands: Mutex<Vec<MediaCommand>>,
    failures: Vec<(String, bool)>,
    pcm: Vec<i16>,
    durations: HashMap<PathBuf, f64>,
    shortfall_secs: f64,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            failures: Vec::new(),
            pcm: noise(8000 * 12),
            durations: HashMap::new(),
            shortfall_secs: 0.0,
        }
    }

    /// Fail any command whose output file name contains `pattern`.
    pub fn fail_on(mut self, pattern: &str, write_partial: bool) -> Self {
        self.failures.push((pattern.to_string(), write_partial));
        self
    }

    pub fn with_pcm(mut self, samples: Vec<i16>) -> Self {
        self.pcm = samples;
        self
    }

    pub fn with_duration(mut self, path: impl Into<PathBuf>, secs: f64) -> Self {
        self.durations.insert(path.into(), secs);
        self
    }

    /// Rendered clips probe this much shorter than requested.
    pub fn with_shortfall(mut self, secs: f64) -> Self {
        self.shortfall_secs = secs;
        self
    }

    pub fn commands(&self) -> Vec<MediaCommand> {
        self.commands.lock().clone()
    }

    fn stats(code: i32) -> EngineStats {
        EngineStats {
            exit_code: Some(code),
            elapsed: Duration::from_millis(1),
        }
    }
}

impl MediaEngine for ScriptedEngine {
    fn execute(&self, command: &MediaCommand) -> EngineSession {
        self.commands.lock().push(command.clone());

        let name = command
            .output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let Some((_, partial)) = self.failures.iter().find(|(p, _)| name.contains(p.as_str())) {
            if *partial {
                let _ = fs::write(&command.output, b"partial");
            }
            return EngineSession::failed(
                format!("{}: Conversion failed!\nscripted failure", name),
                Self::stats(1),
            );
        }

        let contents: Vec<u8> = if name.ends_with(".pcm") {
            self.pcm.iter().flat_map(|s| s.to_le_bytes()).collect()
        } else {
            b"fake".to_vec()
        };

        match fs::write(&command.output, contents) {
            Ok(()) => EngineSession::succeeded(Self::stats(0)),
            Err(e) => EngineSession::failed(e.to_string(), Self::stats(1)),
        }
    }

    fn probe(&self, path: &Path) -> EngineResult<MediaInfo> {
        if let Some(secs) = self.durations.get(path) {
            return Ok(MediaInfo {
                duration_secs: *secs,
                sample_rate: Some(8000),
                frame_rate: None,
            });
        }

        let requested = self
            .commands
            .lock()
            .iter()
            .rev()
            .find(|c| c.output == path)
            .and_then(|c| c.value_of("-t").and_then(timestamp_to_secs));

        match requested {
            Some(secs) => Ok(MediaInfo {
                duration_secs: (secs - self.shortfall_secs).max(0.0),
                sample_rate: None,
                frame_rate: Some(30000.0 / 1001.0),
            }),
            None if path.to_string_lossy().contains("missing") => {
                Err(EngineError::NotFound(path.to_path_buf()))
            }
            None => Ok(MediaInfo {
                duration_secs: 10.0,
                sample_rate: Some(8000),
                frame_rate: None,
            }),
        }
    }
}

/// Deterministic white-ish noise.
fn noise(len: usize) -> Vec<i16> {
    let mut state: u32 = 0x1234_5678;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            ((state >> 16) as i16) / 2
        })
        .collect()
}

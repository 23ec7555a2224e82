//! FFmpeg/FFprobe process engine.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

use serde_json::Value;

use super::{
    EngineError, EngineResult, EngineSession, EngineStats, MediaCommand, MediaEngine, MediaInfo,
};

/// [`MediaEngine`] backed by the `ffmpeg` and `ffprobe` executables.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg_path: PathBuf,
    ffprobe_path: PathBuf,
}

impl FfmpegEngine {
    /// Use `ffmpeg`/`ffprobe` from PATH.
    pub fn new() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
        }
    }

    /// Set a custom path to the ffmpeg executable.
    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    /// Set a custom path to the ffprobe executable.
    pub fn with_ffprobe_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffprobe_path = path.into();
        self
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaEngine for FfmpegEngine {
    fn execute(&self, command: &MediaCommand) -> EngineSession {
        let started = Instant::now();

        tracing::debug!("Running FFmpeg: {}", self.command_line(command));

        let result = Command::new(&self.ffmpeg_path)
            .arg("-hide_banner")
            .arg("-nostdin")
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output();

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                return EngineSession::failed(
                    format!("Failed to spawn {}: {}", self.ffmpeg_path.display(), e),
                    EngineStats {
                        exit_code: None,
                        elapsed: started.elapsed(),
                    },
                );
            }
        };

        let stats = EngineStats {
            exit_code: output.status.code(),
            elapsed: started.elapsed(),
        };

        if output.status.success() {
            EngineSession::succeeded(stats)
        } else {
            EngineSession::failed(String::from_utf8_lossy(&output.stderr).into_owned(), stats)
        }
    }

    fn command_line(&self, command: &MediaCommand) -> String {
        format!("{} {}", self.ffmpeg_path.display(), command)
    }

    fn probe(&self, path: &Path) -> EngineResult<MediaInfo> {
        if !path.exists() {
            return Err(EngineError::NotFound(path.to_path_buf()));
        }

        let output = Command::new(&self.ffprobe_path)
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration:stream=codec_type,sample_rate,r_frame_rate")
            .arg("-of")
            .arg("json")
            .arg(path)
            .output()
            .map_err(|e| EngineError::Spawn {
                tool: "ffprobe".to_string(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(EngineError::ProbeFailed {
                tool: "ffprobe".to_string(),
                exit_code: output.status.code().unwrap_or(-1),
                message: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let json: Value = serde_json::from_slice(&output.stdout).map_err(|e| EngineError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        parse_probe_json(&json, path)
    }
}

/// Parse `ffprobe -of json` output.
fn parse_probe_json(json: &Value, path: &Path) -> EngineResult<MediaInfo> {
    let duration_secs = json
        .get("format")
        .and_then(|f| f.get("duration"))
        .and_then(|d| d.as_str())
        .and_then(|d| d.trim().parse::<f64>().ok())
        .ok_or_else(|| EngineError::Parse {
            path: path.to_path_buf(),
            message: "missing format.duration".to_string(),
        })?;

    let mut info = MediaInfo {
        duration_secs,
        ..Default::default()
    };

    if let Some(streams) = json.get("streams").and_then(|s| s.as_array()) {
        for stream in streams {
            match stream.get("codec_type").and_then(|t| t.as_str()) {
                Some("audio") if info.sample_rate.is_none() => {
                    info.sample_rate = stream
                        .get("sample_rate")
                        .and_then(|r| r.as_str())
                        .and_then(|r| r.parse().ok());
                }
                Some("video") if info.frame_rate.is_none() => {
                    info.frame_rate = stream
                        .get("r_frame_rate")
                        .and_then(|r| r.as_str())
                        .and_then(parse_rational);
                }
                _ => {}
            }
        }
    }

    Ok(info)
}

/// Parse "30000/1001" style rationals.
fn parse_rational(value: &str) -> Option<f64> {
    match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                None
            } else {
                Some(num / den)
            }
        }
        None => value.trim().parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_probe_json() {
        let json: Value = serde_json::from_str(
            r#"{
                "streams": [
                    {"codec_type": "video", "r_frame_rate": "30000/1001"},
                    {"codec_type": "audio", "sample_rate": "48000"}
                ],
                "format": {"duration": "12.480000"}
            }"#,
        )
        .unwrap();

        let info = parse_probe_json(&json, Path::new("clip.mov")).unwrap();
        assert!((info.duration_secs - 12.48).abs() < 1e-9);
        assert_eq!(info.sample_rate, Some(48000));
        assert!((info.frame_rate.unwrap() - 29.97).abs() < 0.01);
    }

    #[test]
    fn missing_duration_is_parse_error() {
        let json: Value = serde_json::from_str(r#"{"format": {}}"#).unwrap();
        let result = parse_probe_json(&json, Path::new("clip.mov"));
        assert!(matches!(result, Err(EngineError::Parse { .. })));
    }

    #[test]
    fn rational_rejects_zero_denominator() {
        assert_eq!(parse_rational("25/1"), Some(25.0));
        assert_eq!(parse_rational("0/0"), None);
        assert_eq!(parse_rational("24"), Some(24.0));
    }

    #[test]
    fn command_line_uses_configured_binary() {
        let engine = FfmpegEngine::new().with_ffmpeg_path("/opt/ff/bin/ffmpeg-6");
        let cmd = MediaCommand::new("out.wav").arg("-y").with_output_arg();

        assert_eq!(engine.command_line(&cmd), "/opt/ff/bin/ffmpeg-6 -y out.wav");
        assert_eq!(FfmpegEngine::new().command_line(&cmd), "ffmpeg -y out.wav");
    }

    #[test]
    fn probe_rejects_missing_file() {
        let result = FfmpegEngine::new().probe(Path::new("/nonexistent/clip.mov"));
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }
}

//! Media-related data structures (sources, decoded audio, timeline windows).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::enums::Preset;

/// One caller-supplied clip, as probed at the start of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSource {
    /// Position in the caller's source list.
    pub index: usize,
    /// Path to the clip.
    pub path: PathBuf,
    /// Container duration in seconds.
    pub duration_secs: f64,
    /// Sample rate of the first audio stream, if any.
    pub sample_rate: Option<u32>,
}

impl MediaSource {
    pub fn new(index: usize, path: impl Into<PathBuf>, duration_secs: f64) -> Self {
        Self {
            index,
            path: path.into(),
            duration_secs,
            sample_rate: None,
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    /// Display name for logs ("Source 1", "Source 2", ...).
    pub fn label(&self) -> String {
        format!("Source {}", self.index + 1)
    }
}

/// Mono 16-bit PCM audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSignal {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl AudioSignal {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Decode little-endian `s16le` bytes. A trailing odd byte is ignored.
    pub fn from_le_bytes(bytes: &[u8], sample_rate: u32) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self::new(samples, sample_rate)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// A source's window on the shared timeline, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalOffset {
    pub start_secs: f64,
    pub end_secs: f64,
}

impl GlobalOffset {
    pub fn new(start_secs: f64, end_secs: f64) -> Self {
        Self {
            start_secs,
            end_secs,
        }
    }

    /// Whether global time `t` falls inside `[start, end)`.
    pub fn contains(&self, t: f64) -> bool {
        self.start_secs <= t && t < self.end_secs
    }

    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    /// Same window moved by `delta` seconds.
    pub fn shifted(&self, delta: f64) -> Self {
        Self::new(self.start_secs + delta, self.end_secs + delta)
    }
}

/// Uniform output encode profile applied to every subclip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeProfile {
    #[serde(default)]
    pub preset: Preset,

    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    #[serde(default = "default_codec")]
    pub codec: String,

    #[serde(default = "default_fps")]
    pub fps: f64,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_true")]
    pub exclude_audio: bool,
}

fn default_pixel_format() -> String {
    "yuv420p".to_string()
}

fn default_codec() -> String {
    "libx264".to_string()
}

fn default_fps() -> f64 {
    30000.0 / 1001.0
}

fn default_width() -> u32 {
    1080
}

fn default_height() -> u32 {
    1920
}

fn default_true() -> bool {
    true
}

impl Default for EncodeProfile {
    fn default() -> Self {
        Self {
            preset: Preset::default(),
            pixel_format: default_pixel_format(),
            codec: default_codec(),
            fps: default_fps(),
            width: default_width(),
            height: default_height(),
            exclude_audio: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_little_endian_pcm() {
        let bytes = [0x01, 0x00, 0xff, 0xff, 0x00, 0x80, 0x07];
        let signal = AudioSignal::from_le_bytes(&bytes, 8000);
        assert_eq!(signal.samples, vec![1, -1, i16::MIN]);
    }

    #[test]
    fn signal_duration_uses_rate() {
        let signal = AudioSignal::new(vec![0; 16000], 8000);
        assert!((signal.duration_secs() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn window_contains_is_half_open() {
        let w = GlobalOffset::new(2.0, 5.0);
        assert!(w.contains(2.0));
        assert!(w.contains(4.999));
        assert!(!w.contains(5.0));
        assert!(!w.contains(1.0));
    }

    #[test]
    fn encode_profile_defaults_fill_missing_fields() {
        let profile: EncodeProfile = serde_json::from_str(r#"{"width": 720}"#).unwrap();
        assert_eq!(profile.width, 720);
        assert_eq!(profile.height, 1920);
        assert_eq!(profile.codec, "libx264");
        assert!(profile.exclude_audio);
    }
}

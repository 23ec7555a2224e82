//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use crate::logging::{LogConfig, LogLevel};
use crate::models::EncodeProfile;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub paths: PathSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    /// External tool locations.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Timeline walk parameters.
    #[serde(default)]
    pub generation: GenerationSettings,

    /// Uniform encode profile for every subclip.
    #[serde(default)]
    pub encode: EncodeProfile,

    #[serde(default)]
    pub audio: AudioSettings,

    /// Landmark extraction parameters.
    #[serde(default)]
    pub fingerprint: FingerprintSettings,

    #[serde(default)]
    pub offsets: OffsetSettings,
}

/// Path configuration for output, temp, and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Folder receiving generated mashups when no output path is given.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Root folder for run namespaces.
    #[serde(default = "default_temp_root")]
    pub temp_root: String,

    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Run namespaces untouched for this long are removed by `configure`.
    #[serde(default = "default_stale_temp_hours")]
    pub stale_temp_hours: u64,
}

fn default_output_folder() -> String {
    "moshh_output".to_string()
}

fn default_temp_root() -> String {
    "moshh-gen-tmp".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

fn default_stale_temp_hours() -> u64 {
    24
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: default_output_folder(),
            temp_root: default_temp_root(),
            logs_folder: default_logs_folder(),
            stale_temp_hours: default_stale_temp_hours(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default)]
    pub level: LogLevel,

    /// Use compact log format.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of engine diagnostic lines kept for failure reports.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Write a per-run log file into the logs folder.
    #[serde(default = "default_true")]
    pub run_log_files: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            run_log_files: true,
        }
    }
}

impl LoggingSettings {
    /// Run logger configuration for these settings.
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            compact: self.compact,
            progress_step: self.progress_step,
            error_tail: self.error_tail as usize,
            show_timestamps: true,
        }
    }
}

/// Locations of the media tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,

    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: String,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg(),
            ffprobe_path: default_ffprobe(),
        }
    }
}

/// Timeline walk parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    #[serde(default = "default_min_subclip")]
    pub min_subclip_secs: f64,

    #[serde(default = "default_max_subclip")]
    pub max_subclip_secs: f64,

    /// Container extension of the final output.
    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// Fixed seed for reproducible edits. Random when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_min_subclip() -> f64 {
    4.0
}

fn default_max_subclip() -> f64 {
    6.0
}

fn default_output_format() -> String {
    "mov".to_string()
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            min_subclip_secs: default_min_subclip(),
            max_subclip_secs: default_max_subclip(),
            output_format: default_output_format(),
            seed: None,
        }
    }
}

/// Audio extraction and mixing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Sample rate every source's audio is resampled to.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Fade-in/out length per track.
    #[serde(default = "default_fade_secs")]
    pub fade_secs: f64,
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_fade_secs() -> f64 {
    1.0
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            fade_secs: default_fade_secs(),
        }
    }
}

/// Spectral landmark extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintSettings {
    /// FFT window length in samples.
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Samples between frame starts.
    #[serde(default = "default_hop_size")]
    pub hop_size: usize,

    /// Frequency bins per band.
    #[serde(default = "default_band_height")]
    pub band_height: usize,

    /// Frames per time tile.
    #[serde(default = "default_tile_width")]
    pub tile_width: usize,

    /// Landmarks kept per (band, tile).
    #[serde(default = "default_peaks_per_tile")]
    pub peaks_per_tile: usize,
}

fn default_window_size() -> usize {
    1024
}

fn default_hop_size() -> usize {
    1024
}

fn default_band_height() -> usize {
    512
}

fn default_tile_width() -> usize {
    43
}

fn default_peaks_per_tile() -> usize {
    7
}

impl Default for FingerprintSettings {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            hop_size: default_hop_size(),
            band_height: default_band_height(),
            tile_width: default_tile_width(),
            peaks_per_tile: default_peaks_per_tile(),
        }
    }
}

/// Pairwise offset estimation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OffsetSettings {
    /// Minimum votes for the histogram mode to be trusted. 0 disables the check.
    #[serde(default)]
    pub min_matches: usize,
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Tools,
    Generation,
    Encode,
    Audio,
    Fingerprint,
    Offsets,
}

impl ConfigSection {
    pub const ALL: [ConfigSection; 8] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Tools,
        ConfigSection::Generation,
        ConfigSection::Encode,
        ConfigSection::Audio,
        ConfigSection::Fingerprint,
        ConfigSection::Offsets,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Tools => "tools",
            ConfigSection::Generation => "generation",
            ConfigSection::Encode => "encode",
            ConfigSection::Audio => "audio",
            ConfigSection::Fingerprint => "fingerprint",
            ConfigSection::Offsets => "offsets",
        }
    }

    /// Comment written above the section in generated files.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Output, temp, and log directories",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Tools => "Media tool executables",
            ConfigSection::Generation => "Subclip duration bounds and output container",
            ConfigSection::Encode => "Encode profile applied to every subclip",
            ConfigSection::Audio => "Audio extraction and fades",
            ConfigSection::Fingerprint => "Spectral landmark extraction",
            ConfigSection::Offsets => "Offset estimation",
        }
    }
}

//! Configuration management.
//!
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//!
//! # Example
//!
//! ```no_run
//! use moshh_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/moshh.toml");
//! config.load_or_create().unwrap();
//!
//! config.settings_mut().generation.max_subclip_secs = 8.0;
//! config.update_section(ConfigSection::Generation).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    AudioSettings, ConfigSection, FingerprintSettings, GenerationSettings, LoggingSettings,
    OffsetSettings, PathSettings, Settings, ToolSettings,
};

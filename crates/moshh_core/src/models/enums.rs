//! Enumerations used by the pipeline and its settings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stage of a generation run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProgressStage {
    ExtractingAudio,
    GeneratingConstellations,
    CalculatingOffsets,
    CompilingVideo,
    FadingAudios,
    MergingAudios,
    OverlayingAudios,
    CleaningUp,
    Finished,
}

impl ProgressStage {
    /// Human-readable stage label (used in logs and step names).
    pub fn label(&self) -> &'static str {
        match self {
            ProgressStage::ExtractingAudio => "Extracting Audio",
            ProgressStage::GeneratingConstellations => "Generating Constellations",
            ProgressStage::CalculatingOffsets => "Calculating Offsets",
            ProgressStage::CompilingVideo => "Compiling Video",
            ProgressStage::FadingAudios => "Fading Audios",
            ProgressStage::MergingAudios => "Merging Audios",
            ProgressStage::OverlayingAudios => "Overlaying Audios",
            ProgressStage::CleaningUp => "Cleaning Up",
            ProgressStage::Finished => "Finished",
        }
    }
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// x264-style encoder speed preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    #[default]
    Medium,
    Slow,
    Slower,
    Veryslow,
    Placebo,
}

impl Preset {
    /// Value passed to `-preset`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Ultrafast => "ultrafast",
            Preset::Superfast => "superfast",
            Preset::Veryfast => "veryfast",
            Preset::Faster => "faster",
            Preset::Fast => "fast",
            Preset::Medium => "medium",
            Preset::Slow => "slow",
            Preset::Slower => "slower",
            Preset::Veryslow => "veryslow",
            Preset::Placebo => "placebo",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_order_matches_pipeline() {
        assert!(ProgressStage::ExtractingAudio < ProgressStage::GeneratingConstellations);
        assert!(ProgressStage::OverlayingAudios < ProgressStage::CleaningUp);
        assert!(ProgressStage::CleaningUp < ProgressStage::Finished);
    }

    #[test]
    fn preset_serializes_lowercase() {
        let json = serde_json::to_string(&Preset::Veryfast).unwrap();
        assert_eq!(json, "\"veryfast\"");
        assert_eq!(Preset::default().as_str(), "medium");
    }
}

//! Spectral landmark fingerprints.
//!
//! A source's audio is reduced to a sparse constellation: for every
//! (frequency band, time tile) cell of the magnitude spectrogram only the
//! strongest few bins survive. Constellations are only compared pairwise to
//! estimate offsets (see [`crate::offsets`]).

mod landmarks;
mod spectrum;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::{self, AudioError};
use crate::config::{FingerprintSettings, Settings};
use crate::engine::MediaEngine;
use crate::logging::{no_progress, RunLogger};
use crate::models::{AudioSignal, MediaSource};
use crate::storage::FileStore;

pub use landmarks::{landmark_count, pick_landmarks, Partition};
pub use spectrum::{Spectrogram, Stft};

/// Frequency bin → ordered time-frame indices.
pub type Constellation = BTreeMap<u32, BTreeSet<u32>>;

fn default_hop_size() -> u32 {
    1024
}

/// A source's constellation plus the parameters needed to convert frames to seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstellationInfo {
    pub sample_rate: u32,
    #[serde(default = "default_hop_size")]
    pub hop_size: u32,
    pub constellation: Constellation,
}

impl ConstellationInfo {
    pub fn landmark_count(&self) -> usize {
        landmark_count(&self.constellation)
    }

    /// Seconds per frame.
    pub fn frame_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.hop_size as f64 / self.sample_rate as f64
    }

    /// Write as JSON.
    pub fn save_json(&self, path: &Path) -> Result<(), FingerprintError> {
        let json = serde_json::to_string(self)?;
        fs::write(path, json).map_err(|e| FingerprintError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn load_json(path: &Path) -> Result<Self, FingerprintError> {
        let content = fs::read_to_string(path).map_err(|e| FingerprintError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Errors from fingerprinting.
#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("Invalid fingerprint settings: {0}")]
    InvalidSettings(String),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Engine(#[from] crate::engine::EngineError),

    #[error("I/O error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid constellation JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn validate(settings: &FingerprintSettings) -> Result<(), FingerprintError> {
    if settings.window_size < 2 {
        return Err(FingerprintError::InvalidSettings(
            "window_size must be at least 2".to_string(),
        ));
    }
    if settings.hop_size == 0 || settings.band_height == 0 || settings.tile_width == 0 {
        return Err(FingerprintError::InvalidSettings(
            "hop_size, band_height and tile_width must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Fingerprint decoded audio.
pub fn fingerprint_signal(
    signal: &AudioSignal,
    settings: &FingerprintSettings,
) -> Result<ConstellationInfo, FingerprintError> {
    validate(settings)?;

    let spectrogram = Stft::new(settings.window_size, settings.hop_size).magnitudes(&signal.samples);
    let constellation = pick_landmarks(
        &spectrogram,
        Partition {
            band_height: settings.band_height,
            tile_width: settings.tile_width,
            peaks_per_tile: settings.peaks_per_tile,
        },
    );

    tracing::debug!(
        "Fingerprinted {} frames into {} landmarks",
        spectrogram.num_frames(),
        landmark_count(&constellation)
    );

    Ok(ConstellationInfo {
        sample_rate: signal.sample_rate,
        hop_size: settings.hop_size as u32,
        constellation,
    })
}

/// Extract, decode, and fingerprint one media file.
///
/// Scratch files go under `scratch_dir` in the store and are removed before
/// returning.
pub fn fingerprint_media(
    engine: &dyn MediaEngine,
    store: &dyn FileStore,
    logger: &RunLogger,
    scratch_dir: &Path,
    source_path: &Path,
    settings: &Settings,
) -> Result<ConstellationInfo, FingerprintError> {
    validate(&settings.fingerprint)?;
    let info = engine.probe(source_path)?;
    let source = MediaSource::new(0, source_path, info.duration_secs);
    let sample_rate = settings.audio.sample_rate;

    store.make_directory(scratch_dir).map_err(AudioError::from)?;
    let wavs = audio::extract_audios(
        engine,
        store,
        logger,
        &[source],
        scratch_dir,
        sample_rate,
        &no_progress,
    )?;

    let mut result = Ok(ConstellationInfo::default());
    for wav in &wavs {
        result = audio::load_audio_signal(
            engine,
            store,
            logger,
            wav,
            &wav.with_extension("pcm"),
            sample_rate,
        )
        .map_err(FingerprintError::from)
        .and_then(|signal| fingerprint_signal(&signal, &settings.fingerprint));

        if let Err(e) = store.delete_file(wav) {
            logger.warn(&format!("Could not delete {}: {}", wav.display(), e));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::ScriptedEngine;
    use crate::logging::LogConfig;
    use crate::storage::LocalFileStore;
    use tempfile::tempdir;

    fn small_settings() -> FingerprintSettings {
        FingerprintSettings {
            window_size: 256,
            hop_size: 256,
            band_height: 64,
            tile_width: 8,
            peaks_per_tile: 3,
        }
    }

    #[test]
    fn silence_has_no_landmarks() {
        let signal = AudioSignal::new(vec![0; 8192], 8000);
        let info = fingerprint_signal(&signal, &small_settings()).unwrap();
        assert!(info.constellation.is_empty());
        assert_eq!(info.hop_size, 256);
    }

    #[test]
    fn landmark_budget_holds_for_noise() {
        let mut state: u32 = 7;
        let samples: Vec<i16> = (0..256 * 40)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (state >> 17) as i16
            })
            .collect();
        let settings = small_settings();

        let info = fingerprint_signal(&AudioSignal::new(samples, 8000), &settings).unwrap();

        // 40 frames / 8 per tile = 5 tiles, 128 bins / 64 = 2 bands.
        assert_eq!(info.landmark_count(), 5 * 2 * 3);
    }

    #[test]
    fn rejects_zero_hop() {
        let mut settings = small_settings();
        settings.hop_size = 0;
        let result = fingerprint_signal(&AudioSignal::new(vec![1; 1024], 8000), &settings);
        assert!(matches!(result, Err(FingerprintError::InvalidSettings(_))));
    }

    #[test]
    fn hop_size_defaults_when_missing_from_json() {
        let info: ConstellationInfo =
            serde_json::from_str(r#"{"sample_rate":44100,"constellation":{"12":[1,5]}}"#).unwrap();
        assert_eq!(info.hop_size, 1024);
        assert!(info.constellation[&12].contains(&5));
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.json");
        let mut info = ConstellationInfo {
            sample_rate: 44100,
            hop_size: 1024,
            constellation: Constellation::new(),
        };
        info.constellation.entry(3).or_default().insert(9);

        info.save_json(&path).unwrap();
        assert_eq!(ConstellationInfo::load_json(&path).unwrap(), info);
    }

    #[test]
    fn fingerprint_media_cleans_scratch() {
        let dir = tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        let engine = ScriptedEngine::new();
        let logger = RunLogger::detached("fp", LogConfig::default());
        let mut settings = Settings::default();
        settings.fingerprint = small_settings();

        let info = fingerprint_media(
            &engine,
            &store,
            &logger,
            Path::new("scratch"),
            Path::new("/clips/a.mov"),
            &settings,
        )
        .unwrap();

        assert!(info.landmark_count() > 0);
        assert_eq!(info.sample_rate, 44100);
        assert_eq!(fs::read_dir(dir.path().join("scratch")).unwrap().count(), 0);
    }
}

//! Fades, delay-aligned mixing, and muxing onto the compiled video.

use std::path::{Path, PathBuf};

use super::{AudioError, AudioResult};
use crate::engine::commands::{self, MixInput};
use crate::engine::{run_command, MediaEngine};
use crate::logging::{ItemProgress, RunLogger};
use crate::models::GlobalOffset;
use crate::storage::{discard, FileStore};

/// One extracted track to fade.
#[derive(Debug, Clone, PartialEq)]
pub struct FadeTrack {
    pub path: PathBuf,
    pub duration_secs: f64,
}

/// One track to mix, with its window on the shared timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct MixTrack {
    pub path: PathBuf,
    /// `None` when the source's offset could not be resolved.
    pub window: Option<GlobalOffset>,
}

/// Apply a linear fade-in and fade-out to each track, one at a time.
///
/// Outputs are `<out_dir>/faded_<i>.wav`. On failure the faded files already
/// written (and the failing partial) are deleted.
pub fn fade_audios(
    engine: &dyn MediaEngine,
    store: &dyn FileStore,
    logger: &RunLogger,
    tracks: &[FadeTrack],
    out_dir: &Path,
    fade_secs: f64,
    progress: ItemProgress<'_>,
) -> AudioResult<Vec<PathBuf>> {
    let mut produced: Vec<PathBuf> = Vec::with_capacity(tracks.len());

    for (idx, track) in tracks.iter().enumerate() {
        let relative = out_dir.join(format!("faded_{}.wav", idx));
        let command = commands::fade_in_out(
            &store.absolute_path(&track.path),
            &store.absolute_path(&relative),
            track.duration_secs,
            fade_secs,
        );

        if let Err(e) = run_command(engine, logger, &format!("Fade track {}", idx + 1), &command) {
            let mut written: Vec<&Path> = produced.iter().map(PathBuf::as_path).collect();
            written.push(&relative);
            discard(store, logger, &written);
            return Err(e.into());
        }
        produced.push(relative);
        progress(produced.len(), tracks.len());
    }

    Ok(produced)
}

/// Mix resolved tracks into `output`, each delayed to its global start.
///
/// Tracks without a window are left out.
pub fn merge_audio_files(
    engine: &dyn MediaEngine,
    store: &dyn FileStore,
    logger: &RunLogger,
    tracks: &[MixTrack],
    sample_rate: u32,
    output: &Path,
) -> AudioResult<PathBuf> {
    let inputs: Vec<MixInput> = tracks
        .iter()
        .filter_map(|track| {
            track.window.map(|window| MixInput {
                path: store.absolute_path(&track.path),
                delay_secs: window.start_secs,
                sample_rate,
            })
        })
        .collect();

    if inputs.is_empty() {
        return Err(AudioError::NothingToMix);
    }

    let skipped = tracks.len() - inputs.len();
    if skipped > 0 {
        logger.warn(&format!("{} unresolved track(s) left out of the mix", skipped));
    }

    let command = commands::merge_audio(&inputs, &store.absolute_path(output));
    if let Err(e) = run_command(engine, logger, "Merge audio", &command) {
        discard(store, logger, &[output]);
        return Err(e.into());
    }

    Ok(output.to_path_buf())
}

/// Mux `audio` onto `video`, writing the final artifact at absolute `output`.
pub fn overlay_audio_on_video(
    engine: &dyn MediaEngine,
    store: &dyn FileStore,
    logger: &RunLogger,
    video: &Path,
    audio: &Path,
    output: &Path,
) -> AudioResult<PathBuf> {
    let command = commands::overlay_audio(
        &store.absolute_path(video),
        &store.absolute_path(audio),
        output,
    );
    run_command(engine, logger, "Overlay audio", &command)?;
    Ok(output.to_path_buf())
}

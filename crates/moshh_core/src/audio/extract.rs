//! Per-source audio extraction and PCM loading.

use std::path::{Path, PathBuf};

use super::AudioResult;
use crate::engine::{commands, run_command, MediaEngine};
use crate::logging::{ItemProgress, RunLogger};
use crate::models::{AudioSignal, MediaSource};
use crate::storage::{discard, FileStore};

/// Extract each source's audio to `<out_dir>/audio_<i>.wav` (mono s16, `sample_rate`).
///
/// Sources are processed one at a time. On failure every file written by
/// this call, including the failing command's partial output, is deleted.
/// Returns store-relative paths in source order.
pub fn extract_audios(
    engine: &dyn MediaEngine,
    store: &dyn FileStore,
    logger: &RunLogger,
    sources: &[MediaSource],
    out_dir: &Path,
    sample_rate: u32,
    progress: ItemProgress<'_>,
) -> AudioResult<Vec<PathBuf>> {
    let mut produced: Vec<PathBuf> = Vec::with_capacity(sources.len());

    for source in sources {
        let relative = out_dir.join(format!("audio_{}.wav", source.index));
        let command =
            commands::extract_audio(&source.path, &store.absolute_path(&relative), sample_rate);

        let operation = format!("Extract audio from {}", source.label());
        if let Err(e) = run_command(engine, logger, &operation, &command) {
            let mut written: Vec<&Path> = produced.iter().map(PathBuf::as_path).collect();
            written.push(&relative);
            discard(store, logger, &written);
            return Err(e.into());
        }

        logger.debug(&format!("{} audio -> {}", source.label(), relative.display()));
        produced.push(relative);
        progress(produced.len(), sources.len());
    }

    Ok(produced)
}

/// Decode an extracted track to 16-bit samples.
///
/// Transcodes to a raw `s16le` file at `pcm`, reads it back, and deletes it
/// whether or not the read succeeds.
pub fn load_audio_signal(
    engine: &dyn MediaEngine,
    store: &dyn FileStore,
    logger: &RunLogger,
    wav: &Path,
    pcm: &Path,
    sample_rate: u32,
) -> AudioResult<AudioSignal> {
    let command = commands::audio_to_pcm(&store.absolute_path(wav), &store.absolute_path(pcm));

    let result: AudioResult<Vec<u8>> = run_command(engine, logger, "Decode PCM", &command)
        .map_err(Into::into)
        .and_then(|_| store.read_binary_file(pcm).map_err(Into::into));
    discard(store, logger, &[pcm]);

    let bytes = result?;
    Ok(AudioSignal::from_le_bytes(&bytes, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioError;
    use crate::engine::testing::ScriptedEngine;
    use crate::logging::{no_progress, LogConfig};
    use crate::storage::LocalFileStore;
    use tempfile::tempdir;

    fn sources(n: usize) -> Vec<MediaSource> {
        (0..n)
            .map(|i| MediaSource::new(i, format!("/clips/{}.mov", i), 10.0))
            .collect()
    }

    #[test]
    fn extracts_every_source_in_order() {
        let dir = tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        let engine = ScriptedEngine::new();
        let logger = RunLogger::detached("t", LogConfig::default());
        store.make_directory(Path::new("run")).unwrap();

        let paths =
            extract_audios(&engine, &store, &logger, &sources(3), Path::new("run"), 44100, &no_progress).unwrap();

        assert_eq!(
            paths,
            vec![
                PathBuf::from("run/audio_0.wav"),
                PathBuf::from("run/audio_1.wav"),
                PathBuf::from("run/audio_2.wav"),
            ]
        );
        assert!(paths.iter().all(|p| store.exists(p)));
        let commands = engine.commands();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0].value_of("-ar"), Some("44100"));
    }

    #[test]
    fn failure_deletes_batch_including_partial_output() {
        let dir = tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        let engine = ScriptedEngine::new().fail_on("audio_1.wav", true);
        let logger = RunLogger::detached("t", LogConfig::default());
        store.make_directory(Path::new("run")).unwrap();

        let err = extract_audios(&engine, &store, &logger, &sources(3), Path::new("run"), 44100, &no_progress)
            .unwrap_err();

        assert!(matches!(err, AudioError::Engine(_)));
        assert!(!store.exists(Path::new("run/audio_0.wav")));
        assert!(!store.exists(Path::new("run/audio_1.wav")));
        assert_eq!(engine.commands().len(), 2);
    }

    #[test]
    fn load_signal_removes_temp_pcm() {
        let dir = tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        let engine = ScriptedEngine::new().with_pcm(vec![1, -2, 3, -4]);
        let logger = RunLogger::detached("t", LogConfig::default());

        let signal = load_audio_signal(
            &engine,
            &store,
            &logger,
            Path::new("a.wav"),
            Path::new("a.pcm"),
            8000,
        )
        .unwrap();

        assert_eq!(signal.samples, vec![1, -2, 3, -4]);
        assert_eq!(signal.sample_rate, 8000);
        assert!(!store.exists(Path::new("a.pcm")));
    }

    #[test]
    fn load_signal_failure_removes_partial_pcm() {
        let dir = tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        let engine = ScriptedEngine::new().fail_on("a.pcm", true);
        let logger = RunLogger::detached("t", LogConfig::default());

        let result = load_audio_signal(
            &engine,
            &store,
            &logger,
            Path::new("a.wav"),
            Path::new("a.pcm"),
            8000,
        );

        assert!(result.is_err());
        assert!(!store.exists(Path::new("a.pcm")));
    }
}

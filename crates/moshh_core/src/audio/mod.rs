//! Audio extraction and composite soundtrack assembly.
//!
//! Intermediate files live in a [`FileStore`](crate::storage::FileStore) and
//! are addressed by store-relative paths; only the final mux writes to an
//! absolute location.

mod extract;
mod mix;

use thiserror::Error;

use crate::engine::CommandFailed;
use crate::storage::StorageError;

pub use extract::{extract_audios, load_audio_signal};
pub use mix::{fade_audios, merge_audio_files, overlay_audio_on_video, FadeTrack, MixTrack};

/// Errors from audio operations.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error(transparent)]
    Engine(#[from] CommandFailed),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("No resolved tracks to mix")]
    NothingToMix,
}

/// Result type for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;

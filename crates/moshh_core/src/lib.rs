//! Moshh Core - audio-aligned multi-camera mashup generation
//!
//! Clips recorded at the same event are aligned on a shared timeline by
//! matching audio fingerprints, then cut together by a weighted random walk
//! and laid over a mix of every clip's audio.
//!
//! The crate has no UI dependencies; the `moshh` binary is one front end.

pub mod audio;
pub mod config;
pub mod engine;
pub mod fingerprint;
pub mod logging;
pub mod models;
pub mod offsets;
pub mod orchestrator;
pub mod storage;
pub mod timeline;

pub use orchestrator::{
    generate_moshh, GenerationOptions, GenerationRequest, MoshhError, MoshhGenerator,
};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}

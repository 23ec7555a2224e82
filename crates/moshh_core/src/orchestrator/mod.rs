//! Generation orchestrator.
//!
//! A run validates the request, probes its sources, then drives a fixed
//! sequence of steps inside its own temp namespace. Each step validates its
//! input, executes, and validates its output.
//!
//! ```text
//! MoshhGenerator::generate
//!     ├── Step: ExtractingAudio
//!     ├── Step: GeneratingConstellations (skipped when precomputed)
//!     ├── Step: CalculatingOffsets
//!     ├── Step: CompilingVideo
//!     ├── Step: FadingAudios
//!     ├── Step: MergingAudios
//!     ├── Step: OverlayingAudios
//!     └── CleaningUp, Finished (always reported)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use moshh_core::config::Settings;
//! use moshh_core::orchestrator::{GenerationRequest, MoshhGenerator};
//!
//! let generator = MoshhGenerator::from_settings(Settings::default());
//! generator.configure().unwrap();
//! let request = GenerationRequest::new(
//!     vec![PathBuf::from("a.mov"), PathBuf::from("b.mov")],
//!     vec![1.0, 1.0],
//! );
//! let output = generator.generate(request, None).unwrap();
//! println!("{}", output.display());
//! ```

mod artifacts;
mod errors;
mod generator;
mod pipeline;
mod step;
pub mod steps;
mod types;

pub use artifacts::{cleanup_run, CleanupReport, TempArtifacts};
pub use errors::{MoshhError, MoshhResult, StepError, StepResult};
pub use generator::{generate_moshh, GenerationOptions, GenerationRequest, MoshhGenerator};
pub use pipeline::{CancelHandle, Pipeline, PipelineRunResult};
pub use step::PipelineStep;
pub use steps::{
    CompileVideoStep, ConstellationStep, ExtractAudioStep, FadeAudioStep, MergeAudioStep,
    OffsetStep, OverlayAudioStep,
};
pub use types::{CompiledOutput, Context, ProgressCallback, RunState, StepOutcome};

/// The seven generation steps in execution order.
pub fn create_standard_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(ExtractAudioStep)
        .with_step(ConstellationStep)
        .with_step(OffsetStep)
        .with_step(CompileVideoStep)
        .with_step(FadeAudioStep)
        .with_step(MergeAudioStep)
        .with_step(OverlayAudioStep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_pipeline_stage_order() {
        let pipeline = create_standard_pipeline();
        assert_eq!(
            pipeline.step_names(),
            vec![
                "Extracting Audio",
                "Generating Constellations",
                "Calculating Offsets",
                "Compiling Video",
                "Fading Audios",
                "Merging Audios",
                "Overlaying Audios",
            ]
        );
    }
}

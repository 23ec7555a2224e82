//! Mix the faded tracks, each delayed to its place on the timeline.

use crate::audio::{self, MixTrack};
use crate::models::ProgressStage;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome};

pub struct MergeAudioStep;

impl PipelineStep for MergeAudioStep {
    fn stage(&self) -> ProgressStage {
        ProgressStage::MergingAudios
    }

    fn validate_input(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        let faded = state.faded.as_ref().map(Vec::len);
        let offsets = state.offsets.as_ref().map(Vec::len);
        if faded != Some(ctx.sources.len()) || offsets != Some(ctx.sources.len()) {
            return Err(StepError::invalid_input(
                "Faded tracks and offsets must both be present for every source",
            ));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let tracks: Vec<MixTrack> = state
            .faded
            .as_deref()
            .unwrap_or_default()
            .iter()
            .zip(state.offsets.as_deref().unwrap_or_default())
            .map(|(path, window)| MixTrack {
                path: path.clone(),
                window: *window,
            })
            .collect();

        let output = ctx.work_path("mixed.wav");
        state.artifacts.track("mixed", output.clone());

        let mixed = audio::merge_audio_files(
            ctx.engine.as_ref(),
            ctx.store.as_ref(),
            &ctx.logger,
            &tracks,
            ctx.settings.audio.sample_rate,
            &output,
        )?;

        state.mixed = Some(mixed);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        match state.mixed {
            Some(ref path) if ctx.store.exists(path) => Ok(()),
            Some(ref path) => Err(StepError::invalid_output(format!(
                "Mixed audio missing: {}",
                path.display()
            ))),
            None => Err(StepError::invalid_output("No mixed audio recorded")),
        }
    }
}

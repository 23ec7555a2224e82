//! Mux the mixed audio onto the compiled video at the output path.

use crate::audio;
use crate::models::ProgressStage;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome};

pub struct OverlayAudioStep;

impl PipelineStep for OverlayAudioStep {
    fn stage(&self) -> ProgressStage {
        ProgressStage::OverlayingAudios
    }

    fn validate_input(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        if state.compiled.is_none() {
            return Err(StepError::invalid_input("No compiled video"));
        }
        if state.mixed.is_none() {
            return Err(StepError::invalid_input("No mixed audio"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let (video, mixed) = match (&state.compiled, &state.mixed) {
            (Some(compiled), Some(mixed)) => (compiled.video.clone(), mixed.clone()),
            _ => return Err(StepError::invalid_input("Overlay inputs missing")),
        };

        let output = audio::overlay_audio_on_video(
            ctx.engine.as_ref(),
            ctx.store.as_ref(),
            &ctx.logger,
            &video,
            &mixed,
            &ctx.output_path,
        )?;

        ctx.logger.info(&format!("Wrote {}", output.display()));
        state.output = Some(output);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        match state.output {
            Some(ref path) if path.exists() => Ok(()),
            Some(ref path) => Err(StepError::invalid_output(format!(
                "Output missing: {}",
                path.display()
            ))),
            None => Err(StepError::invalid_output("No output recorded")),
        }
    }
}

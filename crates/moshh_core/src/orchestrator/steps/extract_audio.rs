//! Extract each source's audio to a uniform mono WAV.

use crate::audio;
use crate::models::ProgressStage;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome};

pub struct ExtractAudioStep;

impl PipelineStep for ExtractAudioStep {
    fn stage(&self) -> ProgressStage {
        ProgressStage::ExtractingAudio
    }

    fn validate_input(&self, ctx: &Context, _state: &RunState) -> StepResult<()> {
        if ctx.sources.is_empty() {
            return Err(StepError::invalid_input("No sources to extract"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let sample_rate = ctx.settings.audio.sample_rate;
        ctx.logger.info(&format!(
            "Extracting {} tracks at {} Hz",
            ctx.sources.len(),
            sample_rate
        ));

        let paths = audio::extract_audios(
            ctx.engine.as_ref(),
            ctx.store.as_ref(),
            &ctx.logger,
            &ctx.sources,
            &ctx.work_dir,
            sample_rate,
            &|done: usize, total: usize| ctx.report_items(self.stage(), done, total),
        )?;

        for (idx, path) in paths.iter().enumerate() {
            state.artifacts.track(format!("audio_{}", idx), path.clone());
        }
        state.audio = Some(paths);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        let paths = state
            .audio
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("No extracted audio recorded"))?;
        if paths.len() != ctx.sources.len() {
            return Err(StepError::invalid_output(format!(
                "Extracted {} tracks for {} sources",
                paths.len(),
                ctx.sources.len()
            )));
        }
        if let Some(missing) = paths.iter().find(|p| !ctx.store.exists(p)) {
            return Err(StepError::invalid_output(format!(
                "Extracted audio missing: {}",
                missing.display()
            )));
        }
        Ok(())
    }
}

//! Fade each extracted track in and out.

use crate::audio::{self, FadeTrack};
use crate::models::ProgressStage;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome};

pub struct FadeAudioStep;

impl PipelineStep for FadeAudioStep {
    fn stage(&self) -> ProgressStage {
        ProgressStage::FadingAudios
    }

    fn validate_input(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        match state.audio {
            Some(ref paths) if paths.len() == ctx.sources.len() => Ok(()),
            _ => Err(StepError::invalid_input("Extracted audio missing")),
        }
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let wavs = state.audio.as_deref().unwrap_or_default();
        let mut tracks: Vec<FadeTrack> = Vec::with_capacity(wavs.len());
        for path in wavs {
            let info = ctx.engine.probe(&ctx.store.absolute_path(path))?;
            tracks.push(FadeTrack {
                path: path.clone(),
                duration_secs: info.duration_secs,
            });
        }

        let faded = audio::fade_audios(
            ctx.engine.as_ref(),
            ctx.store.as_ref(),
            &ctx.logger,
            &tracks,
            &ctx.work_dir,
            ctx.settings.audio.fade_secs,
            &|done: usize, total: usize| ctx.report_items(self.stage(), done, total),
        )?;

        for (idx, path) in faded.iter().enumerate() {
            state.artifacts.track(format!("faded_{}", idx), path.clone());
        }
        state.faded = Some(faded);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        match state.faded {
            Some(ref paths) if paths.len() == ctx.sources.len() => Ok(()),
            _ => Err(StepError::invalid_output("Faded tracks missing")),
        }
    }
}

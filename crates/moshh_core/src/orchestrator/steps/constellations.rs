//! Fingerprint every extracted track (unless constellations were supplied).

use crate::audio;
use crate::fingerprint::{fingerprint_signal, ConstellationInfo};
use crate::models::ProgressStage;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome};

pub struct ConstellationStep;

impl PipelineStep for ConstellationStep {
    fn stage(&self) -> ProgressStage {
        ProgressStage::GeneratingConstellations
    }

    fn validate_input(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        if ctx.precomputed.is_none() && state.audio.is_none() {
            return Err(StepError::invalid_input("No extracted audio to fingerprint"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        if let Some(ref precomputed) = ctx.precomputed {
            state.constellations = Some(precomputed.clone());
            return Ok(StepOutcome::Skipped(format!(
                "using {} precomputed constellations",
                precomputed.len()
            )));
        }

        let wavs = state.audio.clone().unwrap_or_default();
        let sample_rate = ctx.settings.audio.sample_rate;
        let mut constellations: Vec<ConstellationInfo> = Vec::with_capacity(wavs.len());

        for (idx, wav) in wavs.iter().enumerate() {
            let pcm = wav.with_extension("pcm");
            state.artifacts.track(format!("pcm_{}", idx), pcm.clone());

            let signal = audio::load_audio_signal(
                ctx.engine.as_ref(),
                ctx.store.as_ref(),
                &ctx.logger,
                wav,
                &pcm,
                sample_rate,
            )?;
            let info = fingerprint_signal(&signal, &ctx.settings.fingerprint)?;

            ctx.logger.info(&format!(
                "Source {}: {:.1}s of audio, {} landmarks",
                idx + 1,
                signal.duration_secs(),
                info.landmark_count()
            ));
            constellations.push(info);
            ctx.report_items(self.stage(), constellations.len(), wavs.len());
        }

        state.constellations = Some(constellations);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        match state.constellations {
            Some(ref c) if c.len() == ctx.sources.len() => Ok(()),
            Some(ref c) => Err(StepError::invalid_output(format!(
                "{} constellations for {} sources",
                c.len(),
                ctx.sources.len()
            ))),
            None => Err(StepError::invalid_output("No constellations recorded")),
        }
    }
}

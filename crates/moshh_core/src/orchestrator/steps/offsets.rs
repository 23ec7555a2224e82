//! Place every source on the shared timeline.

use crate::models::ProgressStage;
use crate::offsets::compute_global_offsets;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome};

pub struct OffsetStep;

impl PipelineStep for OffsetStep {
    fn stage(&self) -> ProgressStage {
        ProgressStage::CalculatingOffsets
    }

    fn validate_input(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        match state.constellations {
            Some(ref c) if c.len() == ctx.sources.len() => Ok(()),
            _ => Err(StepError::invalid_input(
                "Constellations missing or not one per source",
            )),
        }
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let constellations = state.constellations.as_deref().unwrap_or_default();
        let windows =
            compute_global_offsets(constellations, &ctx.durations(), &ctx.settings.offsets)?;

        for (source, window) in ctx.sources.iter().zip(&windows) {
            match window {
                Some(w) => ctx.logger.info(&format!(
                    "{}: {:.3}s - {:.3}s",
                    source.label(),
                    w.start_secs,
                    w.end_secs
                )),
                None => ctx.logger.warn(&format!(
                    "{} could not be aligned and is left out",
                    source.label()
                )),
            }
        }

        state.offsets = Some(windows);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        let windows = state
            .offsets
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("No offsets recorded"))?;

        let min_start = windows
            .iter()
            .flatten()
            .map(|w| w.start_secs)
            .fold(f64::INFINITY, f64::min);
        if !min_start.is_finite() {
            return Err(StepError::invalid_output("No source was placed on the timeline"));
        }
        if min_start.abs() > 1e-9 {
            return Err(StepError::invalid_output(format!(
                "Earliest source starts at {:.6}s instead of 0",
                min_start
            )));
        }
        Ok(())
    }
}

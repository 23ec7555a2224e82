//! Weighted random walk over the aligned sources, rendered and joined.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::models::ProgressStage;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{CompiledOutput, Context, RunState, StepOutcome};
use crate::timeline::{SubclipBounds, TimelineCompiler, TimelineSource};

pub struct CompileVideoStep;

impl CompileVideoStep {
    fn timeline_sources(ctx: &Context, state: &RunState) -> Vec<TimelineSource> {
        let windows = state.offsets.as_deref().unwrap_or_default();
        ctx.sources
            .iter()
            .zip(&ctx.weights)
            .zip(windows)
            .map(|((source, weight), window)| TimelineSource {
                path: source.path.clone(),
                weight: *weight,
                window: *window,
            })
            .collect()
    }
}

impl PipelineStep for CompileVideoStep {
    fn stage(&self) -> ProgressStage {
        ProgressStage::CompilingVideo
    }

    fn validate_input(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        match state.offsets {
            Some(ref windows) if windows.len() == ctx.sources.len() => {}
            _ => return Err(StepError::invalid_input("Offsets missing or not one per source")),
        }
        if ctx.weights.len() != ctx.sources.len() {
            return Err(StepError::invalid_input(format!(
                "{} weights for {} sources",
                ctx.weights.len(),
                ctx.sources.len()
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let generation = &ctx.settings.generation;
        let bounds = SubclipBounds::new(generation.min_subclip_secs, generation.max_subclip_secs);
        let sources = Self::timeline_sources(ctx, state);

        ctx.logger.info(&format!(
            "Compiling {} of {} sources, subclips {:.2}s - {:.2}s, seed {}",
            state.resolved_count(),
            sources.len(),
            bounds.min_secs,
            bounds.max_secs,
            ctx.seed
        ));

        let mut rng = StdRng::seed_from_u64(ctx.seed);
        let report = |done: usize, total: usize| ctx.report_items(self.stage(), done, total);
        let compiler = TimelineCompiler::new(
            ctx.engine.as_ref(),
            ctx.store.as_ref(),
            &ctx.logger,
            &ctx.settings.encode,
            &ctx.work_dir,
        )
        .with_extension(generation.output_format.as_str())
        .with_progress(&report);

        let compiled = compiler.compile(&sources, bounds, &mut rng)?;

        for (idx, path) in compiled.plan.paths().into_iter().enumerate() {
            state.artifacts.track(format!("subclip_{}", idx), path);
        }
        state.artifacts.track("concat_list", compiled.list_file.clone());
        state.artifacts.track("compiled", compiled.video.clone());

        state.compiled = Some(CompiledOutput {
            plan: compiled.plan,
            video: compiled.video,
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        let compiled = state
            .compiled
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("No compiled video recorded"))?;
        if compiled.plan.is_empty() {
            return Err(StepError::invalid_output("Compilation plan is empty"));
        }
        if !ctx.store.exists(&compiled.video) {
            return Err(StepError::invalid_output(format!(
                "Compiled video missing: {}",
                compiled.video.display()
            )));
        }
        Ok(())
    }
}

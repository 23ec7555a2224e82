//! Pipeline step trait definition.

use super::errors::StepResult;
use super::types::{Context, RunState, StepOutcome};
use crate::models::ProgressStage;

/// One stage of a generation run.
///
/// The pipeline runner calls these methods in order:
///
/// 1. `validate_input` - Check preconditions before execution
/// 2. `execute` - Perform the step's work
/// 3. `validate_output` - Verify the step produced valid output
///    (only after `StepOutcome::Success`)
pub trait PipelineStep: Send + Sync {
    /// Progress stage this step reports.
    fn stage(&self) -> ProgressStage;

    /// Step name (for logging and error context).
    fn name(&self) -> &str {
        self.stage().label()
    }

    fn validate_input(&self, ctx: &Context, state: &RunState) -> StepResult<()>;

    /// Perform the step's work and record results in `state`.
    ///
    /// Every file written must be registered in `state.artifacts` (or be the
    /// final output) so cleanup can find it.
    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome>;

    fn validate_output(&self, ctx: &Context, state: &RunState) -> StepResult<()>;

    fn description(&self) -> &str {
        self.name()
    }
}

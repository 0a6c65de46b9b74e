//! The `loop_elements` handler.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{Dispatch, StepHandler, StepOutcome};
use crate::config::WorkflowStep;
use crate::trajectory::ActionResult;
use crate::{ExecutionContext, Result};

/// Records the loop itself, then runs `loop_actions` `maxIterations` times.
///
/// A missing, zero or non-numeric `maxIterations` runs the body once, a
/// negative one skips it, and fractions round up (`2.5` runs three passes).
/// Numeric strings count as numbers. Every
/// iteration runs the whole body; a nested step that faults is recorded by
/// the dispatcher and counted, but does not stop the loop.
///
/// Returns `{iterations, nested_failures}`.
#[derive(Debug, Clone, Default)]
pub struct LoopStep;

impl LoopStep {
    /// Number of iterations requested by `step`.
    pub fn iterations(step: &WorkflowStep) -> u64 {
        match step.param_f64("maxIterations") {
            Some(n) if n < 0.0 => 0,
            Some(n) if n > 0.0 => n.ceil() as u64,
            _ => 1,
        }
    }
}

#[async_trait]
impl StepHandler for LoopStep {
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        step: &WorkflowStep,
        dispatch: &dyn Dispatch,
    ) -> Result<Option<Value>> {
        ctx.record_action(&step.action, &step.params, ActionResult::Success, None)
            .await;

        let iterations = Self::iterations(step);
        let body = step.loop_actions.as_deref().unwrap_or_default();
        let mut nested_failures = 0usize;

        for iteration in 0..iterations {
            debug!(iteration, of = iterations, steps = body.len(), "loop iteration");
            for inner in body {
                if let StepOutcome::Failed(_) = dispatch.dispatch(ctx, inner).await {
                    nested_failures += 1;
                }
            }
        }

        Ok(Some(json!({
            "iterations": iterations,
            "nested_failures": nested_failures,
        })))
    }

    fn name(&self) -> &str {
        "loop_elements"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    struct Counting(parking_lot::Mutex<usize>);

    #[async_trait]
    impl Dispatch for Counting {
        async fn dispatch(&self, ctx: &ExecutionContext, step: &WorkflowStep) -> StepOutcome {
            *self.0.lock() += 1;
            ctx.record_action(&step.action, &Map::new(), ActionResult::Success, None)
                .await;
            StepOutcome::Succeeded(None)
        }
    }

    fn looped(max_iterations: Option<serde_json::Value>) -> WorkflowStep {
        let step = WorkflowStep::new("loop_elements").loop_actions(vec![WorkflowStep::new("click")]);
        match max_iterations {
            Some(value) => step.param("maxIterations", value),
            None => step,
        }
    }

    async fn nested_runs(step: &WorkflowStep) -> usize {
        let ctx = ExecutionContext::new("t");
        let dispatch = Counting(parking_lot::Mutex::new(0));
        LoopStep.execute(&ctx, step, &dispatch).await.unwrap();
        assert_eq!(ctx.trajectory_snapshot().actions[0].action, "loop_elements");
        let runs = *dispatch.0.lock();
        runs
    }

    #[test]
    fn test_iteration_defaults() {
        assert_eq!(LoopStep::iterations(&looped(None)), 1);
        assert_eq!(LoopStep::iterations(&looped(Some(json!(0)))), 1);
        assert_eq!(LoopStep::iterations(&looped(Some(json!("many")))), 1);
        assert_eq!(LoopStep::iterations(&looped(Some(json!(null)))), 1);
        assert_eq!(LoopStep::iterations(&looped(Some(json!(4)))), 4);
    }

    #[test]
    fn test_negative_count_skips_body() {
        assert_eq!(LoopStep::iterations(&looped(Some(json!(-2)))), 0);
    }

    #[test]
    fn test_fractional_count_rounds_up() {
        assert_eq!(LoopStep::iterations(&looped(Some(json!(2.5)))), 3);
        assert_eq!(LoopStep::iterations(&looped(Some(json!(0.2)))), 1);
    }

    #[test]
    fn test_numeric_string_count() {
        assert_eq!(LoopStep::iterations(&looped(Some(json!("3")))), 3);
    }

    #[tokio::test]
    async fn test_body_runs_match_iteration_count() {
        assert_eq!(nested_runs(&looped(Some(json!(-2)))).await, 0);
        assert_eq!(nested_runs(&looped(Some(json!(2.5)))).await, 3);
        assert_eq!(nested_runs(&looped(Some(json!("3")))).await, 3);
        assert_eq!(nested_runs(&looped(None)).await, 1);
    }
}

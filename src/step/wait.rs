//! The `wait` handler.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{Dispatch, StepHandler};
use crate::config::WorkflowStep;
use crate::trajectory::ActionResult;
use crate::{ExecutionContext, Result};

/// Records the action, then sleeps for `params.duration` milliseconds.
///
/// `duration` may be a number or a numeric string. Steps without a positive
/// `duration` (for example selector waits) return immediately after recording.
#[derive(Debug, Clone, Default)]
pub struct WaitStep;

#[async_trait]
impl StepHandler for WaitStep {
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        step: &WorkflowStep,
        _dispatch: &dyn Dispatch,
    ) -> Result<Option<Value>> {
        ctx.record_action(&step.action, &step.params, ActionResult::Success, None)
            .await;
        if let Some(ms) = step.param_u64("duration").filter(|ms| *ms > 0) {
            debug!(duration_ms = ms, "waiting");
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        Ok(None)
    }

    fn name(&self) -> &str {
        "wait"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepOutcome;
    use std::time::Instant;

    struct NoNesting;

    #[async_trait]
    impl Dispatch for NoNesting {
        async fn dispatch(&self, _ctx: &ExecutionContext, _step: &WorkflowStep) -> StepOutcome {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_sleeps_for_duration() {
        let ctx = ExecutionContext::new("t");
        let step = WorkflowStep::new("wait").param("duration", 60);
        let started = Instant::now();
        WaitStep.execute(&ctx, &step, &NoNesting).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(60));
        assert_eq!(ctx.action_count(), 1);
    }

    #[tokio::test]
    async fn test_string_duration_still_sleeps() {
        let ctx = ExecutionContext::new("t");
        let step = WorkflowStep::new("wait").param("duration", "50");
        let started = Instant::now();
        WaitStep.execute(&ctx, &step, &NoNesting).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_selector_wait_does_not_sleep() {
        let ctx = ExecutionContext::new("t");
        let step = WorkflowStep::new("wait")
            .param("selector", "#results")
            .param("timeout", 60_000);
        let started = Instant::now();
        WaitStep.execute(&ctx, &step, &NoNesting).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}

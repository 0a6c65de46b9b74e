//! Step handlers.
//!
//! This module defines the [`StepHandler`] trait, which the
//! [`Engine`](crate::Engine) looks up by action tag, together with the
//! built-in simulated handlers and [`LambdaHandler`] for closure-based
//! handlers.
//!
//! Handlers never touch a real page. They record what they were asked to do
//! in the run's trajectory and return optional result data. A handler that
//! returns `Err` has faulted; the engine records the fault and reports the
//! step as failed.

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;

use crate::config::WorkflowStep;
use crate::trajectory::ActionResult;
use crate::{ExecutionContext, Result};

pub mod loop_elements;
pub mod simulated;
pub mod wait;

pub use loop_elements::LoopStep;
pub use simulated::SimulatedAction;
pub use wait::WaitStep;

/// The result of dispatching one step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The step ran; carries any data the handler produced.
    Succeeded(Option<Value>),
    /// The step faulted; carries the fault message.
    Failed(String),
}

impl StepOutcome {
    /// Returns `true` for [`StepOutcome::Succeeded`].
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Succeeded(_))
    }

    /// Handler data, if the step succeeded and produced any.
    pub fn data(&self) -> Option<&Value> {
        match self {
            StepOutcome::Succeeded(data) => data.as_ref(),
            StepOutcome::Failed(_) => None,
        }
    }
}

/// Something that can run a single step, including its fault handling.
///
/// Implemented by the engine and handed to handlers that run nested steps.
#[async_trait]
pub trait Dispatch: Send + Sync {
    /// Run `step` and report its outcome. Never fails; faults are recorded.
    async fn dispatch(&self, ctx: &ExecutionContext, step: &WorkflowStep) -> StepOutcome;
}

/// Executes steps carrying one action tag.
///
/// # Example
///
/// ```rust
/// use agent_eval_harness::{Engine, ExecutionContext, LambdaHandler, StepOutcome, WorkflowStep};
/// use agent_eval_harness::step::Dispatch;
///
/// # tokio_test::block_on(async {
/// let engine = Engine::new().with_handler(
///     "scroll",
///     LambdaHandler::new(|step: WorkflowStep| async move {
///         Ok::<_, agent_eval_harness::Error>(step.params.get("amount").cloned())
///     }),
/// );
///
/// let ctx = ExecutionContext::new("demo");
/// let step = WorkflowStep::new("scroll").param("amount", 300);
/// let outcome = engine.dispatch(&ctx, &step).await;
/// assert_eq!(outcome.data(), Some(&serde_json::json!(300)));
/// # });
/// ```
#[async_trait]
pub trait StepHandler: Send + Sync {
    /// Execute `step`, recording it in `ctx`. Nested steps go through `dispatch`.
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        step: &WorkflowStep,
        dispatch: &dyn Dispatch,
    ) -> Result<Option<Value>>;

    /// Returns a human-readable name for this handler. Defaults to the type name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A handler constructed from a closure.
///
/// The closure runs first; the action is recorded as a success only when it
/// returns `Ok`. An `Err` leaves recording to the engine's fault path, so a
/// failing lambda produces exactly one `error` record.
pub struct LambdaHandler<F> {
    f: F,
}

impl<F, Fut> LambdaHandler<F>
where
    F: Fn(WorkflowStep) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
{
    /// Create a new handler from the given closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> StepHandler for LambdaHandler<F>
where
    F: Fn(WorkflowStep) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
{
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        step: &WorkflowStep,
        _dispatch: &dyn Dispatch,
    ) -> Result<Option<Value>> {
        let data = (self.f)(step.clone()).await?;
        ctx.record_action(&step.action, &step.params, ActionResult::Success, None)
            .await;
        Ok(data)
    }
}

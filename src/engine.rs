//! The test execution engine.
//!
//! [`Engine`] runs a [`TestConfig`]'s workflow against the registered step
//! handlers, records the trajectory in a fresh [`ExecutionContext`], scores
//! it and writes the result to the attached store.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::config::{TestConfig, WorkflowStep, LOOP_ACTION};
use crate::evaluator::{evaluate, Evaluation};
use crate::events::{TraceEntry, WorkflowEvent};
use crate::step::{Dispatch, LoopStep, SimulatedAction, StepHandler, StepOutcome, WaitStep};
use crate::store::{PersistenceFailure, PersistenceTarget, ResultStore, TestResultRow};
use crate::trajectory::{ActionResult, TestTrajectory, TrajectoryStatus};
use crate::{ExecutionContext, Result};

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The finalized trajectory.
    pub trajectory: TestTrajectory,
    /// Its evaluation against the config.
    pub evaluation: Evaluation,
    /// Datastore writes that failed and were skipped.
    pub persistence_failures: Vec<PersistenceFailure>,
    /// The structured event log of the run.
    pub trace: Vec<TraceEntry>,
}

impl RunOutcome {
    /// Final trajectory status.
    pub fn status(&self) -> TrajectoryStatus {
        self.trajectory.status
    }

    /// Whether the evaluation passed.
    pub fn passed(&self) -> bool {
        self.evaluation.passed
    }
}

/// Runs test configs step by step.
///
/// Each run gets its own [`ExecutionContext`], so one engine can drive any
/// number of runs at once.
///
/// # Example
///
/// ```rust
/// use agent_eval_harness::{Engine, TestCatalog, TrajectoryStatus};
///
/// # tokio_test::block_on(async {
/// let catalog = TestCatalog::showcase();
/// let config = catalog.get("showcase_05_form_interaction").unwrap();
///
/// let outcome = Engine::new().run(config).await;
/// assert_eq!(outcome.status(), TrajectoryStatus::Completed);
/// assert_eq!(outcome.trajectory.actions.len(), 5);
/// assert_eq!(outcome.evaluation.score, 100);
/// # });
/// ```
pub struct Engine {
    handlers: HashMap<String, Arc<dyn StepHandler>>,
    fallback: Arc<dyn StepHandler>,
    store: Option<Arc<dyn ResultStore>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine with the built-in simulated handlers and no store.
    pub fn new() -> Self {
        let mut handlers: HashMap<String, Arc<dyn StepHandler>> = HashMap::new();
        handlers.insert("navigate".to_string(), Arc::new(SimulatedAction::navigate()));
        handlers.insert("click".to_string(), Arc::new(SimulatedAction::plain()));
        handlers.insert("fill".to_string(), Arc::new(SimulatedAction::plain()));
        handlers.insert("extract_data".to_string(), Arc::new(SimulatedAction::extract_data()));
        handlers.insert("wait".to_string(), Arc::new(WaitStep));
        handlers.insert(LOOP_ACTION.to_string(), Arc::new(LoopStep));
        Self {
            handlers,
            fallback: Arc::new(SimulatedAction::plain()),
            store: None,
        }
    }

    /// Persist results and activity rows to `store`.
    pub fn with_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Register `handler` for `action`, replacing any existing one.
    pub fn with_handler<H>(mut self, action: impl Into<String>, handler: H) -> Self
    where
        H: StepHandler + 'static,
    {
        self.handlers.insert(action.into(), Arc::new(handler));
        self
    }

    /// Returns `true` if a dedicated handler is registered for `action`.
    pub fn handles(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    /// Run `config` to completion.
    pub async fn run(&self, config: &TestConfig) -> RunOutcome {
        self.run_with_progress(config, |_, _, _| {}).await
    }

    /// Run `config`, calling `on_progress(index, total, action)` before each
    /// top-level step.
    ///
    /// The callback only observes. The workflow runs as given; it is not
    /// checked against [`TestConfig::validate`]. Step faults, handler panics
    /// and datastore failures are all folded into the returned [`RunOutcome`].
    pub async fn run_with_progress<F>(&self, config: &TestConfig, mut on_progress: F) -> RunOutcome
    where
        F: FnMut(usize, usize, &str) + Send,
    {
        let ctx = ExecutionContext::with_store(config.id.clone(), self.store.clone());
        let total_steps = config.expected_workflow.len();
        info!(test_id = %config.id, total_steps, "starting test run");
        ctx.emit(WorkflowEvent::RunStarted {
            test_id: config.id.clone(),
            total_steps,
        });

        let body = AssertUnwindSafe(self.run_steps(&ctx, config, &mut on_progress))
            .catch_unwind()
            .await;
        match body {
            Ok(Ok(())) => {}
            Ok(Err(err)) => fault(&ctx, err.to_string()),
            Err(payload) => fault(&ctx, panic_message(payload.as_ref())),
        }

        self.finish(&ctx, config).await
    }

    async fn run_steps<F>(&self, ctx: &ExecutionContext, config: &TestConfig, on_progress: &mut F) -> Result<()>
    where
        F: FnMut(usize, usize, &str) + Send,
    {
        let total = config.expected_workflow.len();
        for (i, step) in config.expected_workflow.iter().enumerate() {
            let index = i + 1;
            on_progress(index, total, &step.action);
            ctx.emit(WorkflowEvent::StepStarted {
                index,
                total,
                action: step.action.clone(),
            });

            if let StepOutcome::Failed(message) = self.dispatch(ctx, step).await {
                info!(test_id = %config.id, index, %message, "aborting run after failed step");
                ctx.set_status(TrajectoryStatus::Failed)?;
                break;
            }
        }

        if ctx.status() == TrajectoryStatus::Running {
            ctx.set_status(TrajectoryStatus::Completed)?;
        }
        Ok(())
    }

    async fn finish(&self, ctx: &ExecutionContext, config: &TestConfig) -> RunOutcome {
        let trajectory = match ctx.finalize() {
            Ok(trajectory) => trajectory,
            Err(err) => {
                warn!(test_id = %config.id, error = %err, "trajectory finalized twice");
                ctx.trajectory_snapshot()
            }
        };
        let evaluation = evaluate(config, &trajectory);

        if let Some(store) = ctx.store() {
            let row = TestResultRow::from_run(config, &trajectory, &evaluation);
            if let Err(err) = store.insert_test_result(&row).await {
                ctx.record_persistence_failure(PersistenceTarget::TestResult, err.to_string());
            }
        }

        let total_duration = trajectory.total_duration.unwrap_or(0);
        ctx.emit(WorkflowEvent::RunFinished {
            status: trajectory.status,
            total_duration,
        });
        info!(
            test_id = %config.id,
            status = %trajectory.status,
            actions = trajectory.action_count(),
            score = evaluation.score,
            passed = evaluation.passed,
            duration_ms = total_duration,
            "test run finished"
        );

        RunOutcome {
            trajectory,
            evaluation,
            persistence_failures: ctx.persistence_failures(),
            trace: ctx.trace_snapshot(),
        }
    }
}

#[async_trait]
impl Dispatch for Engine {
    async fn dispatch(&self, ctx: &ExecutionContext, step: &WorkflowStep) -> StepOutcome {
        let handler = self.handlers.get(&step.action).unwrap_or(&self.fallback);
        debug!(action = %step.action, handler = handler.name(), "dispatching step");

        match handler.execute(ctx, step, self).await {
            Ok(data) => StepOutcome::Succeeded(data),
            Err(err) => {
                let message = err.to_string();
                warn!(action = %step.action, error = %message, "step faulted");
                ctx.record_action(
                    &step.action,
                    &step.params,
                    ActionResult::Error,
                    Some(message.clone()),
                )
                .await;
                ctx.emit(WorkflowEvent::StepFailed {
                    action: step.action.clone(),
                    message: message.clone(),
                });
                StepOutcome::Failed(message)
            }
        }
    }
}

fn fault(ctx: &ExecutionContext, message: String) {
    warn!(test_id = %ctx.test_id(), error = %message, "test run faulted");
    if let Err(err) = ctx.set_status(TrajectoryStatus::Error) {
        debug!(error = %err, "status already final, keeping it");
    }
    ctx.emit(WorkflowEvent::RunFaulted { message });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("step handler panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("step handler panicked: {s}")
    } else {
        "step handler panicked".to_string()
    }
}

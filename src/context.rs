//! Per-run execution context.
//!
//! This module provides the [`ExecutionContext`], the session handle created
//! for every run and passed to every step handler. It owns the run's
//! trajectory, its structured trace log and the list of persistence failures,
//! so two runs never share bookkeeping.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::warn;

use crate::events::{TraceEntry, WorkflowEvent};
use crate::store::{ActivityLogRow, PersistenceFailure, PersistenceTarget, ResultStore};
use crate::trajectory::{ActionRecord, ActionResult, TestTrajectory, TrajectoryStatus};
use crate::Result;

/// Context passed to every step of a run.
///
/// The context is cheap to clone; clones share the same run state.
///
/// # Example
///
/// ```rust
/// use agent_eval_harness::{ActionResult, ExecutionContext};
/// use serde_json::Map;
///
/// # tokio_test::block_on(async {
/// let ctx = ExecutionContext::new("showcase_01_basic_nav");
/// let record = ctx
///     .record_action("navigate", &Map::new(), ActionResult::Success, None)
///     .await;
/// assert_eq!(record.step, 1);
/// assert_eq!(ctx.action_count(), 1);
/// # });
/// ```
#[derive(Clone)]
pub struct ExecutionContext {
    trajectory: Arc<Mutex<TestTrajectory>>,
    traces: Arc<Mutex<Vec<TraceEntry>>>,
    failures: Arc<Mutex<Vec<PersistenceFailure>>>,
    store: Option<Arc<dyn ResultStore>>,
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("trajectory", &self.trajectory)
            .field("traces", &self.traces.lock().len())
            .field("store", &self.store.is_some())
            .finish()
    }
}

impl ExecutionContext {
    /// Start a fresh, store-less run for `test_id`.
    #[must_use]
    pub fn new(test_id: impl Into<String>) -> Self {
        Self::with_store(test_id, None)
    }

    /// Start a fresh run whose activity rows go to `store`.
    #[must_use]
    pub fn with_store(test_id: impl Into<String>, store: Option<Arc<dyn ResultStore>>) -> Self {
        Self {
            trajectory: Arc::new(Mutex::new(TestTrajectory::begin(test_id))),
            traces: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(Vec::new())),
            store,
        }
    }

    /// Id of the test being run.
    pub fn test_id(&self) -> String {
        self.trajectory.lock().test_id.clone()
    }

    /// Append an action record to the trajectory.
    ///
    /// `comment` and `submit` actions are also written to the activity log
    /// when a store is attached; a failed write is recorded and logged but
    /// does not affect the returned record.
    pub async fn record_action(
        &self,
        action: &str,
        params: &Map<String, Value>,
        result: ActionResult,
        error: Option<String>,
    ) -> ActionRecord {
        let record = self
            .trajectory
            .lock()
            .push(action, params.clone(), result, error)
            .clone();
        self.emit(WorkflowEvent::ActionRecorded {
            step: record.step,
            action: record.action.clone(),
            result: record.result,
        });

        if let (Some(store), Some(row)) = (&self.store, ActivityLogRow::for_record(&record)) {
            if let Err(err) = store.insert_activity(&row).await {
                self.record_persistence_failure(PersistenceTarget::ActivityLog, err.to_string());
            }
        }

        record
    }

    /// Current trajectory status.
    pub fn status(&self) -> TrajectoryStatus {
        self.trajectory.lock().status
    }

    /// Move the trajectory to a terminal status.
    pub fn set_status(&self, status: TrajectoryStatus) -> Result<()> {
        self.trajectory.lock().transition(status)
    }

    /// Number of records so far.
    pub fn action_count(&self) -> usize {
        self.trajectory.lock().action_count()
    }

    /// Stamp the end time and return the finished trajectory.
    pub fn finalize(&self) -> Result<TestTrajectory> {
        let mut trajectory = self.trajectory.lock();
        trajectory.finalize()?;
        Ok(trajectory.clone())
    }

    /// A copy of the trajectory as it stands.
    #[must_use]
    pub fn trajectory_snapshot(&self) -> TestTrajectory {
        self.trajectory.lock().clone()
    }

    /// The store attached to this run, if any.
    pub fn store(&self) -> Option<&Arc<dyn ResultStore>> {
        self.store.as_ref()
    }

    /// Emit a structured event to the trace log.
    pub fn emit(&self, event: WorkflowEvent) {
        self.traces.lock().push(TraceEntry::new(event));
    }

    /// Get a snapshot of the current trace log.
    #[must_use]
    pub fn trace_snapshot(&self) -> Vec<TraceEntry> {
        self.traces.lock().clone()
    }

    /// Note a skipped datastore write.
    pub fn record_persistence_failure(&self, target: PersistenceTarget, message: impl Into<String>) {
        let message = message.into();
        warn!(test_id = %self.test_id(), ?target, error = %message, "datastore write failed");
        self.failures.lock().push(PersistenceFailure {
            target,
            message: message.clone(),
        });
        self.emit(WorkflowEvent::PersistenceFailed { target, message });
    }

    /// Datastore writes that failed during this run.
    #[must_use]
    pub fn persistence_failures(&self) -> Vec<PersistenceFailure> {
        self.failures.lock().clone()
    }
}

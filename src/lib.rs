//! # agent-eval-harness
//!
//! Scripted evaluation runs for browser-automation agents.
//!
//! A [`TestConfig`] describes a workflow the agent is expected to perform:
//! an ordered list of [`WorkflowStep`]s, optionally with a bounded loop, plus
//! the outcome it should reach. The [`Engine`] walks the workflow through
//! simulated step handlers, records every action in a [`TestTrajectory`],
//! scores the result and writes it to a [`ResultStore`].
//!
//! ## Core Concepts
//!
//! - **TestConfig**: a test case and its expected workflow
//! - **TestCatalog**: a validated set of test cases, including the showcase suite
//! - **Engine**: runs a config and produces a [`RunOutcome`]
//! - **StepHandler**: executes one action tag; see [`LambdaHandler`] for closures
//! - **ExecutionContext**: per-run trajectory, trace log and store handle
//! - **evaluate**: the 100-point scoring of a finished trajectory
//! - **ResultStore**: where results and activity rows go ([`SupabaseStore`], [`MemoryStore`])
//!
//! ## Example: Running a Test
//!
//! ```rust
//! use std::sync::Arc;
//! use agent_eval_harness::{Engine, ExpectedOutcome, MemoryStore, TestConfig, TrajectoryStatus, WorkflowStep};
//!
//! # tokio_test::block_on(async {
//! let config = TestConfig::new("search", "Search", "smoke")
//!     .step(WorkflowStep::new("navigate").param("url", "/tests/basic-nav"))
//!     .step(WorkflowStep::new("fill").param("selector", "#q").param("value", "rust"))
//!     .step(WorkflowStep::new("click").param("selector", "#go"))
//!     .outcome(ExpectedOutcome::succeeds().tool_calls(2, 5));
//!
//! let store = Arc::new(MemoryStore::new());
//! let outcome = Engine::new().with_store(store.clone()).run(&config).await;
//!
//! assert_eq!(outcome.status(), TrajectoryStatus::Completed);
//! assert_eq!(outcome.evaluation.score, 100);
//! assert_eq!(store.test_results().len(), 1);
//! # });
//! ```

pub mod catalog;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod settings;
pub mod stats;
pub mod step;
pub mod store;
pub mod trajectory;

pub use catalog::TestCatalog;
pub use config::{ExpectedOutcome, TestConfig, ValidationRule, WorkflowStep, LOOP_ACTION};
pub use context::ExecutionContext;
pub use engine::{Engine, RunOutcome};
pub use error::{Error, Result};
pub use evaluator::{evaluate, Evaluation, EvaluationMetrics, ScoreBreakdown, PASS_THRESHOLD};
pub use events::{TraceEntry, WorkflowEvent};
pub use settings::StoreSettings;
pub use stats::{filter_results, ActivitySummary, ResultSummary};
pub use trajectory::{ActionRecord, ActionResult, TestTrajectory, TrajectoryStatus};

// Re-export step and store types
pub use step::{Dispatch, LambdaHandler, StepHandler, StepOutcome};
pub use store::{
    ActivityLogRow, ActivityQuery, ActivityType, MemoryStore, PersistenceFailure,
    PersistenceTarget, ResultStore, SupabaseStore, TestResultQuery, TestResultRow,
    TestResultStatus,
};

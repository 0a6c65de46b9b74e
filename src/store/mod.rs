//! Result persistence.
//!
//! Runs are written to two append-only tables: one row per finished test
//! (`test_results`) and one row per logged site interaction
//! (`reddit_activity_logs`). [`ResultStore`] abstracts the datastore;
//! [`SupabaseStore`] talks to a hosted PostgREST endpoint and
//! [`MemoryStore`] keeps rows in process.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::{TestConfig, WorkflowStep};
use crate::evaluator::{Evaluation, EvaluationMetrics};
use crate::trajectory::{ActionRecord, ActionResult, TestTrajectory, TrajectoryStatus};
use crate::Result;

pub mod memory;
pub mod supabase;

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

/// Default page size for test result reads.
pub const DEFAULT_RESULT_LIMIT: usize = 50;
/// Default page size for activity log reads.
pub const DEFAULT_ACTIVITY_LIMIT: usize = 100;

/// Server-assigned row identifier. Tables may use integer or uuid keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    /// Integer primary key.
    Int(i64),
    /// Text (uuid) primary key.
    Text(String),
}

/// Stored status of a test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestResultStatus {
    /// The trajectory completed.
    Success,
    /// The trajectory did not complete.
    Failure,
    /// The run faulted.
    Error,
}

impl From<TrajectoryStatus> for TestResultStatus {
    // Only a completed run counts as success; failed, errored and
    // unfinished runs are all stored as failures.
    fn from(status: TrajectoryStatus) -> Self {
        match status {
            TrajectoryStatus::Completed => TestResultStatus::Success,
            _ => TestResultStatus::Failure,
        }
    }
}

/// A row of the `test_results` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResultRow {
    /// Server-assigned id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RowId>,
    /// Id of the config that ran.
    pub test_id: String,
    /// Config display name.
    pub test_name: String,
    /// Config category.
    pub category: String,
    /// Run status.
    pub status: TestResultStatus,
    /// Total run duration.
    pub duration_ms: u64,
    /// The recorded trajectory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ActionRecord>>,
    /// The expected workflow that was run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<Vec<WorkflowStep>>,
    /// Evaluation metrics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<EvaluationMetrics>,
    /// Server-assigned creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl TestResultRow {
    /// Build the row written at the end of a run.
    pub fn from_run(config: &TestConfig, trajectory: &TestTrajectory, evaluation: &Evaluation) -> Self {
        Self {
            id: None,
            test_id: config.id.clone(),
            test_name: config.name.clone(),
            category: config.category.clone(),
            status: trajectory.status.into(),
            duration_ms: trajectory.total_duration.unwrap_or(0),
            tool_calls: Some(trajectory.actions.clone()),
            workflow: Some(config.expected_workflow.clone()),
            metrics: Some(evaluation.metrics.clone()),
            created_at: None,
        }
    }
}

/// Kind of logged site interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    /// A post was opened.
    View,
    /// A comment was written.
    Comment,
    /// A comment was submitted.
    Submit,
    /// The site refused a submission because of its cooldown.
    RateLimited,
}

impl ActivityType {
    /// Wire name of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::View => "view",
            ActivityType::Comment => "comment",
            ActivityType::Submit => "submit",
            ActivityType::RateLimited => "rate_limited",
        }
    }

    /// The activity type logged for an action tag, if any.
    ///
    /// Only `comment` and `submit` actions are logged.
    pub fn for_action(action: &str) -> Option<Self> {
        match action {
            "comment" => Some(ActivityType::Comment),
            "submit" => Some(ActivityType::Submit),
            _ => None,
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored outcome of a site interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    /// The interaction went through.
    Success,
    /// The interaction hit the cooldown.
    RateLimited,
    /// The interaction faulted.
    Error,
}

impl From<ActionResult> for ActivityStatus {
    fn from(result: ActionResult) -> Self {
        match result {
            ActionResult::Success => ActivityStatus::Success,
            ActionResult::Failure | ActionResult::Error => ActivityStatus::Error,
        }
    }
}

/// A row of the `reddit_activity_logs` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogRow {
    /// Server-assigned id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RowId>,
    /// Post the interaction targeted.
    pub post_id: String,
    /// Interaction kind.
    pub action_type: ActivityType,
    /// Comment body, for comment and submit actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_text: Option<String>,
    /// Interaction outcome.
    pub status: ActivityStatus,
    /// Free-form details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Server-assigned creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ActivityLogRow {
    /// Build the activity row for a recorded action, if its tag is logged.
    ///
    /// The post id comes from `params.postId` (`"unknown"` when absent) and
    /// the comment text from `params.value`, falling back to `params.text`.
    pub fn for_record(record: &ActionRecord) -> Option<Self> {
        let action_type = ActivityType::for_action(&record.action)?;
        let post_id = match record.params.get("postId") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => "unknown".to_string(),
        };
        let comment_text = ["value", "text"]
            .iter()
            .find_map(|key| record.params.get(*key).and_then(Value::as_str))
            .map(str::to_string);
        Some(Self {
            id: None,
            post_id,
            action_type,
            comment_text,
            status: record.result.into(),
            metadata: Some(json!({ "step": record.step, "params": record.params })),
            created_at: None,
        })
    }
}

/// Read parameters for [`ResultStore::recent_test_results`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResultQuery {
    /// Maximum rows to return.
    pub limit: usize,
    /// Only rows in this category.
    pub category: Option<String>,
}

impl Default for TestResultQuery {
    fn default() -> Self {
        Self::recent(DEFAULT_RESULT_LIMIT)
    }
}

impl TestResultQuery {
    /// The most recent `limit` results.
    pub fn recent(limit: usize) -> Self {
        Self {
            limit,
            category: None,
        }
    }

    /// Restrict to one category.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Returns `true` if `row` passes the filters.
    pub fn matches(&self, row: &TestResultRow) -> bool {
        self.category.as_ref().map_or(true, |c| &row.category == c)
    }
}

/// Read parameters for [`ResultStore::recent_activity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityQuery {
    /// Maximum rows to return; `None` reads every matching row.
    pub limit: Option<usize>,
    /// Only rows of this type.
    pub action_type: Option<ActivityType>,
    /// Only rows for this post.
    pub post_id: Option<String>,
}

impl Default for ActivityQuery {
    fn default() -> Self {
        Self::recent(DEFAULT_ACTIVITY_LIMIT)
    }
}

impl ActivityQuery {
    /// The most recent `limit` activity rows.
    pub fn recent(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            action_type: None,
            post_id: None,
        }
    }

    /// Every activity row for one post, newest first, with no row cap.
    pub fn for_post(post_id: impl Into<String>) -> Self {
        Self {
            limit: None,
            action_type: None,
            post_id: Some(post_id.into()),
        }
    }

    /// Restrict to one action type.
    pub fn action_type(mut self, action_type: ActivityType) -> Self {
        self.action_type = Some(action_type);
        self
    }

    /// Restrict to one post, keeping the current limit.
    pub fn post(mut self, post_id: impl Into<String>) -> Self {
        self.post_id = Some(post_id.into());
        self
    }

    /// Returns `true` if `row` passes the filters.
    pub fn matches(&self, row: &ActivityLogRow) -> bool {
        self.action_type.map_or(true, |t| row.action_type == t)
            && self.post_id.as_ref().map_or(true, |p| &row.post_id == p)
    }
}

/// The table a failed write was meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceTarget {
    /// `test_results`.
    TestResult,
    /// `reddit_activity_logs`.
    ActivityLog,
}

/// A write that failed and was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceFailure {
    /// Which table the write was meant for.
    pub target: PersistenceTarget,
    /// Error message.
    pub message: String,
}

/// Append-only storage for test results and activity logs.
///
/// Reads return the newest rows first.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Insert a test result and return the stored row.
    async fn insert_test_result(&self, row: &TestResultRow) -> Result<TestResultRow>;

    /// Insert an activity log row and return the stored row.
    async fn insert_activity(&self, row: &ActivityLogRow) -> Result<ActivityLogRow>;

    /// Fetch the most recent test results matching `query`.
    async fn recent_test_results(&self, query: &TestResultQuery) -> Result<Vec<TestResultRow>>;

    /// Fetch the most recent activity rows matching `query`.
    async fn recent_activity(&self, query: &ActivityQuery) -> Result<Vec<ActivityLogRow>>;
}

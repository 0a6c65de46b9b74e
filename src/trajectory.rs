//! Trajectory recording.
//!
//! A [`TestTrajectory`] is the append-only log of what actually ran during a
//! single test run. Records are numbered at append time and never change
//! afterwards; the trajectory itself is finalized exactly once.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Current wall-clock time as Unix epoch milliseconds.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Outcome of one recorded action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionResult {
    /// The action completed.
    Success,
    /// The action ran but did not achieve its goal.
    Failure,
    /// The action raised a fault.
    Error,
}

/// One entry in a trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// 1-based position in the trajectory.
    pub step: usize,
    /// Action tag.
    pub action: String,
    /// Snapshot of the step parameters.
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Unix epoch milliseconds at append time.
    pub timestamp: i64,
    /// Outcome.
    pub result: ActionResult,
    /// Fault message for `error` records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Milliseconds elapsed since the trajectory started.
    pub duration: u64,
}

/// Lifecycle state of a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrajectoryStatus {
    /// Steps are still executing.
    Running,
    /// Every top-level step succeeded.
    Completed,
    /// A top-level step failed and the rest were skipped.
    Failed,
    /// The run itself faulted.
    Error,
}

impl TrajectoryStatus {
    /// Returns `true` for `completed`, `failed` and `error`.
    pub fn is_terminal(self) -> bool {
        !matches!(self, TrajectoryStatus::Running)
    }

    /// Lowercase name, as stored.
    pub fn as_str(self) -> &'static str {
        match self {
            TrajectoryStatus::Running => "running",
            TrajectoryStatus::Completed => "completed",
            TrajectoryStatus::Failed => "failed",
            TrajectoryStatus::Error => "error",
        }
    }
}

impl fmt::Display for TrajectoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The recorded log of one test run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestTrajectory {
    /// Id of the config that was run.
    pub test_id: String,
    /// Recorded actions in append order.
    pub actions: Vec<ActionRecord>,
    /// Unix epoch milliseconds when the run started.
    pub start_time: i64,
    /// Unix epoch milliseconds when the run was finalized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    /// `end_time - start_time`, set on finalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,
    /// Lifecycle state.
    pub status: TrajectoryStatus,
}

impl TestTrajectory {
    /// Start a trajectory now.
    pub fn begin(test_id: impl Into<String>) -> Self {
        Self::begin_at(test_id, now_millis())
    }

    /// Start a trajectory at an explicit time.
    pub fn begin_at(test_id: impl Into<String>, start_time: i64) -> Self {
        Self {
            test_id: test_id.into(),
            actions: Vec::new(),
            start_time,
            end_time: None,
            total_duration: None,
            status: TrajectoryStatus::Running,
        }
    }

    /// Append a record, numbering it after the existing ones.
    pub fn push(
        &mut self,
        action: impl Into<String>,
        params: Map<String, Value>,
        result: ActionResult,
        error: Option<String>,
    ) -> &ActionRecord {
        let timestamp = now_millis();
        let record = ActionRecord {
            step: self.actions.len() + 1,
            action: action.into(),
            params,
            timestamp,
            result,
            error,
            duration: elapsed(self.start_time, timestamp),
        };
        self.actions.push(record);
        &self.actions[self.actions.len() - 1]
    }

    /// Move from `running` to a terminal status.
    pub fn transition(&mut self, to: TrajectoryStatus) -> Result<()> {
        if self.status.is_terminal() || !to.is_terminal() {
            return Err(Error::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Stamp the end time now and compute the total duration.
    pub fn finalize(&mut self) -> Result<()> {
        self.finalize_at(now_millis())
    }

    /// Stamp an explicit end time and compute the total duration.
    ///
    /// An end time earlier than the start is clamped to the start, so the
    /// duration is never negative and always equals `end - start`.
    pub fn finalize_at(&mut self, end_time: i64) -> Result<()> {
        if self.end_time.is_some() {
            return Err(Error::Message(format!(
                "trajectory for '{}' is already finalized",
                self.test_id
            )));
        }
        let end_time = end_time.max(self.start_time);
        self.end_time = Some(end_time);
        self.total_duration = Some(elapsed(self.start_time, end_time));
        Ok(())
    }

    /// Returns `true` once an end time has been stamped.
    pub fn is_finalized(&self) -> bool {
        self.end_time.is_some()
    }

    /// Number of recorded actions.
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Number of records whose result is `success`.
    pub fn successful_actions(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| a.result == ActionResult::Success)
            .count()
    }
}

fn elapsed(start: i64, end: i64) -> u64 {
    u64::try_from(end.saturating_sub(start)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_are_numbered_in_order() {
        let mut t = TestTrajectory::begin("t");
        t.push("navigate", Map::new(), ActionResult::Success, None);
        t.push("click", Map::new(), ActionResult::Success, None);
        let last = t.push("fill", Map::new(), ActionResult::Error, Some("boom".into()));
        assert_eq!(last.step, 3);
        let steps: Vec<_> = t.actions.iter().map(|a| a.step).collect();
        assert_eq!(steps, vec![1, 2, 3]);
        assert_eq!(t.successful_actions(), 2);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut t = TestTrajectory::begin("t");
        t.transition(TrajectoryStatus::Failed).unwrap();
        let err = t.transition(TrajectoryStatus::Completed).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition {
                from: TrajectoryStatus::Failed,
                to: TrajectoryStatus::Completed
            }
        ));
        assert_eq!(t.status, TrajectoryStatus::Failed);
    }

    #[test]
    fn test_cannot_return_to_running() {
        let mut t = TestTrajectory::begin("t");
        assert!(t.transition(TrajectoryStatus::Running).is_err());
    }

    #[test]
    fn test_finalize_computes_duration_once() {
        let mut t = TestTrajectory::begin_at("t", 1_000);
        t.finalize_at(1_250).unwrap();
        assert_eq!(t.end_time, Some(1_250));
        assert_eq!(t.total_duration, Some(250));
        assert!(t.finalize_at(2_000).is_err());
        assert_eq!(t.total_duration, Some(250));
    }

    #[test]
    fn test_finalize_clamps_clock_skew() {
        let mut t = TestTrajectory::begin_at("t", 5_000);
        t.finalize_at(4_000).unwrap();
        assert_eq!(t.end_time, Some(5_000));
        assert_eq!(t.total_duration, Some(0));
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut t = TestTrajectory::begin_at("t", 10);
        t.finalize_at(20).unwrap();
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["testId"], "t");
        assert_eq!(json["totalDuration"], 10);
        assert_eq!(json["status"], "running");
    }
}

//! Scoring of finished trajectories.
//!
//! The score is additive over three fixed buckets:
//!
//! | Criterion | Points |
//! |---|---|
//! | trajectory completed | 40 |
//! | duration within `maxDuration` (or no bound) | 30 |
//! | action count within `[minToolCalls, maxToolCalls]` (or no bound) | 30 |
//!
//! A run passes at 70 points. Validation rules are visited but never scored.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TestConfig;
use crate::trajectory::{TestTrajectory, TrajectoryStatus};

/// Points for a completed trajectory.
pub const COMPLETION_POINTS: u32 = 40;
/// Points for meeting the duration bound.
pub const DURATION_POINTS: u32 = 30;
/// Points for meeting the tool-call bounds.
pub const TOOL_CALL_POINTS: u32 = 30;
/// Minimum score that counts as a pass.
pub const PASS_THRESHOLD: u32 = 70;

/// Per-bucket points behind a score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// 0 or [`COMPLETION_POINTS`].
    pub completion: u32,
    /// 0 or [`DURATION_POINTS`].
    pub duration: u32,
    /// 0 or [`TOOL_CALL_POINTS`].
    pub tool_calls: u32,
}

impl ScoreBreakdown {
    /// Sum of the buckets.
    pub fn total(&self) -> u32 {
        self.completion + self.duration + self.tool_calls
    }
}

/// Summary figures stored alongside a test result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationMetrics {
    /// Records whose result is `success`.
    pub completed_steps: usize,
    /// Number of recorded actions.
    ///
    /// This counts trajectory records, not configured workflow steps, so it
    /// includes loop iterations and stops short when a run aborts early.
    pub total_steps: usize,
    /// Total run duration in milliseconds.
    #[serde(default)]
    pub duration: Option<u64>,
    /// `completed_steps / total_steps * 100`, or 0 when nothing was recorded.
    pub success_rate: f64,
}

impl EvaluationMetrics {
    /// Compute the metrics of a trajectory.
    pub fn from_trajectory(trajectory: &TestTrajectory) -> Self {
        let completed_steps = trajectory.successful_actions();
        let total_steps = trajectory.action_count();
        let success_rate = if total_steps == 0 {
            0.0
        } else {
            completed_steps as f64 / total_steps as f64 * 100.0
        };
        Self {
            completed_steps,
            total_steps,
            duration: trajectory.total_duration,
            success_rate,
        }
    }
}

/// The verdict for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Score between 0 and 100.
    pub score: u32,
    /// `score >= PASS_THRESHOLD`.
    pub passed: bool,
    /// Points per criterion.
    pub breakdown: ScoreBreakdown,
    /// Summary figures.
    pub metrics: EvaluationMetrics,
    /// Validation rules that were present but contributed nothing.
    pub unscored_rules: usize,
}

/// Score a finalized trajectory against its config.
///
/// A zero or absent `maxDuration` means no duration bound. The tool-call
/// bound only applies when both `minToolCalls` and `maxToolCalls` are set
/// and non-zero.
///
/// # Example
///
/// ```rust
/// use agent_eval_harness::{evaluate, TestConfig, TestTrajectory, TrajectoryStatus, WorkflowStep};
///
/// let config = TestConfig::new("demo", "Demo", "unit").step(WorkflowStep::new("click"));
/// let mut trajectory = TestTrajectory::begin_at("demo", 0);
/// trajectory.transition(TrajectoryStatus::Completed).unwrap();
/// trajectory.finalize_at(5).unwrap();
///
/// let evaluation = evaluate(&config, &trajectory);
/// assert_eq!(evaluation.score, 100);
/// assert!(evaluation.passed);
/// ```
pub fn evaluate(config: &TestConfig, trajectory: &TestTrajectory) -> Evaluation {
    let expected = &config.expected_outcome;
    let mut breakdown = ScoreBreakdown::default();

    if trajectory.status == TrajectoryStatus::Completed {
        breakdown.completion = COMPLETION_POINTS;
    }

    let duration_ok = match (expected.max_duration.filter(|m| *m > 0), trajectory.total_duration) {
        (Some(max), Some(actual)) if actual > 0 => actual <= max,
        _ => true,
    };
    if duration_ok {
        breakdown.duration = DURATION_POINTS;
    }

    let calls = trajectory.action_count();
    let bounds = (
        expected.min_tool_calls.filter(|m| *m > 0),
        expected.max_tool_calls.filter(|m| *m > 0),
    );
    let calls_ok = match bounds {
        (Some(min), Some(max)) => (min..=max).contains(&calls),
        _ => true,
    };
    if calls_ok {
        breakdown.tool_calls = TOOL_CALL_POINTS;
    }

    for rule in &config.validation_rules {
        debug!(
            test_id = %config.id,
            field = %rule.field,
            validator = %rule.validator,
            "validation rule not scored"
        );
    }

    let score = breakdown.total();
    Evaluation {
        score,
        passed: score >= PASS_THRESHOLD,
        breakdown,
        metrics: EvaluationMetrics::from_trajectory(trajectory),
        unscored_rules: config.validation_rules.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExpectedOutcome, ValidationRule, WorkflowStep};
    use crate::trajectory::ActionResult;
    use serde_json::{json, Map};

    fn config(outcome: ExpectedOutcome) -> TestConfig {
        TestConfig::new("t", "T", "unit")
            .step(WorkflowStep::new("click"))
            .outcome(outcome)
    }

    fn trajectory(status: TrajectoryStatus, actions: usize, duration: u64) -> TestTrajectory {
        let mut t = TestTrajectory::begin_at("t", 0);
        for _ in 0..actions {
            t.push("click", Map::new(), ActionResult::Success, None);
        }
        if status.is_terminal() {
            t.transition(status).unwrap();
        }
        t.finalize_at(duration as i64).unwrap();
        t
    }

    #[test]
    fn test_all_buckets_without_constraints() {
        let e = evaluate(&config(ExpectedOutcome::succeeds()), &trajectory(TrajectoryStatus::Completed, 4, 30));
        assert_eq!(e.score, 100);
        assert!(e.passed);
        assert_eq!(e.metrics.total_steps, 4);
        assert_eq!(e.metrics.success_rate, 100.0);
    }

    #[test]
    fn test_duration_overrun_is_boundary_pass() {
        let c = config(ExpectedOutcome::succeeds().max_duration(100));
        let e = evaluate(&c, &trajectory(TrajectoryStatus::Completed, 4, 150));
        assert_eq!(e.score, 70);
        assert_eq!(e.breakdown.duration, 0);
        assert!(e.passed);
    }

    #[test]
    fn test_duration_exactly_at_bound_scores() {
        let c = config(ExpectedOutcome::succeeds().max_duration(100));
        let e = evaluate(&c, &trajectory(TrajectoryStatus::Completed, 1, 100));
        assert_eq!(e.breakdown.duration, DURATION_POINTS);
    }

    #[test]
    fn test_zero_max_duration_is_unbounded() {
        let c = config(ExpectedOutcome::succeeds().max_duration(0));
        let e = evaluate(&c, &trajectory(TrajectoryStatus::Completed, 1, 999));
        assert_eq!(e.breakdown.duration, DURATION_POINTS);
    }

    #[test]
    fn test_tool_call_bounds_are_inclusive() {
        let c = config(ExpectedOutcome::succeeds().tool_calls(2, 3));
        for (calls, points) in [(1, 0), (2, 30), (3, 30), (4, 0)] {
            let e = evaluate(&c, &trajectory(TrajectoryStatus::Completed, calls, 1));
            assert_eq!(e.breakdown.tool_calls, points, "calls = {calls}");
        }
    }

    #[test]
    fn test_single_tool_call_bound_is_ignored() {
        let mut outcome = ExpectedOutcome::succeeds();
        outcome.max_tool_calls = Some(1);
        let e = evaluate(&config(outcome), &trajectory(TrajectoryStatus::Completed, 5, 1));
        assert_eq!(e.breakdown.tool_calls, TOOL_CALL_POINTS);
    }

    #[test]
    fn test_failed_run_below_threshold() {
        let c = config(ExpectedOutcome::succeeds().tool_calls(5, 10).max_duration(10));
        let e = evaluate(&c, &trajectory(TrajectoryStatus::Failed, 2, 50));
        assert_eq!(e.score, 0);
        assert!(!e.passed);

        let e = evaluate(&c, &trajectory(TrajectoryStatus::Failed, 2, 5));
        assert_eq!(e.score, 30);
        assert!(!e.passed);
    }

    #[test]
    fn test_failed_run_without_constraints_scores_sixty() {
        let e = evaluate(&config(ExpectedOutcome::succeeds()), &trajectory(TrajectoryStatus::Failed, 1, 5));
        assert_eq!(e.score, 60);
        assert!(!e.passed);
    }

    #[test]
    fn test_score_is_always_a_bucket_combination() {
        let c = config(ExpectedOutcome::succeeds().tool_calls(2, 3).max_duration(10));
        for status in [TrajectoryStatus::Completed, TrajectoryStatus::Failed, TrajectoryStatus::Error] {
            for calls in 0..5 {
                for duration in [0, 5, 10, 11] {
                    let e = evaluate(&c, &trajectory(status, calls, duration));
                    assert!([0, 30, 40, 60, 70, 100].contains(&e.score));
                    assert_eq!(e.passed, e.score >= PASS_THRESHOLD);
                }
            }
        }
    }

    #[test]
    fn test_success_rate_is_zero_without_actions() {
        let e = evaluate(&config(ExpectedOutcome::succeeds()), &trajectory(TrajectoryStatus::Error, 0, 0));
        assert_eq!(e.metrics.total_steps, 0);
        assert_eq!(e.metrics.success_rate, 0.0);
        assert!(!e.metrics.success_rate.is_nan());
    }

    #[test]
    fn test_validation_rules_add_nothing() {
        let c = config(ExpectedOutcome::succeeds()).rule(ValidationRule {
            rule_type: "custom".to_string(),
            field: "comments_posted".to_string(),
            validator: "greaterThanOrEqual".to_string(),
            value: json!(2),
            description: "At least 2 comments posted".to_string(),
        });
        let e = evaluate(&c, &trajectory(TrajectoryStatus::Completed, 1, 1));
        assert_eq!(e.score, 100);
        assert_eq!(e.unscored_rules, 1);
    }

    #[test]
    fn test_total_steps_counts_records_not_workflow_steps() {
        let c = TestConfig::new("t", "T", "unit")
            .step(WorkflowStep::new("click"))
            .step(WorkflowStep::new("click"))
            .step(WorkflowStep::new("click"));
        let mut t = TestTrajectory::begin_at("t", 0);
        t.push("click", Map::new(), ActionResult::Success, None);
        t.push("click", Map::new(), ActionResult::Error, Some("boom".to_string()));
        t.transition(TrajectoryStatus::Failed).unwrap();
        t.finalize_at(1).unwrap();
        let e = evaluate(&c, &t);
        assert_eq!(e.metrics.total_steps, 2);
        assert_eq!(e.metrics.completed_steps, 1);
        assert_eq!(e.metrics.success_rate, 50.0);
    }

    #[test]
    fn test_metrics_serialize_camel_case() {
        let json = serde_json::to_value(EvaluationMetrics::default()).unwrap();
        assert!(json.get("completedSteps").is_some());
        assert!(json.get("successRate").is_some());
    }
}

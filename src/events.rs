//! Structured run events for tracing and observability.
//!
//! Every [`ExecutionContext`](crate::ExecutionContext) keeps a log of the
//! events below. Unlike the `tracing` output, the log is returned to the
//! caller as part of the [`RunOutcome`](crate::RunOutcome), so persistence
//! failures and step faults can be inspected programmatically.

use serde::{Deserialize, Serialize};

use crate::store::PersistenceTarget;
use crate::trajectory::{now_millis, ActionResult, TrajectoryStatus};

/// Events that can be emitted during a test run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum WorkflowEvent {
    /// A run has started.
    RunStarted {
        /// Id of the config being run.
        test_id: String,
        /// Number of top-level steps in the workflow.
        total_steps: usize,
    },
    /// A top-level step is about to be dispatched.
    StepStarted {
        /// 1-based index among the top-level steps.
        index: usize,
        /// Number of top-level steps.
        total: usize,
        /// Action tag of the step.
        action: String,
    },
    /// An action record was appended to the trajectory.
    ActionRecorded {
        /// Step number assigned to the record.
        step: usize,
        /// Action tag.
        action: String,
        /// Recorded outcome.
        result: ActionResult,
    },
    /// A step handler raised a fault.
    StepFailed {
        /// Action tag of the failing step.
        action: String,
        /// Fault message.
        message: String,
    },
    /// The run itself faulted outside any step handler's error path.
    RunFaulted {
        /// Fault message.
        message: String,
    },
    /// A write to the datastore failed and was skipped.
    PersistenceFailed {
        /// Which table the write was meant for.
        target: PersistenceTarget,
        /// Error message.
        message: String,
    },
    /// The run has been finalized.
    RunFinished {
        /// Final status.
        status: TrajectoryStatus,
        /// Total duration in milliseconds.
        total_duration: u64,
    },
}

/// A timestamped trace entry containing a workflow event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Unix epoch timestamp in milliseconds when this event occurred.
    pub timestamp: i64,
    /// The recorded event.
    #[serde(flatten)]
    pub event: WorkflowEvent,
}

impl TraceEntry {
    /// Create a new trace entry with the current timestamp.
    #[must_use]
    pub fn new(event: WorkflowEvent) -> Self {
        Self {
            timestamp: now_millis(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_entry_serialization() {
        let entry = TraceEntry::new(WorkflowEvent::StepStarted {
            index: 1,
            total: 4,
            action: "navigate".to_string(),
        });

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"type\":\"StepStarted\""));
        assert!(json.contains("\"action\":\"navigate\""));
        assert!(json.contains("\"timestamp\":"));
    }

    #[test]
    fn test_persistence_event() {
        let event = WorkflowEvent::PersistenceFailed {
            target: PersistenceTarget::ActivityLog,
            message: "connection refused".to_string(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PersistenceFailed");
        assert_eq!(json["payload"]["target"], "activity_log");
    }
}

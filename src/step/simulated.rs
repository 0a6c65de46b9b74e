//! Record-only handlers for page interactions.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{Dispatch, StepHandler};
use crate::config::WorkflowStep;
use crate::trajectory::ActionResult;
use crate::{ExecutionContext, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Plain,
    Navigate,
    ExtractData,
}

/// Records the action as a success and returns canned data.
///
/// Used for `navigate`, `click`, `fill`, `extract_data` and as the fallback
/// for unknown action tags.
#[derive(Debug, Clone)]
pub struct SimulatedAction {
    kind: Kind,
}

impl SimulatedAction {
    /// Records and returns no data (`click`, `fill`, unknown tags).
    pub fn plain() -> Self {
        Self { kind: Kind::Plain }
    }

    /// Records and returns `{url}` from the step parameters.
    pub fn navigate() -> Self {
        Self {
            kind: Kind::Navigate,
        }
    }

    /// Records and returns `{extracted: true}`.
    pub fn extract_data() -> Self {
        Self {
            kind: Kind::ExtractData,
        }
    }
}

#[async_trait]
impl StepHandler for SimulatedAction {
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        step: &WorkflowStep,
        _dispatch: &dyn Dispatch,
    ) -> Result<Option<Value>> {
        ctx.record_action(&step.action, &step.params, ActionResult::Success, None)
            .await;
        Ok(match self.kind {
            Kind::Plain => None,
            Kind::Navigate => Some(json!({
                "url": step.params.get("url").cloned().unwrap_or(Value::Null)
            })),
            Kind::ExtractData => Some(json!({ "extracted": true })),
        })
    }

    fn name(&self) -> &str {
        match self.kind {
            Kind::Plain => "simulated",
            Kind::Navigate => "navigate",
            Kind::ExtractData => "extract_data",
        }
    }
}

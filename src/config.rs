//! Test configuration data model.
//!
//! A [`TestConfig`] describes one scripted scenario: the ordered
//! [`WorkflowStep`]s an agent is expected to perform, the thresholds the run
//! is judged against ([`ExpectedOutcome`]) and a list of [`ValidationRule`]s.
//! Configs are plain data; they deserialize from the same JSON shape the
//! dashboard stores in the `workflow` column.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Action tag of the bounded-repetition step.
pub const LOOP_ACTION: &str = "loop_elements";

/// One instruction in a workflow.
///
/// Loop steps (`loop_elements`) own a private `loop_actions` sub-sequence that
/// the engine runs once per iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Action tag used for dispatch (`navigate`, `click`, `wait`, ...).
    pub action: String,
    /// Free-form parameters handed to the handler.
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Identifier of the node in the agent's workflow graph.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// Short human-readable label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Longer description of what the step is meant to exercise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Nested steps executed per iteration of a loop step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_actions: Option<Vec<WorkflowStep>>,
}

impl WorkflowStep {
    /// Create a step with the given action tag and no parameters.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            params: Map::new(),
            node_id: None,
            label: None,
            description: None,
            loop_actions: None,
        }
    }

    /// Add a parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Set the graph node identifier.
    pub fn node_id(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    /// Set the label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach the nested sequence of a loop step.
    pub fn loop_actions(mut self, steps: Vec<WorkflowStep>) -> Self {
        self.loop_actions = Some(steps);
        self
    }

    /// Returns `true` if this is a `loop_elements` step.
    pub fn is_loop(&self) -> bool {
        self.action == LOOP_ACTION
    }

    /// Read a parameter as a number.
    ///
    /// Accepts JSON numbers and strings holding a number (`"500"`); anything
    /// else yields `None`.
    pub fn param_f64(&self, key: &str) -> Option<f64> {
        let value = match self.params.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        value.filter(|f| f.is_finite())
    }

    /// Read a parameter as a non-negative integer.
    ///
    /// Numeric strings are parsed and fractions truncated; negatives and
    /// non-numeric values yield `None`.
    pub fn param_u64(&self, key: &str) -> Option<u64> {
        self.param_f64(key).filter(|f| *f >= 0.0).map(|f| f as u64)
    }

    /// Read a parameter as a string slice.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

/// A validation rule attached to a test.
///
/// Rules are carried through to reports but are not scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    /// Rule family, e.g. `custom`.
    #[serde(rename = "type")]
    pub rule_type: String,
    /// Path of the observed field, e.g. `loop.iterations`.
    pub field: String,
    /// Comparison name, e.g. `equals`.
    pub validator: String,
    /// Value to compare against.
    pub value: Value,
    /// Human-readable description.
    pub description: String,
}

/// Thresholds a run is judged against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedOutcome {
    /// Whether the workflow is expected to finish.
    pub success: bool,
    /// Lower bound on recorded actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_tool_calls: Option<usize>,
    /// Upper bound on recorded actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tool_calls: Option<usize>,
    /// Upper bound on total run duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<u64>,
}

impl ExpectedOutcome {
    /// An outcome that only expects success, with no bounds.
    pub fn succeeds() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// Bound the number of recorded actions.
    pub fn tool_calls(mut self, min: usize, max: usize) -> Self {
        self.min_tool_calls = Some(min);
        self.max_tool_calls = Some(max);
        self
    }

    /// Bound the total duration in milliseconds.
    pub fn max_duration(mut self, ms: u64) -> Self {
        self.max_duration = Some(ms);
        self
    }
}

/// A named, immutable test scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestConfig {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Grouping used by dashboards and queries.
    pub category: String,
    /// What the test exercises.
    #[serde(default)]
    pub description: String,
    /// The instruction an agent would receive in natural language.
    #[serde(default)]
    pub user_intent: String,
    /// Mock-site page the workflow starts from.
    #[serde(default)]
    pub test_page_url: String,
    /// Ordered steps the agent is expected to take.
    pub expected_workflow: Vec<WorkflowStep>,
    /// Scoring thresholds.
    pub expected_outcome: ExpectedOutcome,
    /// Validation rules, reported but not scored.
    #[serde(default)]
    pub validation_rules: Vec<ValidationRule>,
    /// Free-form priority label (`high`, `medium`, `low`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Suggested overall timeout in milliseconds. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Tags used for catalog lookups.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TestConfig {
    /// Start a config with the identifying fields and an empty workflow.
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            description: String::new(),
            user_intent: String::new(),
            test_page_url: String::new(),
            expected_workflow: Vec::new(),
            expected_outcome: ExpectedOutcome::succeeds(),
            validation_rules: Vec::new(),
            priority: None,
            timeout: None,
            tags: Vec::new(),
        }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the user intent.
    pub fn user_intent(mut self, intent: impl Into<String>) -> Self {
        self.user_intent = intent.into();
        self
    }

    /// Set the starting page.
    pub fn page(mut self, url: impl Into<String>) -> Self {
        self.test_page_url = url.into();
        self
    }

    /// Append one step to the workflow.
    pub fn step(mut self, step: WorkflowStep) -> Self {
        self.expected_workflow.push(step);
        self
    }

    /// Replace the expected outcome.
    pub fn outcome(mut self, outcome: ExpectedOutcome) -> Self {
        self.expected_outcome = outcome;
        self
    }

    /// Append a validation rule.
    pub fn rule(mut self, rule: ValidationRule) -> Self {
        self.validation_rules.push(rule);
        self
    }

    /// Set the priority label.
    pub fn priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    /// Set the informational timeout.
    pub fn timeout(mut self, ms: u64) -> Self {
        self.timeout = Some(ms);
        self
    }

    /// Replace the tag list.
    pub fn tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Returns `true` if the config carries `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Catalog-level sanity check: a non-empty id and a non-empty action
    /// tag on every step, including loop bodies.
    ///
    /// The engine does not call this; it runs whatever workflow it is given.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::Validation("test id must not be empty".to_string()));
        }
        for (i, step) in self.expected_workflow.iter().enumerate() {
            validate_step(&self.id, i + 1, step)?;
        }
        Ok(())
    }
}

fn validate_step(test_id: &str, index: usize, step: &WorkflowStep) -> Result<()> {
    if step.action.trim().is_empty() {
        return Err(Error::Validation(format!(
            "test '{test_id}' step {index} has an empty action"
        )));
    }
    for (j, inner) in step.loop_actions.iter().flatten().enumerate() {
        validate_step(test_id, j + 1, inner)?;
    }
    Ok(())
}

//! The catalog of runnable test configurations.
//!
//! [`TestCatalog::showcase`] builds the ten built-in scenarios that exercise
//! the mock site. Catalogs can also be loaded from JSON so that suites can
//! live outside the binary.

use std::collections::HashSet;

use serde_json::json;

use crate::config::{ExpectedOutcome, TestConfig, ValidationRule, WorkflowStep, LOOP_ACTION};
use crate::{Error, Result};

/// An immutable, validated set of test configs with unique ids.
#[derive(Debug, Clone)]
pub struct TestCatalog {
    configs: Vec<TestConfig>,
}

impl TestCatalog {
    /// Build a catalog, validating every config and rejecting duplicate ids.
    pub fn new(configs: Vec<TestConfig>) -> Result<Self> {
        let mut seen = HashSet::new();
        for config in &configs {
            config.validate()?;
            if !seen.insert(config.id.as_str()) {
                return Err(Error::Validation(format!(
                    "duplicate test id '{}'",
                    config.id
                )));
            }
        }
        Ok(Self { configs })
    }

    /// Parse a JSON array of configs.
    pub fn from_json(raw: &str) -> Result<Self> {
        let configs: Vec<TestConfig> = serde_json::from_str(raw)?;
        Self::new(configs)
    }

    /// The built-in showcase suite.
    pub fn showcase() -> Self {
        Self {
            configs: showcase_configs(),
        }
    }

    /// Look a config up by id.
    pub fn get(&self, id: &str) -> Option<&TestConfig> {
        self.configs.iter().find(|c| c.id == id)
    }

    /// All configs in the given category, in catalog order.
    pub fn by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a TestConfig> + 'a {
        self.configs.iter().filter(move |c| c.category == category)
    }

    /// All configs carrying the given tag, in catalog order.
    pub fn by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a TestConfig> + 'a {
        self.configs.iter().filter(move |c| c.has_tag(tag))
    }

    /// Iterate over every config.
    pub fn iter(&self) -> impl Iterator<Item = &TestConfig> {
        self.configs.iter()
    }

    /// Number of configs.
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// Returns `true` if the catalog holds no configs.
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

impl Default for TestCatalog {
    fn default() -> Self {
        Self::showcase()
    }
}

fn navigate(url: &str) -> WorkflowStep {
    WorkflowStep::new("navigate").param("url", url)
}

fn click(selector: &str) -> WorkflowStep {
    WorkflowStep::new("click").param("selector", selector)
}

fn fill(selector: &str, value: &str) -> WorkflowStep {
    WorkflowStep::new("fill").param("selector", selector).param("value", value)
}

fn pause(ms: u64) -> WorkflowStep {
    WorkflowStep::new("wait").param("duration", ms)
}

fn scroll_down(amount: u64) -> WorkflowStep {
    WorkflowStep::new("scroll")
        .param("direction", "down")
        .param("amount", amount)
}

const COMMENT_INPUT: &str = "div[data-testid=\"comment-input\"]";
const SUBMIT_BUTTON: &str = "button[data-testid=\"submit-button\"]";
const BACK_LINK: &str = "a[id=\"btn-back\"]";

fn reddit_loop_body() -> Vec<WorkflowStep> {
    vec![
        click("a[data-testid=\"comments-button\"]")
            .param("waitForNavigation", true)
            .node_id("click-open-post")
            .label("Open Post Detail Page"),
        pause(1000).node_id("wait-detail-load").label("Wait for Detail Page Load"),
        click(COMMENT_INPUT).node_id("click-input").label("Click Comment Input"),
        fill(COMMENT_INPUT, "This is an automated test comment from Noma Extension!")
            .param("simulateHuman", true)
            .node_id("fill-comment")
            .label("Write Comment"),
        pause(500).node_id("wait-type").label("Wait After Typing"),
        click(SUBMIT_BUTTON).node_id("submit").label("Submit Comment"),
        WorkflowStep::new("wait")
            .param("selector", ".status-success")
            .param("timeout", 5000)
            .node_id("wait-success")
            .label("Wait for Success Message (Anti-Bot Check)"),
        pause(3500)
            .node_id("wait-rate-limit")
            .label("Wait for Rate Limit Cooling (Min 3s)"),
        click(BACK_LINK).node_id("back-to-list").label("Return to List Page"),
        pause(500).node_id("wait-list-load").label("Wait for List Page Load"),
    ]
}

fn showcase_configs() -> Vec<TestConfig> {
    vec![
        TestConfig::new("showcase_01_basic_nav", "Basic Navigation & Interaction", "showcase")
            .description("Tests basic navigation, typing, and clicking.")
            .user_intent("Navigate to test page, fill search input, and click search button")
            .page("/tests/basic-nav")
            .step(navigate("/tests/basic-nav"))
            .step(fill("input[name='search']", "Noma Showcase"))
            .step(click("#btn-search"))
            .step(WorkflowStep::new("wait").param("selector", "#results"))
            .priority("high")
            .tags(["basic", "navigation"]),
        TestConfig::new("showcase_02_reddit_loop", "Reddit Mock Loop & Anti-Bot", "showcase")
            .description(
                "Tests the loop component and anti-bot handling on a mock Reddit page with simulated rate limits.",
            )
            .user_intent(
                "Loop through posts on the mock reddit page, open each post, leave comments, and respect rate limit.",
            )
            .page("/reddit")
            .step(navigate("/reddit").node_id("nav-1").label("Navigate to Mock Reddit List"))
            .step(
                WorkflowStep::new("wait")
                    .param("timeout", 1500)
                    .node_id("wait-load")
                    .label("Wait for Page Load"),
            )
            .step(
                WorkflowStep::new(LOOP_ACTION)
                    .param("selector", "a[data-testid=\"post-title\"]")
                    .param("maxIterations", 2)
                    .param("iteratorVariable", "post")
                    .param("enableRateLimit", false)
                    .node_id("loop-1")
                    .label("Loop Through Posts")
                    .loop_actions(reddit_loop_body()),
            )
            .outcome(ExpectedOutcome::succeeds().tool_calls(15, 40).max_duration(120_000))
            .rule(ValidationRule {
                rule_type: "custom".to_string(),
                field: "loop.iterations".to_string(),
                validator: "equals".to_string(),
                value: json!(2),
                description: "Loop executed 2 times".to_string(),
            })
            .rule(ValidationRule {
                rule_type: "custom".to_string(),
                field: "comments_posted".to_string(),
                validator: "greaterThanOrEqual".to_string(),
                value: json!(2),
                description: "At least 2 comments posted".to_string(),
            })
            .priority("high")
            .timeout(150_000)
            .tags(["showcase", "loop", "mock", "reddit", "anti-bot"]),
        TestConfig::new("showcase_03_selector_stability", "Selector Stability", "showcase")
            .description("Tests selector stability across different selector types.")
            .user_intent("Test automation workflow with various selectors")
            .page("/tests/selector-test")
            .step(navigate("/tests/selector-test"))
            .step(click(".target-btn").describe("Click using class"))
            .step(click("div.complex-selector button").describe("Click using hierarchy"))
            .priority("medium")
            .tags(["selector", "stability"]),
        TestConfig::new("showcase_04_data_extraction", "Data Extraction", "showcase")
            .description("Tests data extraction from page elements.")
            .user_intent("Extract data from page elements")
            .page("/reddit")
            .step(navigate("/reddit"))
            .step(
                WorkflowStep::new("extract_data")
                    .param("selector", ".post-title")
                    .param("fields", json!(["innerText", "href"])),
            )
            .priority("medium")
            .tags(["data", "extraction"]),
        TestConfig::new("showcase_05_form_interaction", "Form Interaction", "showcase")
            .description("Tests form filling and submission.")
            .user_intent("Fill and submit a form")
            .page("/tests/form-test")
            .step(navigate("/tests/form-test"))
            .step(fill("#name", "Test User"))
            .step(fill("#email", "test@example.com"))
            .step(click("#submit-form"))
            .step(
                WorkflowStep::new("wait")
                    .param("selector", ".success-message")
                    .param("timeout", 3000),
            )
            .priority("medium")
            .tags(["form", "input"]),
        TestConfig::new("showcase_06_error_recovery", "Error Recovery", "showcase")
            .description("Tests error handling and recovery mechanisms.")
            .user_intent("Test error recovery in automation")
            .page("/tests/selector-test")
            .step(navigate("/tests/selector-test"))
            .step(click("#non-existent-element").describe("Try to click non-existent element"))
            .step(pause(1000).describe("Wait after error"))
            .step(click(".target-btn").describe("Recover with valid click"))
            .priority("low")
            .tags(["error", "recovery"]),
        TestConfig::new("showcase_07_memory_usage", "Memory Usage Test", "showcase")
            .description("Tests memory usage during extended operations.")
            .user_intent("Monitor memory usage during test execution")
            .page("/reddit")
            .step(navigate("/reddit"))
            .step(scroll_down(500))
            .step(pause(1000))
            .step(scroll_down(500))
            .step(pause(1000))
            .priority("low")
            .tags(["performance", "memory"]),
        TestConfig::new("showcase_08_long_workflow", "Long Workflow Test", "showcase")
            .description("Tests extended workflow with multiple steps.")
            .user_intent("Execute a long sequence of actions")
            .page("/reddit")
            .step(navigate("/reddit"))
            .step(pause(500))
            .step(click("a[data-testid=\"post-title\"]"))
            .step(pause(1000))
            .step(scroll_down(300))
            .step(pause(500))
            .step(click(BACK_LINK))
            .step(pause(500))
            .outcome(ExpectedOutcome::succeeds().max_duration(10_000))
            .priority("medium")
            .tags(["workflow", "long"]),
        TestConfig::new("showcase_09_concurrent_tabs", "Concurrent Tabs Test", "showcase")
            .description("Tests handling of multiple tabs/windows.")
            .user_intent("Test multi-tab operations")
            .page("/reddit")
            .step(navigate("/reddit"))
            .step(click("a[data-testid=\"comments-button\"]").param("openInNewTab", true))
            .step(pause(1000))
            .step(WorkflowStep::new("switch_tab").param("tabIndex", 1))
            .step(pause(500))
            .priority("low")
            .tags(["tabs", "concurrent"]),
        TestConfig::new("showcase_10_ai_intent", "AI Intent Understanding", "showcase")
            .description("Tests AI understanding of user intent.")
            .user_intent("Find and comment on the most popular post about technology")
            .page("/reddit")
            .step(navigate("/reddit"))
            .step(WorkflowStep::new("analyze").param("task", "find most popular post"))
            .step(click("dynamic"))
            .step(fill(COMMENT_INPUT, "AI-generated comment"))
            .step(click(SUBMIT_BUTTON))
            .priority("high")
            .tags(["ai", "intent"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_showcase_is_valid() {
        let catalog = TestCatalog::showcase();
        assert_eq!(catalog.len(), 10);
        let rebuilt = TestCatalog::new(catalog.iter().cloned().collect());
        assert!(rebuilt.is_ok());
    }

    #[test]
    fn test_lookup_by_id() {
        let catalog = TestCatalog::showcase();
        let config = catalog.get("showcase_02_reddit_loop").unwrap();
        assert_eq!(config.expected_outcome.min_tool_calls, Some(15));
        assert_eq!(config.expected_outcome.max_tool_calls, Some(40));
        let body = config.expected_workflow[2].loop_actions.as_ref().unwrap();
        assert_eq!(body.len(), 10);
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn test_lookup_by_category_and_tag() {
        let catalog = TestCatalog::showcase();
        assert_eq!(catalog.by_category("showcase").count(), 10);
        assert_eq!(catalog.by_category("nope").count(), 0);
        let looped: Vec<_> = catalog.by_tag("loop").map(|c| c.id.as_str()).collect();
        assert_eq!(looped, vec!["showcase_02_reddit_loop"]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let config = TestCatalog::showcase().get("showcase_01_basic_nav").cloned().unwrap();
        let err = TestCatalog::new(vec![config.clone(), config]).unwrap_err();
        assert!(err.to_string().contains("duplicate test id"));
    }

    #[test]
    fn test_from_json_round_trips_showcase() {
        let configs: Vec<_> = TestCatalog::showcase().iter().cloned().collect();
        let raw = serde_json::to_string(&configs).unwrap();
        let loaded = TestCatalog::from_json(&raw).unwrap();
        assert_eq!(loaded.len(), 10);
        assert_eq!(loaded.get("showcase_04_data_extraction"), configs.get(3));
    }

    #[test]
    fn test_from_json_rejects_invalid_config() {
        let raw = r#"[{"id":"", "name":"n", "category":"c", "expected_workflow":[{"action":"click"}],
                       "expected_outcome":{"success":true}}]"#;
        assert!(matches!(TestCatalog::from_json(raw), Err(Error::Validation(_))));
    }
}

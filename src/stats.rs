//! Dashboard aggregations over fetched rows.

use std::collections::HashMap;

use serde::Serialize;

use crate::store::{ActivityLogRow, ActivityType, TestResultRow, TestResultStatus};

/// Headline figures for a page of test results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSummary {
    /// Rows summarized.
    pub total: usize,
    /// Rows with status `success`.
    pub success: usize,
    /// Rows with status `failure`.
    pub failure: usize,
    /// Rows with status `error`.
    pub error: usize,
    /// Mean `duration_ms`, rounded; 0 for no rows.
    pub average_duration_ms: u64,
    /// Distinct categories in the order they first appear.
    pub categories: Vec<String>,
}

impl ResultSummary {
    /// Summarize a page of test results.
    pub fn from_rows(rows: &[TestResultRow]) -> Self {
        let mut summary = Self {
            total: rows.len(),
            ..Self::default()
        };
        let mut total_duration = 0u128;

        for row in rows {
            match row.status {
                TestResultStatus::Success => summary.success += 1,
                TestResultStatus::Failure => summary.failure += 1,
                TestResultStatus::Error => summary.error += 1,
            }
            total_duration += u128::from(row.duration_ms);
            if !summary.categories.iter().any(|c| c == &row.category) {
                summary.categories.push(row.category.clone());
            }
        }

        if !rows.is_empty() {
            let n = rows.len() as u128;
            summary.average_duration_ms = ((total_duration + n / 2) / n) as u64;
        }
        summary
    }

    /// Percentage of successful runs, 0 for no rows.
    pub fn pass_rate(&self) -> f64 {
        percentage(self.success, self.total)
    }
}

/// Counts of logged site interactions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivitySummary {
    /// Rows summarized.
    pub total: usize,
    /// Row count per action type; absent types have no entry.
    pub by_type: HashMap<ActivityType, usize>,
}

impl ActivitySummary {
    /// Count a page of activity rows by action type.
    pub fn from_rows(rows: &[ActivityLogRow]) -> Self {
        let mut by_type = HashMap::new();
        for row in rows {
            *by_type.entry(row.action_type).or_insert(0) += 1;
        }
        Self {
            total: rows.len(),
            by_type,
        }
    }

    /// Rows of `action_type`.
    pub fn count(&self, action_type: ActivityType) -> usize {
        self.by_type.get(&action_type).copied().unwrap_or(0)
    }

    /// Share of `action_type` as a percentage of all rows, 0 for no rows.
    pub fn share(&self, action_type: ActivityType) -> f64 {
        percentage(self.count(action_type), self.total)
    }
}

/// Rows matching both filters; `None` matches everything.
pub fn filter_results<'a>(
    rows: &'a [TestResultRow],
    status: Option<TestResultStatus>,
    category: Option<&str>,
) -> Vec<&'a TestResultRow> {
    rows.iter()
        .filter(|row| status.map_or(true, |s| row.status == s))
        .filter(|row| category.map_or(true, |c| row.category == c))
        .collect()
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

//! In-process store.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::{
    ActivityLogRow, ActivityQuery, ResultStore, RowId, TestResultQuery, TestResultRow,
};
use crate::Result;

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    test_results: Vec<TestResultRow>,
    activity: Vec<ActivityLogRow>,
}

impl Tables {
    fn assign_id(&mut self) -> RowId {
        self.next_id += 1;
        RowId::Int(self.next_id)
    }
}

/// A [`ResultStore`] that keeps rows in memory.
///
/// Ids and `created_at` are assigned on insert, like the hosted tables do.
/// Useful for offline runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored test result, oldest first.
    pub fn test_results(&self) -> Vec<TestResultRow> {
        self.tables.lock().test_results.clone()
    }

    /// Every stored activity row, oldest first.
    pub fn activity(&self) -> Vec<ActivityLogRow> {
        self.tables.lock().activity.clone()
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn insert_test_result(&self, row: &TestResultRow) -> Result<TestResultRow> {
        let mut tables = self.tables.lock();
        let mut stored = row.clone();
        stored.id = Some(tables.assign_id());
        stored.created_at = Some(Utc::now());
        tables.test_results.push(stored.clone());
        Ok(stored)
    }

    async fn insert_activity(&self, row: &ActivityLogRow) -> Result<ActivityLogRow> {
        let mut tables = self.tables.lock();
        let mut stored = row.clone();
        stored.id = Some(tables.assign_id());
        stored.created_at = Some(Utc::now());
        tables.activity.push(stored.clone());
        Ok(stored)
    }

    // Rows are appended in creation order, so newest-first is reverse order.
    async fn recent_test_results(&self, query: &TestResultQuery) -> Result<Vec<TestResultRow>> {
        let tables = self.tables.lock();
        Ok(tables
            .test_results
            .iter()
            .rev()
            .filter(|row| query.matches(row))
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn recent_activity(&self, query: &ActivityQuery) -> Result<Vec<ActivityLogRow>> {
        let tables = self.tables.lock();
        Ok(tables
            .activity
            .iter()
            .rev()
            .filter(|row| query.matches(row))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ActivityStatus, ActivityType, TestResultStatus, DEFAULT_ACTIVITY_LIMIT};

    fn result_row(test_id: &str, category: &str) -> TestResultRow {
        TestResultRow {
            id: None,
            test_id: test_id.to_string(),
            test_name: test_id.to_string(),
            category: category.to_string(),
            status: TestResultStatus::Success,
            duration_ms: 10,
            tool_calls: None,
            workflow: None,
            metrics: None,
            created_at: None,
        }
    }

    fn activity_row(post_id: &str, action_type: ActivityType) -> ActivityLogRow {
        ActivityLogRow {
            id: None,
            post_id: post_id.to_string(),
            action_type,
            comment_text: None,
            status: ActivityStatus::Success,
            metadata: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_server_fields() {
        let store = MemoryStore::new();
        let first = store.insert_test_result(&result_row("a", "x")).await.unwrap();
        let second = store.insert_activity(&activity_row("1", ActivityType::View)).await.unwrap();
        assert_eq!(first.id, Some(RowId::Int(1)));
        assert_eq!(second.id, Some(RowId::Int(2)));
        assert!(first.created_at.is_some());
    }

    #[tokio::test]
    async fn test_recent_results_newest_first_with_filter() {
        let store = MemoryStore::new();
        for (id, category) in [("a", "x"), ("b", "y"), ("c", "x"), ("d", "x")] {
            store.insert_test_result(&result_row(id, category)).await.unwrap();
        }
        let rows = store
            .recent_test_results(&TestResultQuery::recent(2).category("x"))
            .await
            .unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.test_id.as_str()).collect();
        assert_eq!(ids, vec!["d", "c"]);

        let all = store.recent_test_results(&TestResultQuery::default()).await.unwrap();
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn test_recent_activity_filters() {
        let store = MemoryStore::new();
        store.insert_activity(&activity_row("1", ActivityType::Submit)).await.unwrap();
        store.insert_activity(&activity_row("2", ActivityType::Submit)).await.unwrap();
        store.insert_activity(&activity_row("1", ActivityType::RateLimited)).await.unwrap();

        let by_post = store.recent_activity(&ActivityQuery::default().post("1")).await.unwrap();
        assert_eq!(by_post.len(), 2);
        assert_eq!(by_post[0].action_type, ActivityType::RateLimited);

        let submits = store
            .recent_activity(&ActivityQuery::default().action_type(ActivityType::Submit))
            .await
            .unwrap();
        let posts: Vec<_> = submits.iter().map(|r| r.post_id.as_str()).collect();
        assert_eq!(posts, vec!["2", "1"]);
    }

    #[tokio::test]
    async fn test_post_reads_are_uncapped() {
        let store = MemoryStore::new();
        for _ in 0..DEFAULT_ACTIVITY_LIMIT + 20 {
            store.insert_activity(&activity_row("7", ActivityType::View)).await.unwrap();
        }
        store.insert_activity(&activity_row("8", ActivityType::View)).await.unwrap();

        let all = store.recent_activity(&ActivityQuery::for_post("7")).await.unwrap();
        assert_eq!(all.len(), DEFAULT_ACTIVITY_LIMIT + 20);

        let capped = store.recent_activity(&ActivityQuery::default().post("7")).await.unwrap();
        assert_eq!(capped.len(), DEFAULT_ACTIVITY_LIMIT);
    }
}

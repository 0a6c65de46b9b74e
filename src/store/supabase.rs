//! PostgREST-backed store for a hosted Supabase project.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Request, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::{
    ActivityLogRow, ActivityQuery, ResultStore, TestResultQuery, TestResultRow,
};
use crate::settings::StoreSettings;
use crate::{Error, Result};

/// Talks to the `/rest/v1` endpoint of a Supabase project.
///
/// Inserts ask for the stored representation back, reads are ordered by
/// `created_at` descending. Non-2xx responses become [`Error::Store`].
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    client: Client,
    settings: StoreSettings,
}

impl SupabaseStore {
    /// Build a store from validated settings.
    pub fn new(settings: StoreSettings) -> Result<Self> {
        settings.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self { client, settings })
    }

    /// Build a store from `SUPABASE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(StoreSettings::from_env()?)
    }

    /// The settings this store was built with.
    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.settings.url.trim_end_matches('/'), table)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.settings.anon_key)
            .bearer_auth(&self.settings.anon_key)
    }

    pub(crate) fn insert_request<T: Serialize>(&self, table: &str, row: &T) -> Result<Request> {
        let request = self
            .authorized(self.client.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(&[row])
            .build()?;
        Ok(request)
    }

    pub(crate) fn select_request(
        &self,
        table: &str,
        filters: &[(&str, String)],
        limit: Option<usize>,
    ) -> Result<Request> {
        let mut builder = self
            .authorized(self.client.get(self.table_url(table)))
            .query(&[("select", "*")])
            .query(filters)
            .query(&[("order", "created_at.desc")]);
        if let Some(limit) = limit {
            builder = builder.query(&[("limit", limit.to_string())]);
        }
        Ok(builder.build()?)
    }

    async fn send<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        debug!(method = %request.method(), url = %request.url(), "datastore request");
        let response = self.client.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Store {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    async fn insert_one<T>(&self, table: &str, row: &T) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send,
    {
        let request = self.insert_request(table, row)?;
        let mut rows: Vec<T> = self.send(request).await?;
        if rows.is_empty() {
            return Err(Error::Store {
                status: StatusCode::OK.as_u16(),
                body: format!("insert into '{table}' returned no rows"),
            });
        }
        Ok(rows.swap_remove(0))
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

#[async_trait]
impl ResultStore for SupabaseStore {
    async fn insert_test_result(&self, row: &TestResultRow) -> Result<TestResultRow> {
        self.insert_one(&self.settings.test_results_table, row).await
    }

    async fn insert_activity(&self, row: &ActivityLogRow) -> Result<ActivityLogRow> {
        self.insert_one(&self.settings.activity_table, row).await
    }

    async fn recent_test_results(&self, query: &TestResultQuery) -> Result<Vec<TestResultRow>> {
        let mut filters = Vec::new();
        if let Some(category) = &query.category {
            filters.push(("category", eq(category)));
        }
        let request = self.select_request(
            &self.settings.test_results_table,
            &filters,
            Some(query.limit),
        )?;
        self.send(request).await
    }

    async fn recent_activity(&self, query: &ActivityQuery) -> Result<Vec<ActivityLogRow>> {
        let mut filters = Vec::new();
        if let Some(action_type) = query.action_type {
            filters.push(("action_type", eq(action_type)));
        }
        if let Some(post_id) = &query.post_id {
            filters.push(("post_id", eq(post_id)));
        }
        let request = self.select_request(&self.settings.activity_table, &filters, query.limit)?;
        self.send(request).await
    }
}

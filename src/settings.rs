//! Datastore settings.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Connection settings for the hosted results datastore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// Public (anon) API key, sent as `apikey` and bearer token.
    pub anon_key: String,
    /// Table receiving one row per finished run.
    pub test_results_table: String,
    /// Table receiving site interaction logs.
    pub activity_table: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            test_results_table: "test_results".to_string(),
            activity_table: "reddit_activity_logs".to_string(),
            timeout_secs: 10,
        }
    }
}

impl StoreSettings {
    /// Settings pointing at `url` with `anon_key` and default tables.
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            ..Self::default()
        }
    }

    /// Read settings from the process environment.
    ///
    /// Uses `SUPABASE_URL` and `SUPABASE_ANON_KEY`, falling back to the
    /// `NEXT_PUBLIC_` prefixed names, and the optional
    /// `SUPABASE_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .or_else(|| lookup(&format!("NEXT_PUBLIC_{name}")))
                .filter(|v| !v.trim().is_empty())
        };

        let url = read("SUPABASE_URL")
            .ok_or_else(|| Error::Settings("SUPABASE_URL is not set".to_string()))?;
        let anon_key = read("SUPABASE_ANON_KEY")
            .ok_or_else(|| Error::Settings("SUPABASE_ANON_KEY is not set".to_string()))?;
        let mut settings = Self::new(url, anon_key);
        if let Some(raw) = lookup("SUPABASE_TIMEOUT_SECS") {
            settings.timeout_secs = raw.trim().parse().map_err(|_| {
                Error::Settings(format!("SUPABASE_TIMEOUT_SECS is not a number: '{raw}'"))
            })?;
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Check that the settings can address a datastore.
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(Error::Settings(format!(
                "datastore url must be http(s), got '{}'",
                self.url
            )));
        }
        if self.anon_key.is_empty() {
            return Err(Error::Settings("anon key is empty".to_string()));
        }
        if self.test_results_table.is_empty() || self.activity_table.is_empty() {
            return Err(Error::Settings("table names must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_reads_plain_names() {
        let settings = StoreSettings::from_lookup(lookup(&[
            ("SUPABASE_URL", "https://demo.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("SUPABASE_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();
        assert_eq!(settings.url, "https://demo.supabase.co");
        assert_eq!(settings.timeout_secs, 3);
        assert_eq!(settings.test_results_table, "test_results");
    }

    #[test]
    fn test_falls_back_to_public_prefix() {
        let settings = StoreSettings::from_lookup(lookup(&[
            ("NEXT_PUBLIC_SUPABASE_URL", "http://localhost:54321"),
            ("NEXT_PUBLIC_SUPABASE_ANON_KEY", "anon"),
        ]))
        .unwrap();
        assert_eq!(settings.url, "http://localhost:54321");
        assert_eq!(settings.timeout_secs, 10);
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let err = StoreSettings::from_lookup(lookup(&[("SUPABASE_URL", "https://x.co")])).unwrap_err();
        assert!(matches!(err, Error::Settings(ref m) if m.contains("SUPABASE_ANON_KEY")));
    }

    #[test]
    fn test_bad_timeout_is_an_error() {
        let err = StoreSettings::from_lookup(lookup(&[
            ("SUPABASE_URL", "https://x.co"),
            ("SUPABASE_ANON_KEY", "k"),
            ("SUPABASE_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        assert!(StoreSettings::new("ftp://x", "k").validate().is_err());
        assert!(StoreSettings::new("https://x", "k").validate().is_ok());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let settings: StoreSettings =
            serde_json::from_str(r#"{"url":"https://x.co","anon_key":"k"}"#).unwrap();
        assert_eq!(settings.activity_table, "reddit_activity_logs");
    }
}

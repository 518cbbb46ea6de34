//! Connection settings for the Hedgeline backend.

use std::time::Duration;

use crate::{Error, TimelineClient, TimelineClientBuilder};

/// Endpoint used when `HEDGELINE_ENDPOINT` is not set.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

/// Configuration for connecting to a Hedgeline backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend endpoint URL (e.g. `http://localhost:8000`).
    pub endpoint: String,
    /// API key sent as a bearer token.
    pub api_key: Option<String>,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    /// Create a new configuration with defaults.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            timeout: None,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Reads:
    /// - `HEDGELINE_ENDPOINT` (defaults to [`DEFAULT_ENDPOINT`])
    /// - `HEDGELINE_API_KEY` (optional)
    /// - `HEDGELINE_TIMEOUT_SECS` (optional, default 30)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let endpoint = lookup("HEDGELINE_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned());
        let api_key = lookup("HEDGELINE_API_KEY").filter(|k| !k.is_empty());
        let timeout = lookup("HEDGELINE_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);

        Self {
            endpoint,
            api_key,
            timeout,
        }
    }

    /// Override the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build a client from this configuration.
    pub fn build_client(&self) -> Result<TimelineClient, Error> {
        let mut builder = TimelineClientBuilder::new(&self.endpoint);
        if let Some(key) = &self.api_key {
            builder = builder.api_key(key);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = ClientConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ClientConfig::new(DEFAULT_ENDPOINT));
    }

    #[test]
    fn reads_all_variables() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("HEDGELINE_ENDPOINT", "https://api.example.com"),
            ("HEDGELINE_API_KEY", "secret"),
            ("HEDGELINE_TIMEOUT_SECS", "5"),
        ]));
        assert_eq!(config.endpoint, "https://api.example.com");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn ignores_bad_timeout_and_empty_key() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("HEDGELINE_API_KEY", ""),
            ("HEDGELINE_TIMEOUT_SECS", "soon"),
        ]));
        assert!(config.api_key.is_none());
        assert!(config.timeout.is_none());
    }

    #[test]
    fn builds_client_with_overrides() {
        let client = ClientConfig::new("http://localhost:9000/")
            .with_api_key("k")
            .with_timeout(Duration::from_secs(2))
            .build_client()
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:9000");
    }
}

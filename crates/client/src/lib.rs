//! Hedgeline HTTP Client
//!
//! A native Rust client for the timeline endpoints of the Hedgeline backend.
//!
//! # Quick Start
//!
//! ```no_run
//! use hedgeline_client::TimelineClient;
//! use hedgeline_core::SubjectRef;
//! use hedgeline_timeline::EventQuery;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hedgeline_client::Error> {
//!     let client = TimelineClient::new("http://localhost:8000");
//!
//!     let subject = SubjectRef::new("rfq", "RFQ-2024-017");
//!     let page = client.list_events(&EventQuery::first_page(&subject, 50)).await?;
//!     for event in &page.events {
//!         println!("{} {}", event.id, event.event_type);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! `TimelineClient` implements [`TimelineBackend`](hedgeline_timeline::TimelineBackend),
//! so it can back an [`EventWindow`](hedgeline_timeline::EventWindow) directly.
//!
//! # Configuration
//!
//! Use the builder pattern for custom configuration:
//!
//! ```no_run
//! use hedgeline_client::TimelineClientBuilder;
//! use std::time::Duration;
//!
//! let client = TimelineClientBuilder::new("http://localhost:8000")
//!     .timeout(Duration::from_secs(10))
//!     .api_key("your-api-key")
//!     .build()
//!     .unwrap();
//! ```

pub mod config;
pub mod disposition;
mod error;
mod timeline;

pub use config::ClientConfig;
pub use error::Error;

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the Hedgeline timeline API.
#[derive(Debug, Clone)]
pub struct TimelineClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

/// Builder for configuring a [`TimelineClient`].
#[derive(Debug)]
pub struct TimelineClientBuilder {
    base_url: String,
    timeout: Duration,
    api_key: Option<String>,
    client: Option<Client>,
}

impl TimelineClientBuilder {
    /// Create a new builder with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            api_key: None,
            client: None,
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the API key for authentication.
    #[must_use]
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Use a custom reqwest Client.
    ///
    /// Useful for configuring TLS, proxies, or other advanced settings.
    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<TimelineClient, Error> {
        let client = match self.client {
            Some(c) => c,
            None => Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| Error::Configuration(e.to_string()))?,
        };

        Ok(TimelineClient {
            client,
            base_url: self.base_url,
            api_key: self.api_key,
        })
    }
}

impl TimelineClient {
    /// Create a new client with default configuration.
    pub fn new(base_url: impl Into<String>) -> Self {
        TimelineClientBuilder::new(base_url)
            .build()
            .expect("default client configuration should not fail")
    }

    /// Create a builder for advanced configuration.
    pub fn builder(base_url: impl Into<String>) -> TimelineClientBuilder {
        TimelineClientBuilder::new(base_url)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Add authorization header if API key is set.
    fn add_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("Authorization", format!("Bearer {key}")),
            None => req,
        }
    }

    /// Send a request, mapping transport failures.
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, Error> {
        self.add_auth(req)
            .send()
            .await
            .map_err(|e| Error::Connection(e.to_string()))
    }
}

/// Error body returned by the backend: `{"detail": ...}`.
///
/// `detail` is usually a string; validation failures carry a list instead.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    detail: serde_json::Value,
}

impl ErrorResponse {
    fn message(self) -> String {
        match self.detail {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        }
    }
}

/// Decode a JSON success body, or turn the response into an [`Error::Http`].
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, Error> {
    if response.status().is_success() {
        response
            .json::<T>()
            .await
            .map_err(|e| Error::Deserialization(e.to_string()))
    } else {
        Err(error_from_response(response).await)
    }
}

async fn error_from_response(response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(ErrorResponse::message)
        .unwrap_or_else(|_| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_owned()
            } else {
                body
            }
        });
    Error::Http {
        status: status.as_u16(),
        message,
    }
}

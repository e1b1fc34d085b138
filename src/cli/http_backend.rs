use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::models::{
    IndexConfig, IndexSummary, SearchConfig, SearchResult, ValidateConfig, ValidationReport,
};

/// HTTP client backend that delegates operations to a running
/// `doxsearch serve` daemon.
pub struct HttpSearchBackend {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpSearchBackend {
    /// Create a new HTTP backend targeting the given base URL
    /// (e.g. "http://127.0.0.1:7878").
    pub fn new<S: Into<String>>(base_url: S) -> Result<Self> {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client, base_url })
    }

    /// Execute a search via `POST /v1/search`.
    pub fn search(&self, config: SearchConfig) -> Result<SearchResult> {
        self.post_json("/v1/search", &config)
    }

    /// Execute an index operation via `POST /v1/index`.
    pub fn index(&self, config: IndexConfig) -> Result<IndexSummary> {
        self.post_json("/v1/index", &config)
    }

    /// Describe an index via `POST /v1/index/info`.
    pub fn index_info(&self, config: IndexConfig) -> Result<IndexSummary> {
        self.post_json("/v1/index/info", &config)
    }

    /// Validate search files via `POST /v1/validate`.
    pub fn validate(&self, config: ValidateConfig) -> Result<ValidationReport> {
        self.post_json("/v1/validate", &config)
    }

    fn post_json<T, R>(&self, path: &str, body: &T) -> Result<R>
    where
        T: Serialize,
        R: serde::de::DeserializeOwned,
    {
        let url = self.url_for(path);
        tracing::debug!("POST {url}");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .with_context(|| format!("failed to send request to {}", url))?;

        let status = response.status();
        if !status.is_success() {
            // The daemon reports failures as `{"error": "..."}`.
            let message = response
                .json::<ErrorBody>()
                .map(|b| b.error)
                .unwrap_or_else(|_| status.to_string());
            bail!("server returned {} for {}: {}", status.as_u16(), url, message);
        }

        let value = response
            .json::<R>()
            .context("failed to decode JSON response from server")?;

        Ok(value)
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

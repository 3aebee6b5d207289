//! Bounded remote call primitive.
//!
//! One GET, one deadline, no retries. Every caller gets the same failure
//! classification from [`RemoteError`].

use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::RemoteError;
use crate::metrics;

/// HTTP client bound to a base URL and a fixed per-call deadline.
#[derive(Debug, Clone)]
pub struct BoundedClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl BoundedClient {
    /// Create a client for `base_url` whose calls give up after `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| RemoteError::InvalidRequest(e.to_string()))?;

        Ok(Self::with_http(http, base_url, timeout))
    }

    /// Create a client reusing an existing reqwest client.
    pub fn with_http(http: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Base URL calls are issued against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Per-call deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    /// GET `{base_url}{path}` and return the body.
    ///
    /// JSON bodies are returned parsed; anything else comes back as a JSON
    /// string holding the raw text.
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn get_json(&self, path: &str) -> Result<Value, RemoteError> {
        let start = Instant::now();
        let result = self.fetch(path).await;
        metrics::record_remote_call(start, path, result.is_ok());

        match &result {
            Ok(_) => debug!(elapsed_ms = start.elapsed().as_millis() as u64, "Remote call succeeded"),
            Err(e) => warn!(error = %e, "Remote call failed"),
        }
        result
    }

    async fn fetch(&self, path: &str) -> Result<Value, RemoteError> {
        let url = format!("{}{}", self.base_url, path);
        let timeout_ms = self.timeout_ms();

        let request = async {
            let response = self
                .http
                .get(&url)
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| RemoteError::from_reqwest(e, timeout_ms))?;

            let status = response.status();
            if !status.is_success() {
                return Err(RemoteError::Status(status.as_u16()));
            }

            let body = response
                .text()
                .await
                .map_err(|e| RemoteError::from_reqwest(e, timeout_ms))?;

            Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
        };

        // reqwest enforces the deadline too; this also covers DNS and body reads.
        tokio::time::timeout(self.timeout, request)
            .await
            .unwrap_or(Err(RemoteError::Timeout(timeout_ms)))
    }
}

//! Cascading health aggregation.
//!
//! The frontend's view of backend health is computed by calling the
//! backend's own `/health` endpoint once, with a deadline.

use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use super::client::BoundedClient;

/// Backend health endpoint path.
pub const HEALTH_PATH: &str = "/health";

/// Aggregated status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Dependency answered with 2xx in time.
    Healthy,
    /// Dependency timed out, refused, or answered non-2xx.
    Unhealthy,
}

/// Whether the dependency could be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// Call completed successfully.
    Success,
    /// Call failed.
    Failed,
}

/// Composite health result, built fresh per request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    /// Aggregated status.
    pub status: HealthStatus,
    /// Remote body, verbatim, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<Value>,
    /// Failure message on error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Reachability.
    pub connectivity: Connectivity,
}

impl HealthReport {
    /// Report for a successful probe.
    pub fn healthy(backend: Value) -> Self {
        Self {
            status: HealthStatus::Healthy,
            backend: Some(backend),
            error: None,
            connectivity: Connectivity::Success,
        }
    }

    /// Report for a failed probe.
    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            backend: None,
            error: Some(error.into()),
            connectivity: Connectivity::Failed,
        }
    }

    /// Whether the dependency is healthy.
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }

    /// HTTP status to answer with: 200 when healthy, 503 otherwise.
    pub fn status_code(&self) -> StatusCode {
        if self.is_healthy() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Probes the backend's health endpoint.
#[derive(Debug, Clone)]
pub struct HealthAggregator {
    client: BoundedClient,
}

impl HealthAggregator {
    /// Create an aggregator over `client`.
    pub fn new(client: BoundedClient) -> Self {
        Self { client }
    }

    /// The underlying bounded client.
    pub fn client(&self) -> &BoundedClient {
        &self.client
    }

    /// Call the backend once and map the outcome to a report.
    #[instrument(skip(self))]
    pub async fn check(&self) -> HealthReport {
        match self.client.get_json(HEALTH_PATH).await {
            Ok(body) => HealthReport::healthy(body),
            Err(e) => HealthReport::unhealthy(e.to_string()),
        }
    }
}

//! Frontend HTTP handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::warn;

use super::state::FrontendState;
use super::{ServiceHealth, API_VERSION};
use crate::remote::DATA_PATH;

/// Name the frontend reports in its health body.
pub const FRONTEND_APP: &str = "app1-frontend";

/// Root handler.
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Welcome to App1 - GM Frontend",
        "version": API_VERSION
    }))
}

/// Local liveness only - never calls the backend.
pub async fn health() -> impl IntoResponse {
    Json(ServiceHealth::healthy(FRONTEND_APP))
}

/// Backend health - 200 when the backend answers in time, 503 otherwise.
pub async fn backend_health(State(state): State<FrontendState>) -> impl IntoResponse {
    let report = state.aggregator.check().await;
    (report.status_code(), Json(report))
}

/// Forward `/api/data` from the backend.
///
/// Failures are reported with a fixed message; the underlying error is
/// only logged.
pub async fn data(State(state): State<FrontendState>) -> Response {
    match state.backend().get_json(DATA_PATH).await {
        Ok(body) => Json(json!({
            "source": FRONTEND_APP,
            "backendData": body
        }))
        .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to fetch data from backend");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "Failed to fetch data from backend" })),
            )
                .into_response()
        }
    }
}

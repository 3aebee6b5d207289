//! Backend HTTP handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info};

use super::error::ApiError;
use super::state::BackendState;
use super::{ServiceHealth, API_VERSION};
use crate::metrics;
use crate::utils::timestamp;

/// Name the backend reports in its health body.
pub const BACKEND_APP: &str = "app2-backend";

/// `/api/db-status` response, tagged by `status`.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DbStatusResponse {
    /// Liveness query succeeded.
    Connected {
        /// Database name from the descriptor.
        database: Option<String>,
        /// Time of the check.
        timestamp: String,
    },
    /// Connecting or querying failed.
    Disconnected {
        /// Failure message.
        error: String,
    },
    /// No descriptor was resolved at startup.
    NotConfigured {
        /// Explanation.
        message: String,
    },
}

impl DbStatusResponse {
    /// HTTP status to answer with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            DbStatusResponse::Connected { .. } => StatusCode::OK,
            _ => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Item echoed back by `POST /api/data`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedItem {
    /// Generated id in `[0, 1000)`.
    pub id: u32,
    /// Name as sent.
    pub name: Value,
    /// Value as sent.
    pub value: Value,
    /// Creation time.
    pub created_at: String,
}

/// `POST /api/data` success body.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    /// Always "created".
    pub status: &'static str,
    /// The new item.
    pub data: CreatedItem,
}

/// Root handler - describes the API.
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Welcome to App2 - Backend API",
        "version": API_VERSION,
        "endpoints": {
            "health": "/health",
            "data": "/api/data",
            "dbStatus": "/api/db-status"
        }
    }))
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(ServiceHealth::healthy(BACKEND_APP))
}

/// Static sample data.
pub async fn get_data() -> impl IntoResponse {
    let items: Vec<Value> = (1..=3)
        .map(|i| json!({ "id": i, "name": format!("Item {}", i), "value": i * 100 }))
        .collect();

    Json(json!({
        "status": "healthy",
        "message": "Data from backend API",
        "data": {
            "items": items,
            "metadata": {
                "totalCount": 3,
                "source": BACKEND_APP,
                "timestamp": timestamp()
            }
        }
    }))
}

/// Database status - 200 when the liveness query succeeds, 503 otherwise.
///
/// When no descriptor was resolved at startup no connection is attempted.
pub async fn db_status(State(state): State<BackendState>) -> impl IntoResponse {
    let response = match state.database.descriptor() {
        None => DbStatusResponse::NotConfigured {
            message: "Database connection not configured".to_string(),
        },
        Some(descriptor) => match state.probe.check(descriptor).await {
            Ok(()) => DbStatusResponse::Connected {
                database: descriptor.database.clone(),
                timestamp: timestamp(),
            },
            Err(e) => {
                error!(error = %e, "Database connection failed");
                DbStatusResponse::Disconnected {
                    error: e.to_string(),
                }
            }
        },
    };

    (response.status_code(), Json(response))
}

/// JavaScript-style truthiness, used for the `name` presence check.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Check a create request: `name` must be truthy and `value` present.
pub fn validate_new_item(body: &Value) -> Result<(Value, Value), ApiError> {
    let name = body.get("name").filter(|n| is_truthy(n));
    let value = body.get("value");

    match (name, value) {
        (Some(name), Some(value)) => Ok((name.clone(), value.clone())),
        _ => Err(ApiError::BadRequest(
            "Missing required fields: name and value".to_string(),
        )),
    }
}

/// Create an item - 201 with the echoed item, 400 when fields are missing.
pub async fn create_data(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let Json(body) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let (name, value) = validate_new_item(&body)?;

    let item = CreatedItem {
        id: rand::rng().random_range(0..1000),
        name,
        value,
        created_at: timestamp(),
    };

    info!(id = item.id, "Item created");
    metrics::inc_items_created();

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            status: "created",
            data: item,
        }),
    ))
}

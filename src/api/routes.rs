//! HTTP API route definitions.

use axum::routing::get;
use axum::{middleware, Router};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use super::error::handle_panic;
use super::middleware::security_headers;
use super::state::{BackendState, FrontendState};
use super::{backend, frontend};

/// Create the backend router.
pub fn create_backend_router(state: BackendState) -> Router {
    Router::new()
        .route("/", get(backend::root))
        .route("/health", get(backend::health))
        .route("/api/data", get(backend::get_data).post(backend::create_data))
        .route("/api/db-status", get(backend::db_status))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

/// Create the frontend router.
pub fn create_frontend_router(state: FrontendState) -> Router {
    Router::new()
        .route("/", get(frontend::root))
        .route("/health", get(frontend::health))
        .route("/api/backend-health", get(frontend::backend_health))
        .route("/api/data", get(frontend::data))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

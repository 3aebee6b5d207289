//! HTTP API for both services.

pub mod backend;
pub mod error;
pub mod frontend;
pub mod middleware;
pub mod routes;
pub mod state;

use serde::Serialize;

use crate::utils::timestamp;

pub use error::ApiError;
pub use routes::{create_backend_router, create_frontend_router};
pub use state::{BackendState, FrontendState};

/// Version reported by both root endpoints.
pub const API_VERSION: &str = "1.0.0";

/// Local liveness body shared by both services.
#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    /// Always "healthy".
    pub status: &'static str,
    /// Service name.
    pub app: &'static str,
    /// Time of the response.
    pub timestamp: String,
}

impl ServiceHealth {
    /// Healthy body for `app`.
    pub fn healthy(app: &'static str) -> Self {
        Self {
            status: "healthy",
            app,
            timestamp: timestamp(),
        }
    }
}

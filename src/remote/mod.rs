//! Calls from the frontend to the backend.
//!
//! This module handles:
//! - The bounded single-attempt GET primitive
//! - Health aggregation over the backend's `/health`

pub mod client;
pub mod health;

pub use client::BoundedClient;
pub use health::{Connectivity, HealthAggregator, HealthReport, HealthStatus, HEALTH_PATH};

/// Backend data endpoint path.
pub const DATA_PATH: &str = "/api/data";

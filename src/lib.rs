//! Frontend/backend service pair.
//!
//! Two independently deployable HTTP services talking over HTTP:
//!
//! - The **backend** resolves how to reach its database once at startup
//!   (explicit connection string, then Key Vault, then unconfigured) and
//!   exposes health, sample data, a database status probe and a create
//!   endpoint.
//! - The **frontend** reports backend reachability by calling the backend's
//!   `/health` with a fixed deadline, and forwards `/api/data`.
//!
//! ```text
//! client ──> frontend /api/backend-health ──(GET, 10s)──> backend /health
//!                                                         backend /api/db-status ──> SQL
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`secrets`]: Managed identity and Key Vault lookup
//! - [`db`]: Connection descriptor, startup resolution, liveness probe
//! - [`remote`]: Bounded backend calls and health aggregation
//! - [`api`]: HTTP handlers and routers for both services
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod remote;
pub mod secrets;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};

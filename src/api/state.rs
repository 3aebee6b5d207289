//! Application state shared with handlers.

use std::sync::Arc;

use crate::db::{DatabaseConfig, DatabaseProbe};
use crate::remote::{BoundedClient, HealthAggregator};

/// Backend state: the database configuration resolved at startup and the
/// probe used to check it. Both are read-only once constructed.
#[derive(Debug, Clone)]
pub struct BackendState {
    /// Database configuration, resolved once.
    pub database: Arc<DatabaseConfig>,
    /// Liveness probe.
    pub probe: Arc<dyn DatabaseProbe>,
}

impl BackendState {
    /// Create new backend state.
    pub fn new(database: DatabaseConfig, probe: Arc<dyn DatabaseProbe>) -> Self {
        Self {
            database: Arc::new(database),
            probe,
        }
    }
}

/// Frontend state.
#[derive(Debug, Clone)]
pub struct FrontendState {
    /// Backend health aggregator.
    pub aggregator: Arc<HealthAggregator>,
}

impl FrontendState {
    /// Create new frontend state around a bounded backend client.
    pub fn new(client: BoundedClient) -> Self {
        Self {
            aggregator: Arc::new(HealthAggregator::new(client)),
        }
    }

    /// Bounded client used for every backend call.
    pub fn backend(&self) -> &BoundedClient {
        self.aggregator.client()
    }
}

//! Mock database probe for unit testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::connection::ConnectionDescriptor;
use super::probe::DatabaseProbe;
use crate::error::DatabaseError;

/// Probe that answers from a canned outcome and counts calls.
#[derive(Debug, Clone, Default)]
pub struct MockDatabaseProbe {
    fail_with: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl MockDatabaseProbe {
    /// Probe that always succeeds.
    pub fn healthy() -> Self {
        Self::default()
    }

    /// Probe that always fails to connect with `reason`.
    pub fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// Number of probes attempted so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseProbe for MockDatabaseProbe {
    async fn check(&self, descriptor: &ConnectionDescriptor) -> Result<(), DatabaseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.fail_with {
            Some(reason) => Err(DatabaseError::ConnectFailed {
                server: descriptor.server.clone().unwrap_or_default(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

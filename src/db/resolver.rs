//! Startup resolution of database connectivity.

use std::time::Instant;

use tracing::{error, info, instrument, warn};

use super::connection::ConnectionDescriptor;
use crate::metrics;
use crate::secrets::{SecretSource, SQL_CONNECTION_SECRET};

/// Outcome of resolving the database configuration once at startup.
///
/// Frozen after construction; handlers only ever read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    /// A connection string was obtained and parsed.
    Configured(ConnectionDescriptor),
    /// No connection string could be obtained.
    Unconfigured,
}

impl DatabaseConfig {
    /// The descriptor, if one was resolved.
    pub fn descriptor(&self) -> Option<&ConnectionDescriptor> {
        match self {
            DatabaseConfig::Configured(descriptor) => Some(descriptor),
            DatabaseConfig::Unconfigured => None,
        }
    }

    /// Whether a descriptor was resolved.
    pub fn is_configured(&self) -> bool {
        matches!(self, DatabaseConfig::Configured(_))
    }
}

/// Resolve the database configuration from `source`.
///
/// Never fails: any secret-store error is logged and treated the same as
/// having no connection string. An explicit string is authoritative even if
/// it parses to empty fields.
#[instrument(skip(source), fields(source = source.kind()))]
pub async fn resolve(source: SecretSource) -> DatabaseConfig {
    let raw = match source {
        SecretSource::Explicit(raw) => Some(raw),
        SecretSource::VaultLookup(store) => {
            let start = Instant::now();
            let result = store.get_secret(SQL_CONNECTION_SECRET).await;
            metrics::record_secret_lookup(start, result.is_ok());

            match result {
                Ok(raw) => Some(raw),
                Err(e) => {
                    error!(
                        location = %store.location(),
                        error = %e,
                        "Failed to initialize SQL connection"
                    );
                    None
                }
            }
        }
        SecretSource::Absent => None,
    };

    let Some(raw) = raw else {
        warn!("No SQL connection string available; /api/db-status will report not_configured");
        return DatabaseConfig::Unconfigured;
    };

    let descriptor = ConnectionDescriptor::from_connection_string(&raw);
    if !descriptor.is_complete() {
        warn!(
            server = ?descriptor.server,
            database = ?descriptor.database,
            "SQL connection string is missing fields"
        );
    }

    info!(
        server = descriptor.server.as_deref().unwrap_or("<none>"),
        database = descriptor.database.as_deref().unwrap_or("<none>"),
        auth_mode = %descriptor.auth_mode,
        "SQL configuration initialized"
    );

    DatabaseConfig::Configured(descriptor)
}

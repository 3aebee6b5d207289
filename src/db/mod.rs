//! Database configuration and liveness.
//!
//! This module handles:
//! - Parsing connection strings into a [`ConnectionDescriptor`]
//! - Resolving the configuration once at startup
//! - Probing the database with a trivial query
//! - Mock probe for testing

pub mod connection;
pub mod mock;
pub mod probe;
pub mod resolver;

pub use connection::{extract_field, AuthMode, ConnectionDescriptor, DEFAULT_SQL_PORT};
pub use mock::MockDatabaseProbe;
pub use probe::{DatabaseProbe, SqlServerProbe, LIVENESS_QUERY};
pub use resolver::{resolve, DatabaseConfig};

//! Live database liveness probe.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tiberius::{AuthMethod, Client, EncryptionLevel};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info, instrument};

use super::connection::ConnectionDescriptor;
use crate::error::DatabaseError;
use crate::metrics;
use crate::secrets::identity::{ManagedIdentityCredential, SQL_RESOURCE};

/// Query used to prove the connection works.
pub const LIVENESS_QUERY: &str = "SELECT 1 AS connected";

/// Checks that the database described by a descriptor is reachable.
#[async_trait]
pub trait DatabaseProbe: Send + Sync + std::fmt::Debug {
    /// Connect and run a trivial query.
    async fn check(&self, descriptor: &ConnectionDescriptor) -> Result<(), DatabaseError>;
}

/// SQL Server probe authenticating with a managed identity token.
#[derive(Debug, Clone)]
pub struct SqlServerProbe {
    credential: Arc<ManagedIdentityCredential>,
    timeout: Duration,
}

impl SqlServerProbe {
    /// Create a probe bounded by `timeout`.
    pub fn new(credential: Arc<ManagedIdentityCredential>, timeout: Duration) -> Self {
        Self { credential, timeout }
    }

    async fn connect_and_query(
        &self,
        server: &str,
        descriptor: &ConnectionDescriptor,
    ) -> Result<(), DatabaseError> {
        let token = self.credential.get_token(SQL_RESOURCE).await?;

        let mut config = tiberius::Config::new();
        config.host(server);
        config.port(descriptor.port);
        if let Some(database) = &descriptor.database {
            config.database(database);
        }
        config.authentication(AuthMethod::aad_token(&token.access_token));
        config.encryption(if descriptor.encrypt {
            EncryptionLevel::Required
        } else {
            EncryptionLevel::Off
        });
        if descriptor.trust_server_certificate {
            config.trust_cert();
        }

        let mut client = match connect(config.clone()).await {
            // Azure SQL gateways may redirect to the node hosting the database.
            Err(tiberius::error::Error::Routing { host, port }) => {
                debug!(host = %host, port, "Following SQL Server redirect");
                config.host(&host);
                config.port(port);
                connect(config)
                    .await
                    .map_err(|e| connect_failed(&host, e))?
            }
            other => other.map_err(|e| connect_failed(server, e))?,
        };

        let row = client
            .simple_query(LIVENESS_QUERY)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?
            .into_row()
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if row.is_none() {
            return Err(DatabaseError::QueryFailed("no rows returned".to_string()));
        }

        Ok(())
    }
}

async fn connect(
    config: tiberius::Config,
) -> Result<Client<Compat<TcpStream>>, tiberius::error::Error> {
    let tcp = TcpStream::connect(config.get_addr()).await?;
    tcp.set_nodelay(true)?;
    Client::connect(config, tcp.compat_write()).await
}

fn connect_failed(server: &str, err: tiberius::error::Error) -> DatabaseError {
    DatabaseError::ConnectFailed {
        server: server.to_string(),
        reason: err.to_string(),
    }
}

#[async_trait]
impl DatabaseProbe for SqlServerProbe {
    #[instrument(skip(self, descriptor), fields(server = ?descriptor.server))]
    async fn check(&self, descriptor: &ConnectionDescriptor) -> Result<(), DatabaseError> {
        let server = descriptor
            .server
            .as_deref()
            .ok_or(DatabaseError::MissingField("server"))?;

        let start = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.connect_and_query(server, descriptor))
            .await
            .unwrap_or_else(|_| Err(DatabaseError::Timeout(self.timeout.as_millis() as u64)));
        metrics::record_db_probe(start, result.is_ok());

        if result.is_ok() {
            info!("Database liveness query succeeded");
        }
        result
    }
}

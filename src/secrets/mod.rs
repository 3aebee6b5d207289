//! Secret sources for the database connection string.
//!
//! This module handles:
//! - Managed identity token acquisition
//! - Key Vault secret lookup
//! - Selecting where the connection string comes from
//! - Mock store for testing

pub mod identity;
pub mod mock;
pub mod vault;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::SecretError;

pub use identity::{AccessToken, IdentityEndpoint, ManagedIdentityCredential};
pub use mock::MockSecretStore;
pub use vault::{vault_url_for, KeyVaultClient};

/// Fixed key the connection string is stored under.
pub const SQL_CONNECTION_SECRET: &str = "sql-connection-string";

/// A named-secret store.
#[async_trait]
pub trait SecretStore: Send + Sync + fmt::Debug {
    /// Fetch the value stored under `name`.
    async fn get_secret(&self, name: &str) -> Result<String, SecretError>;

    /// Human-readable location, for logs.
    fn location(&self) -> String;
}

/// Where the raw connection string will be taken from.
#[derive(Debug, Clone)]
pub enum SecretSource {
    /// Value already present in the environment.
    Explicit(String),
    /// Must be fetched from a secret store under [`SQL_CONNECTION_SECRET`].
    VaultLookup(Arc<dyn SecretStore>),
    /// Nothing to try.
    Absent,
}

impl SecretSource {
    /// Pick a source: an explicit value wins, then a configured store.
    pub fn select(explicit: Option<&str>, store: Option<Arc<dyn SecretStore>>) -> Self {
        match (explicit, store) {
            (Some(value), _) => SecretSource::Explicit(value.to_string()),
            (None, Some(store)) => SecretSource::VaultLookup(store),
            (None, None) => SecretSource::Absent,
        }
    }

    /// Build the source from configuration.
    ///
    /// A Key Vault client is only constructed when a vault name is set. A
    /// name that is not a valid vault name, or does not form a valid vault
    /// URL, is logged and dropped.
    pub fn from_config(config: &Config, http: &reqwest::Client) -> Self {
        let store = config.vault_name().and_then(|name| {
            if !config.vault_name_is_valid() {
                warn!(vault = name, "Ignoring malformed Key Vault name");
                return None;
            }
            let credential = Arc::new(ManagedIdentityCredential::from_config(http.clone(), config));
            match KeyVaultClient::for_vault(http.clone(), name, credential) {
                Ok(client) => {
                    info!(vault = %client.vault_url(), "Key Vault client configured");
                    Some(Arc::new(client) as Arc<dyn SecretStore>)
                }
                Err(e) => {
                    warn!(error = %e, "Ignoring Key Vault configuration");
                    None
                }
            }
        });

        Self::select(config.connection_string(), store)
    }

    /// Short tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SecretSource::Explicit(_) => "explicit",
            SecretSource::VaultLookup(_) => "vault",
            SecretSource::Absent => "absent",
        }
    }
}

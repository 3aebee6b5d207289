//! Key Vault secret client.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::identity::{ManagedIdentityCredential, KEY_VAULT_RESOURCE};
use super::SecretStore;
use crate::error::SecretError;

/// Key Vault REST API version.
const API_VERSION: &str = "7.4";

/// Secret bundle returned by `GET /secrets/{name}`.
#[derive(Debug, Deserialize)]
struct SecretBundle {
    value: Option<String>,
}

/// Build `https://{name}.vault.azure.net`.
pub fn vault_url_for(name: &str) -> Result<Url, SecretError> {
    if name.is_empty() {
        return Err(SecretError::InvalidVaultUrl {
            name: String::new(),
            reason: "empty vault name".to_string(),
        });
    }

    let url = Url::parse(&format!("https://{}.vault.azure.net", name)).map_err(|e| {
        SecretError::InvalidVaultUrl {
            name: name.to_string(),
            reason: e.to_string(),
        }
    })?;

    // A name carrying '/', '@' or ':' parses fine but points somewhere else.
    let expected = format!("{}.vault.azure.net", name.to_ascii_lowercase());
    if url.host_str() != Some(expected.as_str()) {
        return Err(SecretError::InvalidVaultUrl {
            name: name.to_string(),
            reason: format!("resolves to host {:?}", url.host_str()),
        });
    }

    Ok(url)
}

/// Key Vault client authenticated with a managed identity.
#[derive(Debug, Clone)]
pub struct KeyVaultClient {
    http: reqwest::Client,
    vault_url: Url,
    credential: Arc<ManagedIdentityCredential>,
}

impl KeyVaultClient {
    /// Client for the vault called `name`.
    pub fn for_vault(
        http: reqwest::Client,
        name: &str,
        credential: Arc<ManagedIdentityCredential>,
    ) -> Result<Self, SecretError> {
        Ok(Self::with_url(http, vault_url_for(name)?, credential))
    }

    /// Client for an explicit vault URL.
    pub fn with_url(
        http: reqwest::Client,
        vault_url: Url,
        credential: Arc<ManagedIdentityCredential>,
    ) -> Self {
        Self {
            http,
            vault_url,
            credential,
        }
    }

    /// Vault base URL.
    pub fn vault_url(&self) -> &Url {
        &self.vault_url
    }

    fn secret_url(&self, name: &str) -> Result<Url, SecretError> {
        let mut url = self.vault_url.clone();
        url.path_segments_mut()
            .map_err(|_| SecretError::InvalidVaultUrl {
                name: self.vault_url.to_string(),
                reason: "cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(["secrets", name]);
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        Ok(url)
    }
}

#[async_trait]
impl SecretStore for KeyVaultClient {
    #[instrument(skip(self), fields(vault = %self.vault_url))]
    async fn get_secret(&self, name: &str) -> Result<String, SecretError> {
        let token = self.credential.get_token(KEY_VAULT_RESOURCE).await?;
        let url = self.secret_url(name)?;

        let response = self
            .http
            .get(url)
            .bearer_auth(&token.access_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(SecretError::NotFound(name.to_string())),
            status => {
                return Err(SecretError::Status {
                    name: name.to_string(),
                    status: status.as_u16(),
                })
            }
        }

        let bundle: SecretBundle = response
            .json()
            .await
            .map_err(|e| SecretError::ParseError(e.to_string()))?;

        debug!(secret = %name, "Fetched secret from Key Vault");

        bundle
            .value
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SecretError::EmptySecret(name.to_string()))
    }

    fn location(&self) -> String {
        self.vault_url.to_string()
    }
}

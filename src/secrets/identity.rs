//! Managed identity token acquisition.
//!
//! Tokens come from the hosting platform: the App Service identity endpoint
//! when `IDENTITY_ENDPOINT`/`IDENTITY_HEADER` are configured, otherwise the
//! instance metadata service.

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::SecretError;

/// Token audience for Key Vault.
pub const KEY_VAULT_RESOURCE: &str = "https://vault.azure.net";

/// Token audience for Azure SQL.
pub const SQL_RESOURCE: &str = "https://database.windows.net/";

/// Instance metadata service token endpoint.
const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

const IMDS_API_VERSION: &str = "2018-02-01";
const APP_SERVICE_API_VERSION: &str = "2019-08-01";

/// Where managed identity tokens are requested from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEndpoint {
    /// App Service / Functions identity endpoint.
    AppService {
        /// Endpoint URL from `IDENTITY_ENDPOINT`.
        url: String,
        /// Shared secret from `IDENTITY_HEADER`.
        header: String,
    },
    /// VM / container instance metadata service.
    Imds {
        /// Token endpoint URL.
        url: String,
    },
}

impl IdentityEndpoint {
    /// App Service endpoint when both identity settings are present,
    /// otherwise the metadata service.
    pub fn select(url: Option<&str>, header: Option<&str>) -> Self {
        match (url, header) {
            (Some(url), Some(header)) if !url.is_empty() && !header.is_empty() => {
                IdentityEndpoint::AppService {
                    url: url.to_string(),
                    header: header.to_string(),
                }
            }
            _ => IdentityEndpoint::Imds {
                url: IMDS_ENDPOINT.to_string(),
            },
        }
    }

    /// Endpoint from `IDENTITY_ENDPOINT`/`IDENTITY_HEADER` in `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::select(
            config.identity_endpoint.as_deref(),
            config.identity_header.as_deref(),
        )
    }

    /// Short name for logs and `check-config`.
    pub fn kind(&self) -> &'static str {
        match self {
            IdentityEndpoint::AppService { .. } => "app-service",
            IdentityEndpoint::Imds { .. } => "imds",
        }
    }
}

/// Bearer token issued for a single resource.
#[derive(Clone, Deserialize)]
pub struct AccessToken {
    /// Raw bearer token.
    pub access_token: String,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken").field("access_token", &"<redacted>").finish()
    }
}

/// Ambient credential backed by the platform's managed identity.
#[derive(Debug, Clone)]
pub struct ManagedIdentityCredential {
    http: reqwest::Client,
    endpoint: IdentityEndpoint,
    client_id: Option<String>,
}

impl ManagedIdentityCredential {
    /// Credential using the endpoint and client id from `config`.
    pub fn from_config(http: reqwest::Client, config: &Config) -> Self {
        Self::with_endpoint(
            http,
            IdentityEndpoint::from_config(config),
            config.azure_client_id.clone(),
        )
    }

    /// Credential bound to an explicit endpoint.
    pub fn with_endpoint(
        http: reqwest::Client,
        endpoint: IdentityEndpoint,
        client_id: Option<String>,
    ) -> Self {
        Self {
            http,
            endpoint,
            client_id: client_id.filter(|id| !id.is_empty()),
        }
    }

    /// Request a token for `resource`.
    #[instrument(skip(self))]
    pub async fn get_token(&self, resource: &str) -> Result<AccessToken, SecretError> {
        let mut query = vec![("resource", resource)];
        if let Some(client_id) = &self.client_id {
            query.push(("client_id", client_id.as_str()));
        }

        let request = match &self.endpoint {
            IdentityEndpoint::AppService { url, header } => {
                query.push(("api-version", APP_SERVICE_API_VERSION));
                self.http
                    .get(url)
                    .header("X-IDENTITY-HEADER", header)
                    .query(&query)
            }
            IdentityEndpoint::Imds { url } => {
                query.push(("api-version", IMDS_API_VERSION));
                self.http.get(url).header("Metadata", "true").query(&query)
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| SecretError::Identity(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SecretError::Identity(format!("HTTP {} - {}", status, body)));
        }

        let token: AccessToken = response
            .json()
            .await
            .map_err(|e| SecretError::ParseError(format!("token response: {}", e)))?;

        debug!("Acquired managed identity token");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_debug_is_redacted() {
        let token = AccessToken {
            access_token: "secret-token".to_string(),
        };
        let printed = format!("{:?}", token);
        assert!(!printed.contains("secret-token"));
    }

    #[test]
    fn app_service_endpoint_needs_both_settings() {
        let config = Config {
            identity_endpoint: Some("http://127.0.0.1:41741/msi/token".to_string()),
            identity_header: Some("shared-secret".to_string()),
            ..Config::default()
        };
        assert_eq!(
            IdentityEndpoint::from_config(&config),
            IdentityEndpoint::AppService {
                url: "http://127.0.0.1:41741/msi/token".to_string(),
                header: "shared-secret".to_string(),
            }
        );

        let config = Config {
            identity_header: None,
            ..config
        };
        assert_eq!(IdentityEndpoint::from_config(&config).kind(), "imds");
        assert_eq!(IdentityEndpoint::from_config(&Config::default()).kind(), "imds");
    }

    #[test]
    fn credential_takes_client_id_from_config() {
        let config = Config {
            azure_client_id: Some("client-123".to_string()),
            ..Config::default()
        };
        let credential = ManagedIdentityCredential::from_config(reqwest::Client::new(), &config);
        assert_eq!(credential.client_id.as_deref(), Some("client-123"));
        assert_eq!(credential.endpoint.kind(), "imds");
    }

    #[test]
    fn empty_client_id_is_ignored() {
        let credential = ManagedIdentityCredential::with_endpoint(
            reqwest::Client::new(),
            IdentityEndpoint::Imds {
                url: IMDS_ENDPOINT.to_string(),
            },
            Some(String::new()),
        );
        assert!(credential.client_id.is_none());
    }
}

//! Application configuration loaded from environment variables.

use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};

/// Application configuration loaded from environment variables.
///
/// Both services read the same struct; each one only consults the fields
/// it needs.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Server Configuration ===
    /// HTTP listen port.
    #[serde(default = "default_port")]
    pub port: u16,

    // === Frontend ===
    /// Base URL of the backend service.
    #[serde(default = "default_backend_url")]
    pub backend_api_url: String,

    /// Upper bound on a single call to the backend, in milliseconds.
    #[serde(default = "default_backend_timeout")]
    pub backend_timeout_ms: u64,

    // === Backend: database ===
    /// Explicit SQL connection string (takes precedence over Key Vault).
    #[serde(default)]
    pub sql_connection_string: Option<String>,

    /// Key Vault holding the `sql-connection-string` secret.
    #[serde(default)]
    pub key_vault_name: Option<String>,

    /// Client id of a user-assigned managed identity.
    #[serde(default)]
    pub azure_client_id: Option<String>,

    /// App Service managed identity endpoint, set by the platform.
    #[serde(default)]
    pub identity_endpoint: Option<String>,

    /// Shared secret for the App Service identity endpoint.
    #[serde(default)]
    pub identity_header: Option<String>,

    /// Upper bound on the database liveness probe, in milliseconds.
    #[serde(default = "default_db_connect_timeout")]
    pub db_connect_timeout_ms: u64,

    // === Observability ===
    /// Expose a Prometheus scrape endpoint.
    #[serde(default)]
    pub metrics_enabled: bool,

    /// Port for the Prometheus scrape endpoint.
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub log_json: bool,
}

fn default_port() -> u16 {
    8080
}

fn default_backend_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_backend_timeout() -> u64 {
    10_000
}

fn default_db_connect_timeout() -> u64 {
    15_000
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            backend_api_url: default_backend_url(),
            backend_timeout_ms: default_backend_timeout(),
            sql_connection_string: None,
            key_vault_name: None,
            azure_client_id: None,
            identity_endpoint: None,
            identity_header: None,
            db_connect_timeout_ms: default_db_connect_timeout(),
            metrics_enabled: false,
            metrics_port: default_metrics_port(),
            rust_log: default_log_level(),
            log_json: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Ok(envy::from_env()?)
    }

    /// Check every setting, as `check-config` reports them.
    pub fn validate(&self) -> Result<()> {
        self.validate_frontend()?;
        self.validate_backend()
    }

    /// Settings the frontend cannot run without.
    pub fn validate_frontend(&self) -> Result<()> {
        match Url::parse(&self.backend_api_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(AppError::Validation(format!(
                    "BACKEND_API_URL must use http or https, got {}",
                    url.scheme()
                )));
            }
            Err(e) => {
                return Err(AppError::Validation(format!(
                    "BACKEND_API_URL is not a valid URL: {}",
                    e
                )))
            }
        }

        if self.backend_timeout_ms == 0 {
            return Err(AppError::Validation(
                "BACKEND_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Settings the backend cannot run without.
    ///
    /// Database settings are not checked here: a bad vault name or
    /// connection string leaves the database unconfigured instead.
    pub fn validate_backend(&self) -> Result<()> {
        if self.db_connect_timeout_ms == 0 {
            return Err(AppError::Validation(
                "DB_CONNECT_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Explicit connection string, with blank values treated as unset.
    pub fn connection_string(&self) -> Option<&str> {
        non_blank(self.sql_connection_string.as_deref())
    }

    /// Key Vault name, with blank values treated as unset.
    pub fn vault_name(&self) -> Option<&str> {
        non_blank(self.key_vault_name.as_deref())
    }

    /// Whether the configured vault name is a usable Key Vault name.
    /// An unset name counts as valid.
    pub fn vault_name_is_valid(&self) -> bool {
        self.vault_name().map_or(true, is_valid_vault_name)
    }

    /// Backend base URL without a trailing slash.
    pub fn backend_base_url(&self) -> &str {
        self.backend_api_url.trim_end_matches('/')
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Key Vault names are DNS labels: 3-24 chars, alphanumerics and hyphens,
/// starting with a letter and not ending with a hyphen.
fn is_valid_vault_name(name: &str) -> bool {
    let len_ok = (3..=24).contains(&name.len());
    let chars_ok = name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    let starts_ok = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    len_ok && chars_ok && starts_ok && !name.ends_with('-')
}

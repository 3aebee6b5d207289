//! Unified error types for both services.

use thiserror::Error;

/// Top-level error for startup and configuration.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Managed identity and Key Vault errors.
#[derive(Error, Debug)]
pub enum SecretError {
    /// The vault URL could not be built from the vault name.
    #[error("invalid vault url for '{name}': {reason}")]
    InvalidVaultUrl {
        /// Vault name as configured.
        name: String,
        /// Parser message.
        reason: String,
    },

    /// Acquiring a managed identity token failed.
    #[error("managed identity token request failed: {0}")]
    Identity(String),

    /// The vault answered with a non-success status.
    #[error("secret {name} request failed: HTTP {status}")]
    Status {
        /// Secret name.
        name: String,
        /// HTTP status code.
        status: u16,
    },

    /// The secret exists but carries no value.
    #[error("secret {0} has no value")]
    EmptySecret(String),

    /// The secret was not present in the store.
    #[error("secret {0} not found")]
    NotFound(String),

    /// Failed to parse a response body.
    #[error("failed to parse secret response: {0}")]
    ParseError(String),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Database probe errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// The descriptor is missing a field required to connect.
    #[error("connection string has no {0} value")]
    MissingField(&'static str),

    /// Could not obtain an access token for the database.
    #[error("failed to acquire database token: {0}")]
    Token(#[from] SecretError),

    /// Connecting to the server failed.
    #[error("failed to connect to {server}: {reason}")]
    ConnectFailed {
        /// Server that was dialled.
        server: String,
        /// Reason for failure.
        reason: String,
    },

    /// The liveness query failed.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// The probe did not finish in time.
    #[error("database probe timed out after {0}ms")]
    Timeout(u64),
}

/// Errors from a single bounded call to a remote service.
///
/// The display text is what callers surface as `error` in degraded
/// responses, so it stays short and free of internal detail.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The call did not complete within its deadline.
    #[error("timeout of {0}ms exceeded")]
    Timeout(u64),

    /// Connection refused, DNS failure, reset, etc.
    #[error("connection failed: {0}")]
    Unreachable(String),

    /// The remote answered with a non-2xx status.
    #[error("request failed with status code {0}")]
    Status(u16),

    /// The request could not be built (bad URL and the like).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl RemoteError {
    /// Whether the call was abandoned because the deadline elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, RemoteError::Timeout(_))
    }

    /// Classify a reqwest error for a call bounded by `timeout_ms`.
    pub fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            RemoteError::Timeout(timeout_ms)
        } else if let Some(status) = err.status() {
            RemoteError::Status(status.as_u16())
        } else if err.is_builder() {
            RemoteError::InvalidRequest(err.to_string())
        } else {
            RemoteError::Unreachable(err.to_string())
        }
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

//! Connection descriptor and connection-string parsing.
//!
//! Parsing is total: every input yields a descriptor, unrecognised or
//! missing fields simply come back as `None`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use strum::Display;

/// Default SQL Server port.
pub const DEFAULT_SQL_PORT: u16 = 1433;

/// `[tcp:]host[,port]` in a `Server=` value.
static SERVER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i:tcp:)?\s*(?P<host>[^,]*?)\s*(?:,(?P<port>.*))?$")
        .expect("server pattern is valid")
});

/// How the service authenticates to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AuthMode {
    /// Platform-supplied managed identity.
    ManagedIdentity,
}

/// Resolved, typed view of how to reach the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDescriptor {
    /// Hostname, without `tcp:` prefix or port suffix.
    pub server: Option<String>,
    /// Database name.
    pub database: Option<String>,
    /// Port from the `Server=` suffix, or 1433.
    pub port: u16,
    /// Authentication mode.
    pub auth_mode: AuthMode,
    /// Always true.
    pub encrypt: bool,
    /// Always false.
    pub trust_server_certificate: bool,
}

impl ConnectionDescriptor {
    /// Parse a raw connection string into a descriptor.
    pub fn from_connection_string(raw: &str) -> Self {
        let (server, port) = match extract_field(raw, "Server") {
            Some(value) => split_server(&value),
            None => (None, DEFAULT_SQL_PORT),
        };

        Self {
            server,
            database: extract_field(raw, "Database"),
            port,
            auth_mode: AuthMode::ManagedIdentity,
            encrypt: true,
            trust_server_certificate: false,
        }
    }

    /// Whether both server and database were found.
    pub fn is_complete(&self) -> bool {
        self.server.is_some() && self.database.is_some()
    }
}

/// Look up `key` in a `;`-separated list of `key=value` tokens.
///
/// Keys match case-insensitively; the first match wins. Empty values count
/// as missing.
pub fn extract_field(raw: &str, key: &str) -> Option<String> {
    raw.split(';')
        .filter_map(|token| token.split_once('='))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case(key))
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Split a `Server=` value into host and port.
fn split_server(value: &str) -> (Option<String>, u16) {
    let Some(caps) = SERVER_PATTERN.captures(value) else {
        return (None, DEFAULT_SQL_PORT);
    };

    let host = caps
        .name("host")
        .map(|m| m.as_str())
        .filter(|h| !h.is_empty())
        .map(str::to_string);
    let port = caps
        .name("port")
        .and_then(|m| m.as_str().trim().parse().ok())
        .unwrap_or(DEFAULT_SQL_PORT);

    (host, port)
}

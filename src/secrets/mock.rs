//! In-memory secret store for unit testing.
//!
//! Records every lookup so tests can assert whether the vault path was
//! taken at all.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::SecretStore;
use crate::error::SecretError;

/// Mock secret store.
#[derive(Debug, Clone, Default)]
pub struct MockSecretStore {
    secrets: Arc<Mutex<HashMap<String, String>>>,
    fail_with: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl MockSecretStore {
    /// Empty store; every lookup reports `NotFound`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that fails every lookup with `reason`.
    pub fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// Add a secret.
    pub fn with_secret(self, name: &str, value: &str) -> Self {
        self.secrets
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Number of lookups made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for MockSecretStore {
    async fn get_secret(&self, name: &str) -> Result<String, SecretError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = &self.fail_with {
            return Err(SecretError::Identity(reason.clone()));
        }

        match self.secrets.lock().unwrap().get(name) {
            Some(value) if value.is_empty() => Err(SecretError::EmptySecret(name.to_string())),
            Some(value) => Ok(value.clone()),
            None => Err(SecretError::NotFound(name.to_string())),
        }
    }

    fn location(&self) -> String {
        "mock://secrets".to_string()
    }
}

//! Core traits and types for secret storage

use thiserror::Error;

/// Information about a secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretInfo {
    /// Whether the secret exists
    pub available: bool,
    /// Which store provided the secret
    pub source: String,
}

impl SecretInfo {
    pub fn new(available: bool, source: impl Into<String>) -> Self {
        Self {
            available,
            source: source.into(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            available: false,
            source: "none".to_string(),
        }
    }
}

/// Errors that can occur during secret store operations
#[derive(Error, Debug)]
pub enum SecretStoreError {
    #[error("Store is read-only")]
    ReadOnly,

    #[error("Store not available: {0}")]
    NotAvailable(String),

    #[error("Store error: {0}")]
    Other(String),
}

pub type SecretStoreResult<T> = Result<T, SecretStoreError>;

/// Trait for secret storage implementations
///
/// Keys are either a model provider id (`anthropic`) or a literal
/// variable name (`ANTHROPIC_API_KEY`); stores map the former as they see fit.
pub trait SecretStore: Send + Sync {
    /// Human-readable name of this store
    fn name(&self) -> &str;

    /// Check if this store is available
    fn is_available(&self) -> bool {
        true
    }

    /// Retrieve a secret by key
    fn get(&self, key: &str) -> Option<String>;

    /// Store a secret
    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()>;

    /// Delete a secret
    fn delete(&self, key: &str) -> SecretStoreResult<()>;

    /// Check if a secret exists
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Get information about a secret
    fn get_info(&self, key: &str) -> SecretInfo {
        if self.has(key) {
            SecretInfo::new(true, self.name())
        } else {
            SecretInfo::not_found()
        }
    }
}

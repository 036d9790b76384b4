//! System keychain secret store
//!
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring, KWallet)

use keyring::Entry;

use super::traits::{SecretStore, SecretStoreError, SecretStoreResult};

/// Secret store backed by the OS keychain, namespaced by a service name
pub struct KeychainSecretStore {
    service_name: String,
}

impl KeychainSecretStore {
    /// Keychain store with the default service name "toolmux"
    pub fn new() -> Self {
        Self::with_service("toolmux")
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service_name: service.into(),
        }
    }

    fn entry(&self, key: &str) -> SecretStoreResult<Entry> {
        Entry::new(&self.service_name, key)
            .map_err(|e| SecretStoreError::Other(format!("Failed to create keychain entry: {}", e)))
    }
}

impl Default for KeychainSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for KeychainSecretStore {
    fn name(&self) -> &str {
        "keychain"
    }

    fn is_available(&self) -> bool {
        // Fails on headless hosts without a keychain daemon
        Entry::new(&self.service_name, "__toolmux_availability_check__").is_ok()
    }

    fn get(&self, key: &str) -> Option<String> {
        self.entry(key).ok()?.get_password().ok()
    }

    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| SecretStoreError::Other(format!("Failed to store in keychain: {}", e)))
    }

    fn delete(&self, key: &str) -> SecretStoreResult<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(SecretStoreError::Other(format!("Failed to delete from keychain: {}", e))),
        }
    }
}

//! Chained secret store with fallback behavior

use std::sync::Arc;

use super::env_store::EnvSecretStore;
use super::keychain_store::KeychainSecretStore;
use super::traits::{SecretStore, SecretInfo, SecretStoreError, SecretStoreResult};

/// Tries each store in order; the first available store holding the key wins
///
/// Writes go to the first store that accepts them.
pub struct ChainSecretStore {
    stores: Vec<Arc<dyn SecretStore>>,
}

impl ChainSecretStore {
    pub fn new(stores: Vec<Arc<dyn SecretStore>>) -> Self {
        Self { stores }
    }

    pub fn stores(&self) -> &[Arc<dyn SecretStore>] {
        &self.stores
    }

    /// Find which store has a key
    pub fn find_store(&self, key: &str) -> Option<&Arc<dyn SecretStore>> {
        self.stores
            .iter()
            .find(|store| store.is_available() && store.has(key))
    }
}

/// Environment first, then the OS keychain
pub fn default_chain() -> ChainSecretStore {
    ChainSecretStore::new(vec![
        Arc::new(EnvSecretStore::new()),
        Arc::new(KeychainSecretStore::new()),
    ])
}

impl SecretStore for ChainSecretStore {
    fn name(&self) -> &str {
        "chain"
    }

    fn is_available(&self) -> bool {
        self.stores.iter().any(|s| s.is_available())
    }

    fn get(&self, key: &str) -> Option<String> {
        self.stores
            .iter()
            .filter(|store| store.is_available())
            .find_map(|store| store.get(key))
    }

    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()> {
        for store in self.stores.iter().filter(|s| s.is_available()) {
            match store.store(key, value) {
                Err(SecretStoreError::ReadOnly) => continue,
                other => return other,
            }
        }
        Err(SecretStoreError::ReadOnly)
    }

    fn delete(&self, key: &str) -> SecretStoreResult<()> {
        // Read-only stores keep their copy; that is not an error here
        for store in &self.stores {
            if store.has(key) {
                let _ = store.delete(key);
            }
        }
        Ok(())
    }

    fn get_info(&self, key: &str) -> SecretInfo {
        match self.find_store(key) {
            Some(store) => SecretInfo::new(true, store.name()),
            None => SecretInfo::not_found(),
        }
    }
}

impl std::fmt::Debug for ChainSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.stores.iter().map(|s| s.name()).collect();
        f.debug_struct("ChainSecretStore").field("stores", &names).finish()
    }
}

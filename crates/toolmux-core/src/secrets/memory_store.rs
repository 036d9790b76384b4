//! In-memory secret store

use std::collections::HashMap;

use parking_lot::RwLock;

use super::traits::{SecretStore, SecretStoreResult};

/// In-memory, read-write secret store for tests and ephemeral keys
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory store with initial values
    pub fn with_secrets(initial: HashMap<String, String>) -> Self {
        Self {
            secrets: RwLock::new(initial),
        }
    }

    pub fn len(&self) -> usize {
        self.secrets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SecretStore for MemorySecretStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.secrets.read().get(key).cloned()
    }

    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()> {
        self.secrets.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> SecretStoreResult<()> {
        self.secrets.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_crud() {
        let store = MemorySecretStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("anthropic"), None);

        store.store("anthropic", "sk-ant").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("anthropic"), Some("sk-ant".to_string()));

        let info = store.get_info("anthropic");
        assert!(info.available);
        assert_eq!(info.source, "memory");

        store.delete("anthropic").unwrap();
        assert!(!store.has("anthropic"));
    }

    #[test]
    fn test_memory_store_with_initial() {
        let mut initial = HashMap::new();
        initial.insert("openai".to_string(), "sk-oai".to_string());

        let store = MemorySecretStore::with_secrets(initial);
        assert_eq!(store.get("openai"), Some("sk-oai".to_string()));
    }
}

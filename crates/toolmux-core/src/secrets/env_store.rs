//! Environment variable secret store

use std::collections::HashMap;
use std::env;

use once_cell::sync::Lazy;

use super::traits::{SecretStore, SecretStoreError, SecretStoreResult};

/// Mapping from model provider ids to environment variable names
static ENV_VAR_MAP: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("anthropic", vec!["ANTHROPIC_API_KEY"]);
    m.insert("openai", vec!["OPENAI_API_KEY"]);
    m.insert("gemini", vec!["GEMINI_API_KEY", "GOOGLE_API_KEY"]);
    m.insert("groq", vec!["GROQ_API_KEY"]);
    m.insert("ollama", vec![]);
    m
});

/// Read-only secret store backed by environment variables
///
/// `get("anthropic")` checks `ANTHROPIC_API_KEY`; unknown ids fall back to
/// `<ID>_API_KEY`; literal variable names are read as-is.
#[derive(Debug, Default)]
pub struct EnvSecretStore {
    _private: (),
}

impl EnvSecretStore {
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn read(name: &str) -> Option<String> {
        env::var(name).ok().filter(|v| !v.is_empty())
    }
}

impl SecretStore for EnvSecretStore {
    fn name(&self) -> &str {
        "env"
    }

    fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = Self::read(key) {
            return Some(value);
        }

        if let Some(env_vars) = ENV_VAR_MAP.get(key.to_lowercase().as_str()) {
            if let Some(value) = env_vars.iter().find_map(|name| Self::read(name)) {
                return Some(value);
            }
        }

        Self::read(&format!("{}_API_KEY", key.to_uppercase()))
    }

    fn store(&self, _key: &str, _value: &str) -> SecretStoreResult<()> {
        Err(SecretStoreError::ReadOnly)
    }

    fn delete(&self, _key: &str) -> SecretStoreResult<()> {
        Err(SecretStoreError::ReadOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_store_read_only() {
        let store = EnvSecretStore::new();
        assert_eq!(store.name(), "env");
        assert!(matches!(store.store("test", "value"), Err(SecretStoreError::ReadOnly)));
        assert!(matches!(store.delete("test"), Err(SecretStoreError::ReadOnly)));
    }

    #[test]
    fn test_env_store_get_direct() {
        env::set_var("TOOLMUX_TEST_SECRET_12345", "test_value");

        let store = EnvSecretStore::new();
        assert_eq!(store.get("TOOLMUX_TEST_SECRET_12345"), Some("test_value".to_string()));

        env::remove_var("TOOLMUX_TEST_SECRET_12345");
    }

    #[test]
    fn test_env_store_suffix_fallback() {
        env::set_var("TOOLMUXPROBE_API_KEY", "sk-probe");

        let store = EnvSecretStore::new();
        assert_eq!(store.get("toolmuxprobe"), Some("sk-probe".to_string()));
        assert!(store.get_info("toolmuxprobe").available);

        env::remove_var("TOOLMUXPROBE_API_KEY");
    }

    #[test]
    fn test_env_store_get_not_found() {
        let store = EnvSecretStore::new();
        assert_eq!(store.get("nonexistent_provider_xyz"), None);
        assert!(!store.get_info("nonexistent_provider_xyz").available);
    }
}

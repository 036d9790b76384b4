//! Configuration provider trait

use async_trait::async_trait;
use crate::types::ServerConfig;

/// Source of tool-provider configuration
///
/// Server names compare case-insensitively. List order is registration order.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Get all configured servers, in registration order
    async fn get_servers(&self) -> Vec<ServerConfig>;

    /// Replace a server's configuration
    async fn update_server(&self, name: &str, config: ServerConfig) -> ConfigResult<()>;

    /// Append a new server
    async fn add_server(&self, config: ServerConfig) -> ConfigResult<()>;

    /// Remove a server
    async fn remove_server(&self, name: &str) -> ConfigResult<()>;
}

/// Errors that can occur during configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Server not found: {0}")]
    ServerNotFound(String),

    #[error("Server already exists: {0}")]
    ServerExists(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Other(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Shared list edits used by every provider
pub(crate) fn position_of(servers: &[ServerConfig], name: &str) -> Option<usize> {
    let name_lower = name.to_lowercase();
    servers.iter().position(|s| s.name.to_lowercase() == name_lower)
}

pub(crate) fn insert_server(servers: &mut Vec<ServerConfig>, config: ServerConfig) -> ConfigResult<()> {
    if position_of(servers, &config.name).is_some() {
        return Err(ConfigError::ServerExists(config.name));
    }
    servers.push(config);
    Ok(())
}

pub(crate) fn replace_server(servers: &mut [ServerConfig], name: &str, config: ServerConfig) -> ConfigResult<()> {
    let pos = position_of(servers, name).ok_or_else(|| ConfigError::ServerNotFound(name.to_string()))?;
    servers[pos] = config;
    Ok(())
}

pub(crate) fn delete_server(servers: &mut Vec<ServerConfig>, name: &str) -> ConfigResult<()> {
    let pos = position_of(servers, name).ok_or_else(|| ConfigError::ServerNotFound(name.to_string()))?;
    servers.remove(pos);
    Ok(())
}

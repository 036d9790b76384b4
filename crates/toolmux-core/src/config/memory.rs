//! In-memory configuration provider

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::types::ServerConfig;
use super::traits::{delete_server, insert_server, replace_server, ConfigProvider, ConfigResult};

/// In-memory configuration provider for testing
#[derive(Debug, Default)]
pub struct MemoryConfigProvider {
    servers: RwLock<Vec<ServerConfig>>,
}

impl MemoryConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_servers(servers: Vec<ServerConfig>) -> Self {
        Self {
            servers: RwLock::new(servers),
        }
    }
}

#[async_trait]
impl ConfigProvider for MemoryConfigProvider {
    async fn get_servers(&self) -> Vec<ServerConfig> {
        self.servers.read().clone()
    }

    async fn update_server(&self, name: &str, config: ServerConfig) -> ConfigResult<()> {
        replace_server(&mut self.servers.write(), name, config)
    }

    async fn add_server(&self, config: ServerConfig) -> ConfigResult<()> {
        insert_server(&mut self.servers.write(), config)
    }

    async fn remove_server(&self, name: &str) -> ConfigResult<()> {
        delete_server(&mut self.servers.write(), name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    #[tokio::test]
    async fn test_memory_config_provider() {
        let config = MemoryConfigProvider::new();
        assert!(config.get_servers().await.is_empty());

        config
            .add_server(ServerConfig::http("jokes", "http://localhost:8090/mcp"))
            .await
            .unwrap();
        config
            .add_server(ServerConfig::stdio("local", "python", vec!["server.py".into()]))
            .await
            .unwrap();

        // Registration order is preserved
        let names: Vec<String> = config.get_servers().await.into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["jokes", "local"]);

        // Can't add duplicate (case insensitive)
        assert!(matches!(
            config.add_server(ServerConfig::http("JOKES", "http://other/mcp")).await,
            Err(ConfigError::ServerExists(_))
        ));

        config
            .update_server("jokes", ServerConfig::http("jokes", "http://remote:9000/mcp").disabled())
            .await
            .unwrap();
        assert!(!config.get_servers().await[0].enabled);

        config.remove_server("Jokes").await.unwrap();
        assert_eq!(config.get_servers().await.len(), 1);

        assert!(matches!(
            config.remove_server("jokes").await,
            Err(ConfigError::ServerNotFound(_))
        ));
    }
}

//! Provider transports behind one async seam

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use super::outcome::ToolOutcome;
use crate::logging::Logger;
use crate::mcp::{McpClient, McpError, McpResult, McpTool};
use crate::types::Tool;

/// How a provider is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Local,
    Remote,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Local => write!(f, "local"),
            ProviderKind::Remote => write!(f, "remote"),
        }
    }
}

/// One tool provider, whatever the transport
///
/// Implementations must be safe to share across tasks; the registry hands
/// out the same instance to every concurrent caller.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Tools the provider currently advertises
    async fn list_tools(&self) -> McpResult<Vec<Tool>>;

    /// Run one tool and return its transport-shaped result
    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutcome>;

    /// Release whatever the provider holds open
    async fn close(&self) -> McpResult<()>;
}

fn descriptor(tool: McpTool) -> Tool {
    let schema = Value::Object(tool.input_schema.as_ref().clone());
    Tool::new(
        tool.name.to_string(),
        tool.description.map(|d| d.to_string()).unwrap_or_default(),
    )
    .with_schema(schema)
}

fn to_json<T: Serialize>(value: &T) -> McpResult<Value> {
    serde_json::to_value(value).map_err(|e| McpError::Protocol(e.to_string()))
}

/// Child-process provider holding one session for its whole lifetime
pub struct LocalProvider {
    client: RwLock<Option<McpClient>>,
}

impl LocalProvider {
    /// Spawn the provider and complete the handshake
    pub async fn connect(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        logger: Arc<dyn Logger>,
    ) -> McpResult<Self> {
        let client = McpClient::connect_child_process(command, args, env, logger).await?;
        Ok(Self {
            client: RwLock::new(Some(client)),
        })
    }
}

fn session_closed() -> McpError {
    McpError::Transport("session closed".to_string())
}

#[async_trait]
impl ToolProvider for LocalProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    async fn list_tools(&self) -> McpResult<Vec<Tool>> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or_else(session_closed)?;
        let tools = client.list_tools().await?;
        Ok(tools.into_iter().map(descriptor).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutcome> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or_else(session_closed)?;
        let result = client.call_tool(name, arguments).await?;
        Ok(ToolOutcome::Local(to_json(&result)?))
    }

    async fn close(&self) -> McpResult<()> {
        let client = self.client.write().await.take();
        match client {
            Some(client) => client.close().await,
            None => Ok(()),
        }
    }
}

/// HTTP provider; nothing is held open between operations
pub struct RemoteProvider {
    url: String,
    logger: Arc<dyn Logger>,
}

impl RemoteProvider {
    /// Probe the endpoint by listing its tools once
    pub async fn connect(url: &str, logger: Arc<dyn Logger>) -> McpResult<Self> {
        let provider = Self {
            url: url.to_string(),
            logger,
        };
        let tools = provider.list_tools().await?;
        provider.logger.debug(&format!(
            "[RemoteProvider] {} reachable, {} tools",
            provider.url,
            tools.len()
        ));
        Ok(provider)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn open(&self) -> McpResult<McpClient> {
        McpClient::connect_http(&self.url, self.logger.clone()).await
    }

    async fn release(&self, client: McpClient) {
        if let Err(e) = client.close().await {
            self.logger.debug(&format!("[RemoteProvider] Close failed for {}: {}", self.url, e));
        }
    }
}

#[async_trait]
impl ToolProvider for RemoteProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Remote
    }

    async fn list_tools(&self) -> McpResult<Vec<Tool>> {
        let client = self.open().await?;
        let result = client.list_tools().await;
        self.release(client).await;
        Ok(result?.into_iter().map(descriptor).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutcome> {
        let client = self.open().await?;
        let result = client.call_tool(name, arguments).await;
        self.release(client).await;

        let items = result?
            .content
            .iter()
            .map(to_json)
            .collect::<McpResult<Vec<_>>>()?;
        Ok(ToolOutcome::Remote(items))
    }

    async fn close(&self) -> McpResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;

    #[test]
    fn test_kind_display() {
        assert_eq!(ProviderKind::Local.to_string(), "local");
        assert_eq!(ProviderKind::Remote.to_string(), "remote");
    }

    #[tokio::test]
    async fn test_remote_connect_unreachable() {
        let result = RemoteProvider::connect("http://127.0.0.1:1/mcp", Arc::new(NoOpLogger)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_local_connect_missing_command() {
        let result = LocalProvider::connect(
            "/nonexistent/provider",
            &[],
            &HashMap::new(),
            Arc::new(NoOpLogger),
        )
        .await;
        assert!(result.is_err());
    }
}

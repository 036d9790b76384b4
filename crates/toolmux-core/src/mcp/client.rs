//! MCP client using the official rmcp SDK

use std::collections::HashMap;
use std::sync::Arc;

use rmcp::{
    ServiceExt,
    model::{CallToolRequestParams, CallToolResult, ClientCapabilities, ClientInfo, Implementation, Tool},
    service::{RunningService, ServiceError},
    transport::{ConfigureCommandExt, StreamableHttpClientTransport, TokioChildProcess},
    RoleClient,
};
use serde_json::Value;
use thiserror::Error;
use tokio::process::Command;

use crate::logging::Logger;

/// MCP client errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Failed to start provider process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// The session can no longer carry requests
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider answered with an error for this request
    #[error("Tool call failed: {0}")]
    ToolCallFailed(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl McpError {
    /// True when the session itself is unusable, not just this request
    pub fn is_transport(&self) -> bool {
        matches!(self, McpError::Transport(_) | McpError::Spawn(_))
    }

    fn from_service(error: ServiceError, on_response_error: fn(String) -> McpError) -> Self {
        match error {
            ServiceError::McpError(data) => on_response_error(data.message.to_string()),
            other => McpError::Transport(other.to_string()),
        }
    }
}

pub type McpResult<T> = Result<T, McpError>;

fn client_info() -> ClientInfo {
    ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "toolmux".to_string(),
            title: Some("toolmux".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            website_url: None,
            icons: None,
        },
    }
}

/// One initialized MCP session
pub struct McpClient {
    /// The underlying rmcp running service
    client: RunningService<RoleClient, ClientInfo>,
    logger: Arc<dyn Logger>,
}

impl McpClient {
    /// Spawn `command` and run the MCP handshake over its standard streams
    pub async fn connect_child_process(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        logger: Arc<dyn Logger>,
    ) -> McpResult<Self> {
        logger.info(&format!("[McpClient] Spawning provider: {} {:?}", command, args));

        let args = args.to_vec();
        let env = env.clone();
        let transport = TokioChildProcess::new(Command::new(command).configure(move |cmd| {
            cmd.args(&args);
            for (key, value) in &env {
                cmd.env(key, value);
            }
        }))
        .map_err(McpError::Spawn)?;

        let client = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::Handshake(e.to_string()))?;

        logger.info("[McpClient] Child process session initialized");

        Ok(Self { client, logger })
    }

    /// Open a Streamable HTTP session and run the handshake
    pub async fn connect_http(url: &str, logger: Arc<dyn Logger>) -> McpResult<Self> {
        logger.debug(&format!("[McpClient] Connecting to HTTP: {}", url));

        let transport = StreamableHttpClientTransport::from_uri(url.to_string());

        let client = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::Handshake(e.to_string()))?;

        Ok(Self { client, logger })
    }

    /// List all available tools
    pub async fn list_tools(&self) -> McpResult<Vec<Tool>> {
        let result = self
            .client
            .list_tools(Default::default())
            .await
            .map_err(|e| McpError::from_service(e, McpError::Protocol))?;

        self.logger.debug(&format!("[McpClient] Listed {} tools", result.tools.len()));

        Ok(result.tools)
    }

    /// Call a tool by name
    pub async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<CallToolResult> {
        self.logger.debug(&format!("[McpClient] Calling tool: {}", name));

        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: arguments.as_object().cloned(),
            task: None,
        };

        self.client
            .call_tool(params)
            .await
            .map_err(|e| McpError::from_service(e, McpError::ToolCallFailed))
    }

    /// Server-reported name, if the handshake carried one
    pub fn server_name(&self) -> Option<String> {
        self.client.peer_info().map(|info| info.server_info.name.clone())
    }

    /// Close the session; for child processes this also ends the process
    pub async fn close(self) -> McpResult<()> {
        self.logger.debug("[McpClient] Closing connection");
        self.client
            .cancel()
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;
        Ok(())
    }
}

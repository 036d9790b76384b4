//! The named collection of provider connections

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;

use super::error::{ConnectError, InvokeError};
use super::outcome::ToolOutcome;
use super::provider::{LocalProvider, ProviderKind, RemoteProvider, ToolProvider};
use crate::logging::Logger;
use crate::types::{ServerConfig, ServerTransport, Tool};

/// Whether a connection may still receive requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    Connected,
    Failed,
}

/// One registered provider
pub struct ProviderConnection {
    name: String,
    provider: Arc<dyn ToolProvider>,
    liveness: Mutex<Liveness>,
}

impl ProviderConnection {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ProviderKind {
        self.provider.kind()
    }

    pub fn liveness(&self) -> Liveness {
        *self.liveness.lock()
    }

    pub fn is_live(&self) -> bool {
        self.liveness() == Liveness::Connected
    }

    fn mark_failed(&self) {
        *self.liveness.lock() = Liveness::Failed;
    }
}

/// Snapshot of one connection for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderSummary {
    pub name: String,
    pub kind: ProviderKind,
    pub liveness: Liveness,
}

/// Registry of tool providers in registration order
pub struct ProviderRegistry {
    connections: RwLock<Vec<Arc<ProviderConnection>>>,
    logger: Arc<dyn Logger>,
}

impl ProviderRegistry {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            connections: RwLock::new(Vec::new()),
            logger,
        }
    }

    /// Add an already-connected provider under `name`
    pub fn register(
        &self,
        name: impl Into<String>,
        provider: Arc<dyn ToolProvider>,
    ) -> Result<(), ConnectError> {
        let name = name.into();
        let mut connections = self.connections.write();
        if connections.iter().any(|c| c.name == name) {
            return Err(ConnectError::Duplicate(name));
        }

        self.logger.info(&format!(
            "[ProviderRegistry] Registered {} provider '{}'",
            provider.kind(),
            name
        ));
        connections.push(Arc::new(ProviderConnection {
            name,
            provider,
            liveness: Mutex::new(Liveness::Connected),
        }));
        Ok(())
    }

    /// Spawn a local provider process and keep its session
    pub async fn connect_local(
        &self,
        name: &str,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<(), ConnectError> {
        self.ensure_unregistered(name)?;
        let provider = LocalProvider::connect(command, args, env, self.logger.clone())
            .await
            .map_err(|source| ConnectError::Session {
                name: name.to_string(),
                source,
            })?;
        self.register(name, Arc::new(provider))
    }

    /// Validate a remote endpoint and record it
    pub async fn connect_remote(&self, name: &str, url: &str) -> Result<(), ConnectError> {
        self.ensure_unregistered(name)?;
        let provider = RemoteProvider::connect(url, self.logger.clone())
            .await
            .map_err(|source| ConnectError::Session {
                name: name.to_string(),
                source,
            })?;
        self.register(name, Arc::new(provider))
    }

    /// Connect one configured server
    pub async fn connect(&self, server: &ServerConfig) -> Result<(), ConnectError> {
        match &server.transport {
            ServerTransport::Stdio { command, args, env } => {
                self.connect_local(&server.name, command, args, env).await
            }
            ServerTransport::Http { url } => self.connect_remote(&server.name, url).await,
        }
    }

    /// Connect every enabled server in order; one failure never stops the rest
    pub async fn connect_all(&self, servers: &[ServerConfig]) -> Vec<(String, ConnectError)> {
        let mut failures = Vec::new();
        for server in servers.iter().filter(|s| s.enabled) {
            if let Err(e) = self.connect(server).await {
                self.logger.error(&format!("[ProviderRegistry] {}", e));
                failures.push((server.name.clone(), e));
            }
        }
        failures
    }

    fn ensure_unregistered(&self, name: &str) -> Result<(), ConnectError> {
        if self.get(name).is_some() {
            return Err(ConnectError::Duplicate(name.to_string()));
        }
        Ok(())
    }

    fn get(&self, name: &str) -> Option<Arc<ProviderConnection>> {
        self.connections.read().iter().find(|c| c.name == name).cloned()
    }

    /// All connections, failed ones included
    pub fn connections(&self) -> Vec<Arc<ProviderConnection>> {
        self.connections.read().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.connections.read().iter().map(|c| c.name.clone()).collect()
    }

    /// Names of connections still eligible for routing
    pub fn live_names(&self) -> Vec<String> {
        self.connections
            .read()
            .iter()
            .filter(|c| c.is_live())
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn summaries(&self) -> Vec<ProviderSummary> {
        self.connections
            .read()
            .iter()
            .map(|c| ProviderSummary {
                name: c.name.clone(),
                kind: c.kind(),
                liveness: c.liveness(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    pub fn liveness(&self, name: &str) -> Option<Liveness> {
        self.get(name).map(|c| c.liveness())
    }

    /// Only a broken persistent session takes a provider out of rotation
    fn note_failure(&self, connection: &ProviderConnection, error: &crate::mcp::McpError) {
        if error.is_transport() && connection.kind() == ProviderKind::Local {
            self.logger.error(&format!(
                "[ProviderRegistry] Provider '{}' marked failed: {}",
                connection.name, error
            ));
            connection.mark_failed();
        }
    }

    /// Tools advertised by one provider.
    ///
    /// Returns an empty list when the provider is unknown, failed or
    /// unreachable, so an empty result means "possibly unreachable".
    pub async fn list_tools(&self, name: &str) -> Vec<Tool> {
        let Some(connection) = self.get(name) else {
            self.logger.warn(&format!("[ProviderRegistry] Unknown provider: {}", name));
            return Vec::new();
        };
        if !connection.is_live() {
            return Vec::new();
        }

        match connection.provider.list_tools().await {
            Ok(tools) => tools,
            Err(e) => {
                self.logger.error(&format!(
                    "[ProviderRegistry] Listing tools from '{}' failed: {}",
                    name, e
                ));
                self.note_failure(&connection, &e);
                Vec::new()
            }
        }
    }

    /// Run `tool` on provider `name`
    pub async fn invoke(
        &self,
        name: &str,
        tool: &str,
        arguments: Value,
    ) -> Result<ToolOutcome, InvokeError> {
        let connection = self
            .get(name)
            .ok_or_else(|| InvokeError::UnknownProvider(name.to_string()))?;
        if !connection.is_live() {
            return Err(InvokeError::Unavailable(name.to_string()));
        }

        self.logger.info(&format!("[ProviderRegistry] Calling {} on '{}'", tool, name));
        connection
            .provider
            .call_tool(tool, arguments)
            .await
            .map_err(|e| {
                self.logger.error(&format!(
                    "[ProviderRegistry] {} on '{}' failed: {}",
                    tool, name, e
                ));
                self.note_failure(&connection, &e);
                InvokeError::Provider(e)
            })
    }

    /// Close every provider's session
    pub async fn disconnect_all(&self) {
        for connection in self.connections() {
            if let Err(e) = connection.provider.close().await {
                self.logger.warn(&format!(
                    "[ProviderRegistry] Closing '{}' failed: {}",
                    connection.name, e
                ));
            }
        }
        self.logger.info("[ProviderRegistry] Disconnected all providers");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-process providers shared by tests across the crate

    use super::*;
    use crate::mcp::{McpError, McpResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Provider answering from a fixed tool list, recording every call
    pub struct FakeProvider {
        pub kind: ProviderKind,
        pub tools: Vec<Tool>,
        pub reply: Mutex<Result<ToolOutcome, fn() -> McpError>>,
        pub listing: Mutex<Option<fn() -> McpError>>,
        pub calls: Mutex<Vec<(String, Value)>>,
        pub closed: AtomicBool,
    }

    impl FakeProvider {
        pub fn new(kind: ProviderKind, tools: Vec<Tool>) -> Self {
            Self {
                kind,
                tools,
                reply: Mutex::new(Ok(ToolOutcome::Remote(Vec::new()))),
                listing: Mutex::new(None),
                calls: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
            }
        }

        pub fn with_tools(names: &[&str]) -> Self {
            let tools = names
                .iter()
                .map(|n| Tool::new(*n, format!("{} tool", n)))
                .collect();
            Self::new(ProviderKind::Local, tools)
        }

        pub fn replying(self, outcome: ToolOutcome) -> Self {
            *self.reply.lock() = Ok(outcome);
            self
        }

        pub fn failing(self, error: fn() -> McpError) -> Self {
            *self.reply.lock() = Err(error);
            self
        }

        /// Make `list_tools` fail with `error`
        pub fn unlistable(self, error: fn() -> McpError) -> Self {
            *self.listing.lock() = Some(error);
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        pub fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ToolProvider for FakeProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn list_tools(&self) -> McpResult<Vec<Tool>> {
            match *self.listing.lock() {
                Some(make) => Err(make()),
                None => Ok(self.tools.clone()),
            }
        }

        async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutcome> {
            self.calls.lock().push((name.to_string(), arguments));
            match &*self.reply.lock() {
                Ok(outcome) => Ok(outcome.clone()),
                Err(make) => Err(make()),
            }
        }

        async fn close(&self) -> McpResult<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }
}

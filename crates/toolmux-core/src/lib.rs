//! toolmux core
//!
//! A conversational front end that lets a language model call tools
//! exposed by any number of MCP tool providers. The core problem is
//! multiplexing: many providers over different transports, one merged
//! tool namespace, and any number of concurrent front-end clients sharing
//! them.
//!
//! ## Pieces
//!
//! - [`registry`]: provider connections (child process or HTTP) and their lifecycle
//! - [`tools`]: the merged catalog and tool → provider routing
//! - [`conversation`]: bounded per-conversation history
//! - [`reasoning`]: the model call, real ([`GenaiReasoner`]) or scripted ([`MockReasoner`])
//! - [`orchestrator`]: the two-round "ask, dispatch tools, ask again" protocol
//! - [`frontend`]: console REPL and TCP listener
//!
//! ```rust,ignore
//! use toolmux_core::*;
//!
//! let logger: Arc<dyn Logger> = Arc::new(ConsoleLogger::new());
//! let registry = Arc::new(ProviderRegistry::new(logger.clone()));
//! registry.connect_all(&config.servers).await;
//!
//! let catalog = Arc::new(ToolCatalog::new(registry.clone(), logger.clone()));
//! let conversations = Arc::new(ConversationStore::new(10));
//! let reasoner = Arc::new(GenaiReasoner::new(config.model, secrets, logger.clone())?);
//! let orchestrator = QueryOrchestrator::new(catalog, conversations, reasoner, logger);
//!
//! let answer = orchestrator.process_query("console", "tell me a joke", None).await?;
//! ```

pub mod types;
pub mod secrets;
pub mod logging;
pub mod config;
pub mod mcp;
pub mod registry;
pub mod tools;
pub mod conversation;
pub mod reasoning;
pub mod orchestrator;
pub mod frontend;

// Re-export commonly used types
pub use types::{
    ChatMessage, ContentPart, MessageRole, MessageContent,
    Tool, ToolCall, ToolResult, StreamChunk,
    CancellationToken,
    ServerConfig, ServerTransport, ModelSettings, ListenerSettings, ConversationSettings,
};

pub use secrets::{
    SecretStore, SecretInfo, SecretStoreError, SecretStoreResult,
    EnvSecretStore, MemorySecretStore, ChainSecretStore, KeychainSecretStore, default_chain,
};

pub use logging::{Logger, NoOpLogger, ConsoleLogger, FileLogger, MemoryLogger, LogLevel};

pub use config::{ConfigProvider, ConfigError, ConfigFile, FileConfigProvider, MemoryConfigProvider};

pub use mcp::{McpClient, McpError, McpResult};

pub use registry::{
    ProviderRegistry, ProviderConnection, ProviderKind, ProviderSummary, Liveness,
    ToolProvider, LocalProvider, RemoteProvider, ToolOutcome,
    ConnectError, InvokeError, NoProvidersError,
};

pub use tools::{ToolCatalog, CatalogEntry, CollisionPolicy, ToolFilter};

pub use conversation::ConversationStore;

pub use reasoning::{ReasoningService, ReasoningError, ChatOptions, GenaiReasoner, MockReasoner, MockMode, create_reasoner};

pub use orchestrator::QueryOrchestrator;

pub use frontend::{ConsoleFrontEnd, NetworkFrontEnd, Response, run_until_first_exit};

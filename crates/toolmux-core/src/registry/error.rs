//! Registry error types

use thiserror::Error;

use crate::mcp::McpError;

/// A provider could not be brought online
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("Provider '{0}' is already registered")]
    Duplicate(String),

    #[error("Failed to connect provider '{name}': {source}")]
    Session {
        name: String,
        #[source]
        source: McpError,
    },
}

/// A tool invocation did not produce a result
#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Provider '{0}' is unavailable")]
    Unavailable(String),

    #[error("{0}")]
    Provider(#[from] McpError),
}

/// Raised when a query arrives and no provider is registered
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("No tool providers are registered")]
pub struct NoProvidersError;

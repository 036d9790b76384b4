//! MCP (Model Context Protocol) client module
//!
//! Uses the official rmcp SDK to talk to tool providers over a spawned
//! child process (stdio) or Streamable HTTP.
//!
//! # Example
//!
//! ```rust,ignore
//! use toolmux_core::mcp::McpClient;
//!
//! let client = McpClient::connect_child_process("python", &["server.py".into()], &env, logger).await?;
//! let tools = client.list_tools().await?;
//! let result = client.call_tool("tell_joke", json!({ "category": "cats" })).await?;
//! client.close().await?;
//! ```

mod client;

pub use client::{McpClient, McpError, McpResult};

// Re-export rmcp types that consumers might need
pub use rmcp::model::{Tool as McpTool, CallToolResult as McpToolResult};

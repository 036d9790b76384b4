//! Core types shared by the registry, catalog, conversation store and front ends

mod message;
mod tool;
mod stream;
mod cancellation;
mod server;

pub use message::{ChatMessage, ContentPart, MessageRole, MessageContent};
pub use tool::{Tool, ToolCall, ToolResult};
pub use stream::StreamChunk;
pub use cancellation::CancellationToken;
pub use server::{ServerConfig, ServerTransport, ModelSettings, ListenerSettings, ConversationSettings};

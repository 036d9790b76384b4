//! Reasoning-service reply chunks

use serde::{Deserialize, Serialize};
use super::tool::ToolCall;

/// One unit of a reasoning-service reply
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    /// Text content chunk
    Text {
        text: String,
    },
    /// Complete tool call
    ToolCall {
        #[serde(rename = "toolCall")]
        tool_call: ToolCall,
    },
    /// Partial tool call (arguments still arriving)
    ToolCallDelta {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(rename = "inputDelta", skip_serializing_if = "Option::is_none")]
        input_delta: Option<String>,
    },
}

impl StreamChunk {
    /// Create a text chunk
    pub fn text(text: impl Into<String>) -> Self {
        StreamChunk::Text { text: text.into() }
    }

    /// Create a tool call chunk
    pub fn tool_call(tool_call: ToolCall) -> Self {
        StreamChunk::ToolCall { tool_call }
    }

    /// Check if this is a text chunk
    pub fn is_text(&self) -> bool {
        matches!(self, StreamChunk::Text { .. })
    }

    /// Check if this is a tool call chunk
    pub fn is_tool_call(&self) -> bool {
        matches!(self, StreamChunk::ToolCall { .. })
    }

    /// Get the text content if this is a text chunk
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StreamChunk::Text { text } => Some(text),
            _ => None,
        }
    }
}

//! Tool/function calling types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::message::ContentPart;

/// Model-facing tool definition
///
/// Carries no provider ownership; routing lives in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name (function name)
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON Schema for the input parameters
    #[serde(rename = "inputSchema", skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

impl Tool {
    /// Create a new tool definition
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: None,
        }
    }

    /// Set the input schema
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }
}

/// Tool call from the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Name of the tool being called
    pub name: String,
    /// Input arguments for the tool
    pub input: Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    /// Get an input argument as a string
    pub fn get_arg_str(&self, key: &str) -> Option<&str> {
        self.input.get(key).and_then(|v| v.as_str())
    }
}

impl From<ToolCall> for ContentPart {
    fn from(call: ToolCall) -> Self {
        ContentPart::ToolUse {
            id: call.id,
            name: call.name,
            input: call.input,
        }
    }
}

/// Outcome of one dispatched tool call, fed back to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this is responding to
    #[serde(rename = "callId")]
    pub call_id: String,
    /// The normalized result text
    pub content: String,
    /// Whether this result represents an error
    #[serde(rename = "isError", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Create an error tool result; the content becomes `Error: <message>`
    pub fn error(call_id: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self {
            call_id: call_id.into(),
            content: format!("Error: {}", message),
            is_error: true,
        }
    }
}

impl From<ToolResult> for ContentPart {
    fn from(result: ToolResult) -> Self {
        ContentPart::ToolResult {
            tool_use_id: result.call_id,
            content: result.content,
            is_error: result.is_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_creation() {
        let tool = Tool::new("tell_joke", "Tell a short and funny joke")
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "category": { "type": "string" }
                }
            }));

        assert_eq!(tool.name, "tell_joke");
        assert!(tool.input_schema.is_some());
    }

    #[test]
    fn test_tool_call_args() {
        let call = ToolCall::new("toolu_1", "tell_joke", json!({ "category": "cats" }));
        assert_eq!(call.get_arg_str("category"), Some("cats"));
        assert_eq!(call.get_arg_str("missing"), None);

        let part: ContentPart = call.into();
        assert!(matches!(part, ContentPart::ToolUse { ref name, .. } if name == "tell_joke"));
    }

    #[test]
    fn test_tool_result() {
        let success = ToolResult::success("toolu_1", "ok");
        assert!(!success.is_error);
        assert_eq!(success.content, "ok");

        let error = ToolResult::error("toolu_2", "provider went away");
        assert!(error.is_error);
        assert_eq!(error.content, "Error: provider went away");

        let part: ContentPart = error.into();
        assert_eq!(part, ContentPart::tool_error("toolu_2", "Error: provider went away"));

        let part: ContentPart = success.into();
        assert!(matches!(part, ContentPart::ToolResult { is_error: false, .. }));
    }
}

//! Reasoning service trait

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};

use super::error::ReasoningResult;
use crate::types::{CancellationToken, ChatMessage, ContentPart, StreamChunk, Tool};

/// Options for one model round
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Tools the model may call
    pub tools: Vec<Tool>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Temperature for response generation (0.0 - 2.0)
    pub temperature: Option<f32>,
}

impl ChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }
}

/// Type alias for the streaming response
pub type StreamResponse = Pin<Box<dyn Stream<Item = ReasoningResult<StreamChunk>> + Send>>;

/// The external model call
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Stream one reply for `messages`
    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        options: ChatOptions,
        cancel_token: CancellationToken,
    ) -> ReasoningResult<StreamResponse>;
}

/// Fold a streamed reply into ordered content blocks.
///
/// Adjacent text chunks merge into one `Text` block; every complete tool
/// call becomes one `ToolUse` block. Partial tool-call deltas are dropped.
pub async fn collect_blocks(mut stream: StreamResponse) -> ReasoningResult<Vec<ContentPart>> {
    let mut blocks: Vec<ContentPart> = Vec::new();

    while let Some(chunk) = stream.next().await {
        match chunk? {
            StreamChunk::Text { text } => match blocks.last_mut() {
                Some(ContentPart::Text { text: current }) => current.push_str(&text),
                _ => blocks.push(ContentPart::text(text)),
            },
            StreamChunk::ToolCall { tool_call } => blocks.push(tool_call.into()),
            StreamChunk::ToolCallDelta { .. } => {}
        }
    }

    Ok(blocks)
}

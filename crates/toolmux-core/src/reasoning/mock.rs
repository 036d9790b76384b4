//! Mock reasoning service
//!
//! Deterministic replies without network access. Every request is
//! recorded so tests can inspect exactly what the model was shown.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use parking_lot::Mutex;

use super::error::{ReasoningError, ReasoningResult};
use super::traits::{ChatOptions, ReasoningService, StreamResponse};
use crate::logging::Logger;
use crate::types::{CancellationToken, ChatMessage, MessageRole, StreamChunk, Tool};

/// Mock response mode
#[derive(Debug, Clone, Default)]
pub enum MockMode {
    /// Echo back the last user text
    #[default]
    Echo,
    /// Return a fixed response
    Fixed(String),
    /// Play one scripted reply per request, in order
    Script(VecDeque<Vec<StreamChunk>>),
    /// Fail every request
    Error(String),
}

/// What one request looked like when it reached the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<Tool>,
}

/// Mock reasoning service for testing
pub struct MockReasoner {
    mode: Mutex<MockMode>,
    chunk_delay_ms: u64,
    chunk_size: usize,
    requests: Mutex<Vec<RecordedRequest>>,
    logger: Arc<dyn Logger>,
}

impl MockReasoner {
    pub fn new(mode: MockMode, logger: Arc<dyn Logger>) -> Self {
        Self {
            mode: Mutex::new(mode),
            chunk_delay_ms: 0,
            chunk_size: 10,
            requests: Mutex::new(Vec::new()),
            logger,
        }
    }

    /// Create an echo reasoner (echoes back the user message)
    pub fn echo(logger: Arc<dyn Logger>) -> Self {
        Self::new(MockMode::Echo, logger)
    }

    pub fn fixed(response: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self::new(MockMode::Fixed(response.into()), logger)
    }

    /// One reply per round; a round with no chunks is an empty reply
    pub fn scripted(rounds: Vec<Vec<StreamChunk>>, logger: Arc<dyn Logger>) -> Self {
        Self::new(MockMode::Script(rounds.into()), logger)
    }

    pub fn error(message: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self::new(MockMode::Error(message.into()), logger)
    }

    /// Set chunk delay
    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.chunk_delay_ms = delay_ms;
        self
    }

    /// Set chunk size for splitting text replies
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn last_user_text(messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .rev()
            .filter(|m| m.role == MessageRole::User)
            .map(|m| match m.text() {
                Some(text) => text.to_string(),
                None => m.parts().iter().filter_map(|p| p.as_text()).collect(),
            })
            .find(|t| !t.is_empty())
            .unwrap_or_else(|| "Hello from MockReasoner!".to_string())
    }

    /// Split text into chunks
    fn split_into_chunks(&self, text: &str) -> Vec<StreamChunk> {
        if self.chunk_size == 0 || text.is_empty() {
            return vec![StreamChunk::text(text)];
        }

        text.chars()
            .collect::<Vec<_>>()
            .chunks(self.chunk_size)
            .map(|c| StreamChunk::text(c.iter().collect::<String>()))
            .collect()
    }

    fn next_reply(&self, messages: &[ChatMessage]) -> ReasoningResult<Vec<StreamChunk>> {
        match &mut *self.mode.lock() {
            MockMode::Echo => Ok(self.split_into_chunks(&format!("Echo: {}", Self::last_user_text(messages)))),
            MockMode::Fixed(response) => Ok(self.split_into_chunks(response)),
            MockMode::Script(rounds) => rounds.pop_front().ok_or(ReasoningError::ScriptExhausted),
            MockMode::Error(message) => Err(ReasoningError::Other(format!("Mock error: {}", message))),
        }
    }
}

#[async_trait]
impl ReasoningService for MockReasoner {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        options: ChatOptions,
        cancel_token: CancellationToken,
    ) -> ReasoningResult<StreamResponse> {
        self.logger.debug(&format!(
            "MockReasoner: stream_chat called with {} messages",
            messages.len()
        ));

        let reply = self.next_reply(&messages);
        self.requests.lock().push(RecordedRequest {
            messages,
            tools: options.tools,
        });
        let chunks = reply?;

        let delay_ms = self.chunk_delay_ms;
        let stream = stream::iter(chunks.into_iter().enumerate()).then(move |(i, chunk)| {
            let cancel = cancel_token.clone();
            async move {
                if cancel.is_cancelled() {
                    return Err(ReasoningError::Cancelled);
                }
                if i > 0 && delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Ok(chunk)
            }
        });

        Ok(Box::pin(stream))
    }
}

//! GenaiReasoner - the real model call, through the genai crate

use std::sync::Arc;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use genai::chat::{ChatRequest, ChatStreamEvent};
use genai::Client;

use crate::logging::Logger;
use crate::secrets::SecretStore;
use crate::types::{CancellationToken, ChatMessage, ModelSettings};

use super::error::{ReasoningError, ReasoningResult};
use super::genai_adapter::{create_client, from_genai_event, to_genai_messages, to_genai_options, to_genai_tools};
use super::traits::{ChatOptions, ReasoningService, StreamResponse};

/// Reasoning service backed by a genai client
pub struct GenaiReasoner {
    settings: ModelSettings,
    client: Client,
    logger: Arc<dyn Logger>,
}

impl GenaiReasoner {
    /// Build a client for `settings`; fails for providers genai cannot reach
    pub fn new(
        settings: ModelSettings,
        secrets: Arc<dyn SecretStore>,
        logger: Arc<dyn Logger>,
    ) -> ReasoningResult<Self> {
        let client = create_client(&settings, secrets)?;
        Ok(Self {
            settings,
            client,
            logger,
        })
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    /// Extract model name from a model string (e.g., "anthropic/claude-3" -> "claude-3")
    pub fn extract_model_name(model: &str) -> &str {
        model.split('/').nth(1).unwrap_or(model)
    }

    /// Configured limits fill in whatever the caller left unset
    fn effective_options(&self, mut options: ChatOptions) -> ChatOptions {
        options.max_tokens = options.max_tokens.or(Some(self.settings.max_tokens));
        options.temperature = options.temperature.or(self.settings.temperature);
        options
    }
}

#[async_trait]
impl ReasoningService for GenaiReasoner {
    fn name(&self) -> &str {
        &self.settings.provider
    }

    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        options: ChatOptions,
        cancel_token: CancellationToken,
    ) -> ReasoningResult<StreamResponse> {
        let options = self.effective_options(options);
        let model_name = Self::extract_model_name(&self.settings.model);

        self.logger.info(&format!(
            "[GenaiReasoner] stream_chat: provider={}, model={}, messages={}, tools={}",
            self.settings.provider,
            model_name,
            messages.len(),
            options.tools.len()
        ));

        let mut chat_req = ChatRequest::new(to_genai_messages(messages));
        if !options.tools.is_empty() {
            chat_req = chat_req.with_tools(to_genai_tools(options.tools.clone()));
        }
        let genai_options = to_genai_options(&options);

        let provider = self.settings.provider.clone();
        let chat_stream = self
            .client
            .exec_chat_stream(model_name, chat_req, Some(&genai_options))
            .await
            .map_err(|e| ReasoningError::api(provider.clone(), e.to_string()))?;

        let logger = Arc::clone(&self.logger);

        let stream = chat_stream
            .stream
            .map(move |result| {
                if cancel_token.is_cancelled() {
                    logger.info("[GenaiReasoner] Stream cancelled");
                    return vec![Err(ReasoningError::Cancelled)];
                }

                match result {
                    Ok(event) => {
                        match &event {
                            ChatStreamEvent::Chunk(c) => logger.debug(&format!(
                                "[GenaiReasoner] Stream event: Chunk ({} chars)",
                                c.content.len()
                            )),
                            ChatStreamEvent::End(_) => logger.debug("[GenaiReasoner] Stream event: End"),
                            _ => {}
                        }
                        from_genai_event(event)
                    }
                    Err(e) => {
                        logger.error(&format!("[GenaiReasoner] Stream error: {}", e));
                        vec![Err(ReasoningError::api(provider.clone(), e.to_string()))]
                    }
                }
            })
            .flat_map(stream::iter);

        Ok(Box::pin(stream))
    }
}

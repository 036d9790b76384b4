//! The two-round query protocol

use std::sync::Arc;

use crate::conversation::ConversationStore;
use crate::logging::Logger;
use crate::reasoning::{collect_blocks, ChatOptions, ReasoningResult, ReasoningService};
use crate::registry::{NoProvidersError, ProviderRegistry};
use crate::tools::ToolCatalog;
use crate::types::{CancellationToken, ChatMessage, ContentPart, MessageRole, Tool, ToolCall, ToolResult};

/// Answer when the first round produced neither text nor tool calls
pub const NO_RESPONSE: &str = "No response generated.";

/// Answer when the round after tool dispatch produced no text
pub const TASK_COMPLETED: &str = "Task completed.";

enum QueryState {
    Seed,
    Catalog,
    FirstRound { tools: Vec<Tool> },
    Dispatch { tools: Vec<Tool>, calls: Vec<ToolCall> },
    SecondRound { tools: Vec<Tool> },
    Done(String),
}

fn tool_calls(blocks: &[ContentPart]) -> Vec<ToolCall> {
    blocks
        .iter()
        .filter_map(|b| match b {
            ContentPart::ToolUse { id, name, input } => Some(ToolCall::new(id, name, input.clone())),
            _ => None,
        })
        .collect()
}

fn joined_text(blocks: &[ContentPart]) -> Option<String> {
    let text: String = blocks.iter().filter_map(|b| b.as_text()).collect();
    (!text.is_empty()).then_some(text)
}

/// Drives model rounds and tool dispatch for every front end
pub struct QueryOrchestrator {
    catalog: Arc<ToolCatalog>,
    conversations: Arc<ConversationStore>,
    reasoner: Arc<dyn ReasoningService>,
    logger: Arc<dyn Logger>,
}

impl QueryOrchestrator {
    pub fn new(
        catalog: Arc<ToolCatalog>,
        conversations: Arc<ConversationStore>,
        reasoner: Arc<dyn ReasoningService>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            catalog,
            conversations,
            reasoner,
            logger,
        }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        self.catalog.registry()
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    pub fn conversations(&self) -> &Arc<ConversationStore> {
        &self.conversations
    }

    /// Answer `text` within conversation `conversation_id`.
    ///
    /// Tool and model failures come back as answer text. The only error is
    /// an empty registry, checked before anything is recorded.
    pub async fn process_query(
        &self,
        conversation_id: &str,
        text: &str,
        preferred_provider: Option<&str>,
    ) -> Result<String, NoProvidersError> {
        if self.registry().is_empty() {
            return Err(NoProvidersError);
        }

        let session = self.conversations.session(conversation_id);
        let mut history = session.lock().await;
        let mut state = QueryState::Seed;

        loop {
            state = match state {
                QueryState::Seed => {
                    self.logger.debug(&format!("[Orchestrator] Query in '{}'", conversation_id));
                    history.push(ChatMessage::user(text));
                    QueryState::Catalog
                }
                QueryState::Catalog => {
                    self.catalog.refresh().await;
                    QueryState::FirstRound {
                        tools: self.catalog.llm_tools(),
                    }
                }
                QueryState::FirstRound { tools } => {
                    match self.round(history.entries().to_vec(), &tools).await {
                        Ok(blocks) => {
                            let calls = tool_calls(&blocks);
                            let answer = joined_text(&blocks);
                            history.push(ChatMessage::with_parts(MessageRole::Assistant, blocks));
                            if calls.is_empty() {
                                QueryState::Done(answer.unwrap_or_else(|| NO_RESPONSE.to_string()))
                            } else {
                                QueryState::Dispatch { tools, calls }
                            }
                        }
                        Err(e) => self.failed(e),
                    }
                }
                QueryState::Dispatch { tools, calls } => {
                    let mut results: Vec<ContentPart> = Vec::with_capacity(calls.len());
                    for call in &calls {
                        results.push(self.dispatch(call, preferred_provider).await.into());
                    }
                    history.push(ChatMessage::with_parts(MessageRole::User, results));
                    QueryState::SecondRound { tools }
                }
                QueryState::SecondRound { tools } => {
                    match self.round(history.entries().to_vec(), &tools).await {
                        Ok(blocks) => {
                            let texts: Vec<ContentPart> =
                                blocks.into_iter().filter(|b| b.as_text().is_some()).collect();
                            let answer = joined_text(&texts);
                            history.push(ChatMessage::with_parts(MessageRole::Assistant, texts));
                            QueryState::Done(answer.unwrap_or_else(|| TASK_COMPLETED.to_string()))
                        }
                        Err(e) => self.failed(e),
                    }
                }
                QueryState::Done(answer) => return Ok(answer),
            };
        }
    }

    async fn round(&self, messages: Vec<ChatMessage>, tools: &[Tool]) -> ReasoningResult<Vec<ContentPart>> {
        let options = ChatOptions::new().with_tools(tools.to_vec());
        let stream = self
            .reasoner
            .stream_chat(messages, options, CancellationToken::new())
            .await?;
        collect_blocks(stream).await
    }

    fn failed(&self, error: crate::reasoning::ReasoningError) -> QueryState {
        self.logger.error(&format!(
            "[Orchestrator] {} reasoning call failed: {}",
            self.reasoner.name(),
            error
        ));
        QueryState::Done(format!("Error processing query: {}", error))
    }

    /// Route one tool call and reduce its outcome to text
    async fn dispatch(&self, call: &ToolCall, preferred_provider: Option<&str>) -> ToolResult {
        let provider = match self.catalog.resolve(&call.name, preferred_provider) {
            Ok(provider) => provider,
            Err(e) => return ToolResult::error(&call.id, e),
        };

        match self.registry().invoke(&provider, &call.name, call.input.clone()).await {
            Ok(outcome) => ToolResult::success(&call.id, outcome.normalize()),
            Err(e) => {
                self.logger.warn(&format!(
                    "[Orchestrator] {} via '{}' failed: {}",
                    call.name, provider, e
                ));
                ToolResult::error(&call.id, e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::mcp::McpError;
    use crate::reasoning::MockReasoner;
    use crate::registry::testing::FakeProvider;
    use crate::registry::{ProviderKind, ToolOutcome};
    use crate::types::StreamChunk;
    use serde_json::json;

    struct Harness {
        registry: Arc<ProviderRegistry>,
        conversations: Arc<ConversationStore>,
        reasoner: Arc<MockReasoner>,
        orchestrator: QueryOrchestrator,
    }

    fn harness(rounds: Vec<Vec<StreamChunk>>) -> Harness {
        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger);
        let registry = Arc::new(ProviderRegistry::new(logger.clone()));
        let catalog = Arc::new(ToolCatalog::new(registry.clone(), logger.clone()));
        let conversations = Arc::new(ConversationStore::new(10));
        let reasoner = Arc::new(MockReasoner::scripted(rounds, logger.clone()));
        let orchestrator =
            QueryOrchestrator::new(catalog, conversations.clone(), reasoner.clone(), logger);
        Harness {
            registry,
            conversations,
            reasoner,
            orchestrator,
        }
    }

    fn call(id: &str, name: &str) -> StreamChunk {
        StreamChunk::tool_call(ToolCall::new(id, name, json!({ "q": "x" })))
    }

    #[tokio::test]
    async fn test_empty_registry_is_no_providers() {
        let h = harness(vec![vec![StreamChunk::text("unused")]]);

        let result = h.orchestrator.process_query("c", "hi", None).await;
        assert_eq!(result, Err(NoProvidersError));
        assert_eq!(h.reasoner.request_count(), 0);
        assert!(h.conversations.get("c").await.is_empty());
    }

    #[tokio::test]
    async fn test_text_only_round_invokes_nothing() {
        let h = harness(vec![vec![StreamChunk::text("Hello "), StreamChunk::text("there")]]);
        let provider = Arc::new(FakeProvider::with_tools(&["search"]));
        h.registry.register("p", provider.clone()).unwrap();

        let answer = h.orchestrator.process_query("c", "hi", None).await.unwrap();
        assert_eq!(answer, "Hello there");
        assert_eq!(provider.call_count(), 0);
        assert_eq!(h.reasoner.request_count(), 1);

        let history = h.conversations.get("c").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], ChatMessage::user("hi"));
        assert_eq!(history[1].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn test_empty_first_round() {
        let h = harness(vec![Vec::new()]);
        h.registry.register("p", Arc::new(FakeProvider::with_tools(&[]))).unwrap();

        let answer = h.orchestrator.process_query("c", "hi", None).await.unwrap();
        assert_eq!(answer, NO_RESPONSE);
    }

    #[tokio::test]
    async fn test_collision_routes_to_later_provider_with_first_schema() {
        let h = harness(vec![vec![call("t1", "search")], vec![StreamChunk::text("done")]]);
        let a = Arc::new(FakeProvider::new(
            ProviderKind::Local,
            vec![Tool::new("search", "A search").with_schema(json!({ "title": "A" }))],
        ));
        let b = Arc::new(
            FakeProvider::new(
                ProviderKind::Remote,
                vec![Tool::new("search", "B search").with_schema(json!({ "title": "B" }))],
            )
            .replying(ToolOutcome::Remote(vec![json!({ "text": "hit" })])),
        );
        h.registry.register("A", a.clone()).unwrap();
        h.registry.register("B", b.clone()).unwrap();

        let answer = h.orchestrator.process_query("c", "find", None).await.unwrap();
        assert_eq!(answer, "done");
        assert_eq!(a.call_count(), 0);
        assert_eq!(b.call_count(), 1);

        let requests = h.reasoner.requests();
        assert_eq!(requests[0].tools.len(), 1);
        assert_eq!(requests[0].tools[0].description, "A search");
        assert_eq!(requests[0].tools[0].input_schema, Some(json!({ "title": "A" })));
    }

    #[tokio::test]
    async fn test_failed_tool_feeds_error_text_to_second_round() {
        let h = harness(vec![vec![call("t1", "search")], vec![StreamChunk::text("sorry")]]);
        let provider = FakeProvider::with_tools(&["search"])
            .failing(|| McpError::ToolCallFailed("boom".into()));
        h.registry.register("p", Arc::new(provider)).unwrap();

        let answer = h.orchestrator.process_query("c", "find", None).await.unwrap();
        assert_eq!(answer, "sorry");

        let requests = h.reasoner.requests();
        let last = requests[1].messages.last().unwrap();
        assert_eq!(last.role, MessageRole::User);
        assert_eq!(
            last.parts(),
            &[ContentPart::tool_error("t1", "Error: Tool call failed: boom")]
        );
    }

    #[tokio::test]
    async fn test_tool_round_records_four_entries() {
        let h = harness(vec![
            vec![StreamChunk::text("Looking."), call("t1", "search"), call("t2", "search")],
            vec![StreamChunk::text("Found "), StreamChunk::text("it")],
        ]);
        let provider = Arc::new(FakeProvider::with_tools(&["search"]).replying(ToolOutcome::Local(
            json!({ "content": [{ "text": "a" }, { "text": "b" }] }),
        )));
        h.registry.register("p", provider.clone()).unwrap();

        let answer = h.orchestrator.process_query("c", "find", None).await.unwrap();
        assert_eq!(answer, "Found it");
        assert_eq!(provider.call_count(), 2);

        let history = h.conversations.get("c").await;
        assert_eq!(history.len(), 4);
        assert_eq!(
            history[1].parts(),
            &[
                ContentPart::text("Looking."),
                ContentPart::tool_use("t1", "search", json!({ "q": "x" })),
                ContentPart::tool_use("t2", "search", json!({ "q": "x" })),
            ]
        );
        assert_eq!(
            history[2].parts(),
            &[ContentPart::tool_result("t1", "ab"), ContentPart::tool_result("t2", "ab")]
        );
        assert_eq!(history[3].parts(), &[ContentPart::text("Found it")]);
    }

    #[tokio::test]
    async fn test_second_round_without_text() {
        let h = harness(vec![vec![call("t1", "search")], vec![call("t2", "search")]]);
        h.registry
            .register("p", Arc::new(FakeProvider::with_tools(&["search"])))
            .unwrap();

        let answer = h.orchestrator.process_query("c", "find", None).await.unwrap();
        assert_eq!(answer, TASK_COMPLETED);
        assert!(h.conversations.get("c").await[3].parts().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_uses_preferred_provider() {
        let h = harness(vec![vec![call("t1", "mystery")], vec![StreamChunk::text("ok")]]);
        let first = Arc::new(FakeProvider::with_tools(&[]));
        let preferred = Arc::new(FakeProvider::with_tools(&[]));
        h.registry.register("first", first.clone()).unwrap();
        h.registry.register("preferred", preferred.clone()).unwrap();

        h.orchestrator
            .process_query("c", "go", Some("preferred"))
            .await
            .unwrap();
        assert_eq!(first.call_count(), 0);
        assert_eq!(preferred.calls.lock()[0].0, "mystery");
    }

    #[tokio::test]
    async fn test_reasoning_failure_becomes_answer() {
        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger);
        let registry = Arc::new(ProviderRegistry::new(logger.clone()));
        registry.register("p", Arc::new(FakeProvider::with_tools(&[]))).unwrap();
        let orchestrator = QueryOrchestrator::new(
            Arc::new(ToolCatalog::new(registry, logger.clone())),
            Arc::new(ConversationStore::new(10)),
            Arc::new(MockReasoner::error("offline", logger.clone())),
            logger,
        );

        let answer = orchestrator.process_query("c", "hi", None).await.unwrap();
        assert_eq!(answer, "Error processing query: Mock error: offline");
    }

    #[tokio::test]
    async fn test_history_carries_into_next_query() {
        let h = harness(vec![vec![StreamChunk::text("one")], vec![StreamChunk::text("two")]]);
        h.registry.register("p", Arc::new(FakeProvider::with_tools(&[]))).unwrap();

        h.orchestrator.process_query("c", "first", None).await.unwrap();
        h.orchestrator.process_query("c", "second", None).await.unwrap();

        let requests = h.reasoner.requests();
        assert_eq!(requests[1].messages.len(), 3);
        assert_eq!(requests[1].messages[2], ChatMessage::user("second"));
    }

    #[tokio::test]
    async fn test_concurrent_conversations_stay_separate() {
        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger);
        let registry = Arc::new(ProviderRegistry::new(logger.clone()));
        registry.register("p", Arc::new(FakeProvider::with_tools(&[]))).unwrap();
        let orchestrator = Arc::new(QueryOrchestrator::new(
            Arc::new(ToolCatalog::new(registry, logger.clone())),
            Arc::new(ConversationStore::new(10)),
            Arc::new(MockReasoner::echo(logger.clone())),
            logger,
        ));

        let (a, b) = tokio::join!(
            orchestrator.process_query("a", "alpha", None),
            orchestrator.process_query("b", "beta", None)
        );
        assert_eq!(a.unwrap(), "Echo: alpha");
        assert_eq!(b.unwrap(), "Echo: beta");
        assert_eq!(orchestrator.conversations().get("a").await.len(), 2);
    }
}

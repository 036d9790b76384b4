//! Adapter between toolmux types and genai types
//!
//! Tool-use and tool-result blocks keep their structure: genai receives
//! `ToolCall` parts on assistant turns and `ToolResponse` parts on tool
//! turns, each paired by call id.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use genai::chat::{
    ChatMessage as GenaiMessage, ChatOptions as GenaiOptions, ChatRole as GenaiRole,
    ChatStreamEvent, ContentPart as GenaiPart, MessageContent as GenaiContent, Tool as GenaiTool,
    ToolCall as GenaiToolCall, ToolResponse as GenaiToolResponse,
};
use genai::resolver::{AuthData, AuthResolver, Endpoint, ServiceTargetResolver};
use genai::{adapter::AdapterKind, Client, ModelIden, ServiceTarget};

use crate::secrets::SecretStore;
use crate::types::{ChatMessage, ContentPart, MessageContent, MessageRole, ModelSettings, StreamChunk, Tool, ToolCall};

use super::error::{ReasoningError, ReasoningResult};
use super::traits::ChatOptions;

// ============================================================================
// Message Conversion: toolmux -> genai
// ============================================================================

/// Convert a MessageRole to genai ChatRole
pub fn to_genai_role(role: MessageRole) -> GenaiRole {
    match role {
        MessageRole::System => GenaiRole::System,
        MessageRole::User => GenaiRole::User,
        MessageRole::Assistant => GenaiRole::Assistant,
    }
}

/// Convert one content block to its genai part
pub fn to_genai_part(part: ContentPart) -> GenaiPart {
    match part {
        ContentPart::Text { text } => GenaiPart::Text(text),
        ContentPart::ToolUse { id, name, input } => GenaiPart::ToolCall(GenaiToolCall {
            call_id: id,
            fn_name: name,
            fn_arguments: input,
            thought_signatures: None,
        }),
        ContentPart::ToolResult {
            tool_use_id, content, ..
        } => GenaiPart::ToolResponse(GenaiToolResponse::new(tool_use_id, content)),
    }
}

/// Convert a ChatMessage to genai ChatMessage
///
/// A user entry carrying tool results becomes a genai tool-role message,
/// which every adapter renders as the provider's tool-result turn.
pub fn to_genai_message(msg: ChatMessage) -> GenaiMessage {
    let carries_results = msg
        .parts()
        .iter()
        .any(|p| matches!(p, ContentPart::ToolResult { .. }));

    let content = match msg.content {
        MessageContent::Text(text) => GenaiContent::from(text),
        MessageContent::Parts(parts) => parts.into_iter().map(to_genai_part).collect::<GenaiContent>(),
    };

    match msg.role {
        MessageRole::System => GenaiMessage::system(content),
        MessageRole::User if carries_results => GenaiMessage {
            role: GenaiRole::Tool,
            content,
            options: None,
        },
        MessageRole::User => GenaiMessage::user(content),
        MessageRole::Assistant => GenaiMessage::assistant(content),
    }
}

/// Drop tool results whose call is no longer in the history, then drop
/// entries left with nothing to send
fn prune(msg: ChatMessage, issued: &mut HashSet<String>) -> Option<ChatMessage> {
    let parts = match msg.content {
        MessageContent::Text(ref text) if text.is_empty() => return None,
        MessageContent::Text(_) => return Some(msg),
        MessageContent::Parts(parts) => parts,
    };

    let parts: Vec<ContentPart> = parts
        .into_iter()
        .filter(|part| match part {
            ContentPart::ToolUse { id, .. } => {
                issued.insert(id.clone());
                true
            }
            ContentPart::ToolResult { tool_use_id, .. } => issued.contains(tool_use_id),
            ContentPart::Text { text } => !text.is_empty(),
        })
        .collect();

    (!parts.is_empty()).then(|| ChatMessage::with_parts(msg.role, parts))
}

/// Convert a conversation history to genai messages
///
/// Eviction can remove the assistant turn that issued a tool call while
/// keeping the turn that answers it, and a model reply can be empty. Model
/// APIs reject both, so neither is sent.
pub fn to_genai_messages(messages: Vec<ChatMessage>) -> Vec<GenaiMessage> {
    let mut issued = HashSet::new();
    messages
        .into_iter()
        .filter_map(|msg| prune(msg, &mut issued))
        .map(to_genai_message)
        .collect()
}

// ============================================================================
// Tool Conversion: toolmux -> genai
// ============================================================================

/// Convert a Tool to genai Tool
pub fn to_genai_tool(tool: Tool) -> GenaiTool {
    let mut genai_tool = GenaiTool::new(&tool.name).with_description(&tool.description);

    if let Some(schema) = tool.input_schema {
        genai_tool = genai_tool.with_schema(schema);
    }

    genai_tool
}

pub fn to_genai_tools(tools: Vec<Tool>) -> Vec<GenaiTool> {
    tools.into_iter().map(to_genai_tool).collect()
}

// ============================================================================
// Options Conversion: toolmux -> genai
// ============================================================================

pub fn to_genai_options(options: &ChatOptions) -> GenaiOptions {
    let mut genai_opts = GenaiOptions::default();

    if let Some(temp) = options.temperature {
        genai_opts = genai_opts.with_temperature(temp as f64);
    }

    if let Some(max_tokens) = options.max_tokens {
        genai_opts = genai_opts.with_max_tokens(max_tokens);
    }

    // Complete tool calls only arrive through the End event when captured
    genai_opts.with_capture_tool_calls(true)
}

// ============================================================================
// Response Conversion: genai -> toolmux
// ============================================================================

pub fn from_genai_tool_call(tc: &GenaiToolCall) -> ToolCall {
    ToolCall::new(tc.call_id.clone(), tc.fn_name.clone(), tc.fn_arguments.clone())
}

/// Convert one genai stream event into zero or more chunks
pub fn from_genai_event(event: ChatStreamEvent) -> Vec<ReasoningResult<StreamChunk>> {
    match event {
        ChatStreamEvent::Chunk(chunk) => vec![Ok(StreamChunk::text(chunk.content))],
        ChatStreamEvent::ToolCallChunk(chunk) => vec![Ok(StreamChunk::ToolCallDelta {
            id: chunk.tool_call.call_id,
            name: Some(chunk.tool_call.fn_name),
            input_delta: Some(chunk.tool_call.fn_arguments.to_string()),
        })],
        ChatStreamEvent::End(end) => match end.captured_tool_calls() {
            Some(tool_calls) => tool_calls
                .iter()
                .map(|tc| Ok(StreamChunk::tool_call(from_genai_tool_call(tc))))
                .collect(),
            None => Vec::new(),
        },
        ChatStreamEvent::Start
        | ChatStreamEvent::ReasoningChunk(_)
        | ChatStreamEvent::ThoughtSignatureChunk(_) => Vec::new(),
    }
}

// ============================================================================
// Provider Resolution
// ============================================================================

/// genai adapter for a natively supported provider id
pub fn native_adapter(provider: &str) -> Option<AdapterKind> {
    match provider.to_lowercase().as_str() {
        "openai" => Some(AdapterKind::OpenAI),
        "anthropic" => Some(AdapterKind::Anthropic),
        "gemini" | "google" => Some(AdapterKind::Gemini),
        "ollama" => Some(AdapterKind::Ollama),
        "groq" => Some(AdapterKind::Groq),
        "xai" => Some(AdapterKind::Xai),
        "deepseek" => Some(AdapterKind::DeepSeek),
        "cohere" => Some(AdapterKind::Cohere),
        "fireworks" => Some(AdapterKind::Fireworks),
        "together" => Some(AdapterKind::Together),
        _ => None,
    }
}

/// Fixed endpoints for OpenAI-compatible providers genai does not know
fn compat_endpoint(provider: &str) -> Option<&'static str> {
    match provider {
        "openrouter" => Some("https://openrouter.ai/api/v1/"),
        "mistral" => Some("https://api.mistral.ai/v1/"),
        _ => None,
    }
}

/// Check if a provider can be handled by genai (native or via OpenAI-compat)
pub fn is_genai_supported(provider: &str) -> bool {
    let provider = provider.to_lowercase();
    native_adapter(&provider).is_some()
        || compat_endpoint(&provider).is_some()
        || provider == "azure"
}

/// Create a genai Client whose auth and endpoints come from our settings
///
/// An explicit `api_key` wins; otherwise the secret store is asked for
/// the provider id (for example `anthropic`).
pub fn create_client(settings: &ModelSettings, secrets: Arc<dyn SecretStore>) -> ReasoningResult<Client> {
    let provider = settings.provider.to_lowercase();
    if !is_genai_supported(&provider) {
        return Err(ReasoningError::Other(format!("Unsupported model provider: {}", provider)));
    }
    if provider == "azure" && settings.api_base.is_none() {
        return Err(ReasoningError::Other("azure requires model.api_base".to_string()));
    }

    let auth_provider = provider.clone();
    let explicit_key = settings.api_key.clone();

    let auth_resolver = AuthResolver::from_resolver_async_fn(
        move |_model_iden: ModelIden| -> Pin<Box<dyn Future<Output = genai::resolver::Result<Option<AuthData>>> + Send>> {
            let provider = auth_provider.clone();
            let explicit_key = explicit_key.clone();
            let secrets = Arc::clone(&secrets);

            Box::pin(async move {
                if let Some(key) = explicit_key {
                    return Ok(Some(AuthData::from_single(key)));
                }
                // None lets genai decide; Ollama needs no key
                Ok(secrets.get(&provider).map(AuthData::from_single))
            })
        },
    );

    let target_provider = provider;
    let target_api_base = settings.api_base.clone();

    let target_resolver = ServiceTargetResolver::from_resolver_fn(
        move |target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
            let model_name = target.model.model_name.clone();

            let (endpoint, adapter_kind) = if let Some(kind) = native_adapter(&target_provider) {
                let endpoint = target_api_base
                    .as_ref()
                    .map(|u| Endpoint::from_owned(u.clone()))
                    .unwrap_or(target.endpoint);
                (endpoint, kind)
            } else if let Some(url) = compat_endpoint(&target_provider) {
                (Endpoint::from_static(url), AdapterKind::OpenAI)
            } else {
                match &target_api_base {
                    Some(base) => (Endpoint::from_owned(base.clone()), AdapterKind::OpenAI),
                    None => return Ok(target),
                }
            };

            Ok(ServiceTarget {
                endpoint,
                auth: target.auth,
                model: ModelIden::new(adapter_kind, model_name),
            })
        },
    );

    Ok(Client::builder()
        .with_auth_resolver(auth_resolver)
        .with_service_target_resolver(target_resolver)
        .build())
}

//! OpenAI-compatible `/chat/completions` wire format.
//!
//! Spoken by OpenAI, Google (through its OpenAI-compatible endpoint),
//! Ollama (`/v1`) and any Custom server.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use slidegen_core::types::{LlmRequest, LlmResponse, Message, ToolCall, ToolDefinition, UsageInfo};
use slidegen_core::Provider;

// ─────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    /// OpenAI's reasoning models reject `max_tokens`.
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    /// Provider-specific switches for reasoning, grounding and thinking.
    #[serde(flatten)]
    extra: Map<String, Value>,
}

pub(crate) const PATH: &str = "/chat/completions";

/// Build the request body. `request.options` must already be filtered to
/// what `provider` supports.
pub(crate) fn build_body<'a>(
    provider: Provider,
    model: &'a str,
    request: &'a LlmRequest,
) -> ChatCompletionRequest<'a> {
    let options = request.options;
    let tools = request
        .tools
        .as_deref()
        .filter(|t| options.tool_calls_enabled && !t.is_empty());

    let mut extra = Map::new();
    if options.extended_reasoning {
        extra.insert("reasoning_effort".into(), json!("high"));
    }
    if options.web_grounding_enabled {
        extra.insert("web_search_options".into(), json!({}));
    }
    if options.disable_thinking {
        match provider {
            Provider::Ollama => {
                extra.insert("think".into(), json!(false));
            }
            _ => {
                extra.insert(
                    "chat_template_kwargs".into(),
                    json!({ "enable_thinking": false }),
                );
            }
        }
    }

    let (max_tokens, max_completion_tokens) = match provider {
        Provider::OpenAi => (None, Some(request.max_tokens)),
        _ => (Some(request.max_tokens), None),
    };

    ChatCompletionRequest {
        model,
        messages: &request.messages,
        tools,
        tool_choice: tools.map(|_| "auto"),
        max_tokens,
        max_completion_tokens,
        temperature: request.temperature,
        extra,
    }
}

// ─────────────────────────────────────────────
// Response
// ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

/// Decode a success body. Errors describe what was wrong with it.
pub(crate) fn parse_response(body: &str) -> Result<LlmResponse, String> {
    let resp: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| format!("invalid chat completion body: {e}"))?;
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| "no choices in response".to_string())?;

    Ok(LlmResponse {
        content: choice.message.content,
        tool_calls: choice.message.tool_calls.unwrap_or_default(),
        finish_reason: choice.finish_reason,
        usage: resp.usage,
    })
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

//! Anthropic native `/v1/messages` wire format.
//!
//! Converts the OpenAI-shaped message model: system turns move to the
//! top-level `system` field, image parts become `image` blocks, tool calls
//! become `tool_use` / `tool_result` blocks.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use slidegen_core::types::{
    ContentPart, LlmRequest, LlmResponse, Message, MessageContent, ToolCall, UsageInfo,
};

pub(crate) const PATH: &str = "/v1/messages";
pub(crate) const API_VERSION: &str = "2023-06-01";

/// Smallest thinking budget the API accepts.
const MIN_THINKING_BUDGET: u32 = 1024;

// ─────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Turn>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize)]
struct Turn {
    role: &'static str,
    content: Vec<Value>,
}

pub(crate) fn build_body<'a>(model: &'a str, request: &'a LlmRequest) -> MessagesRequest<'a> {
    let options = request.options;

    let mut system = Vec::new();
    let mut turns: Vec<Turn> = Vec::new();
    for message in &request.messages {
        let (role, blocks) = match message {
            Message::System { content } => {
                system.push(content.as_str());
                continue;
            }
            Message::User { content } => ("user", user_blocks(content)),
            Message::Assistant {
                content,
                tool_calls,
            } => ("assistant", assistant_blocks(content.as_deref(), tool_calls.as_deref())),
            Message::Tool {
                content,
                tool_call_id,
            } => (
                "user",
                vec![json!({
                    "type": "tool_result",
                    "tool_use_id": tool_call_id,
                    "content": content,
                })],
            ),
        };

        // Consecutive same-role turns are merged; the API requires alternation.
        match turns.last_mut() {
            Some(last) if last.role == role => last.content.extend(blocks),
            _ => turns.push(Turn {
                role,
                content: blocks,
            }),
        }
    }

    let mut tools: Vec<Value> = Vec::new();
    if options.tool_calls_enabled {
        for tool in request.tools.iter().flatten() {
            tools.push(json!({
                "name": tool.function.name,
                "description": tool.function.description,
                "input_schema": tool.function.parameters,
            }));
        }
    }
    if options.web_grounding_enabled {
        tools.push(json!({
            "type": "web_search_20250305",
            "name": "web_search",
            "max_uses": 5,
        }));
    }

    let thinking = options
        .extended_reasoning
        .then(|| thinking_budget(request.max_tokens))
        .flatten()
        .map(|budget| json!({ "type": "enabled", "budget_tokens": budget }));

    MessagesRequest {
        model,
        max_tokens: request.max_tokens,
        system: (!system.is_empty()).then(|| system.join("\n\n")),
        messages: turns,
        tools,
        // Temperature is not accepted alongside extended thinking.
        temperature: if thinking.is_some() {
            None
        } else {
            request.temperature
        },
        thinking,
    }
}

/// Half the output limit, at least the API minimum. `None` when the limit
/// leaves no room for a budget below it.
fn thinking_budget(max_tokens: u32) -> Option<u32> {
    (max_tokens > MIN_THINKING_BUDGET).then(|| (max_tokens / 2).max(MIN_THINKING_BUDGET))
}

fn user_blocks(content: &MessageContent) -> Vec<Value> {
    match content {
        MessageContent::Text(text) => vec![json!({ "type": "text", "text": text })],
        MessageContent::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => json!({ "type": "text", "text": text }),
                ContentPart::ImageUrl { image_url } => match image_url.as_base64() {
                    Some((media_type, data)) => json!({
                        "type": "image",
                        "source": { "type": "base64", "media_type": media_type, "data": data },
                    }),
                    None => json!({
                        "type": "image",
                        "source": { "type": "url", "url": image_url.url },
                    }),
                },
            })
            .collect(),
    }
}

fn assistant_blocks(content: Option<&str>, tool_calls: Option<&[ToolCall]>) -> Vec<Value> {
    let mut blocks = Vec::new();
    if let Some(text) = content.filter(|t| !t.is_empty()) {
        blocks.push(json!({ "type": "text", "text": text }));
    }
    for call in tool_calls.unwrap_or_default() {
        let input: Value =
            serde_json::from_str(&call.function.arguments).unwrap_or_else(|_| json!({}));
        blocks.push(json!({
            "type": "tool_use",
            "id": call.id,
            "name": call.function.name,
            "input": input,
        }));
    }
    blocks
}

// ─────────────────────────────────────────────
// Response
// ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<Block>,
    stop_reason: Option<String>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Block {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    /// Thinking, server tool use and search results carry nothing we return.
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

pub(crate) fn parse_response(body: &str) -> Result<LlmResponse, String> {
    let resp: MessagesResponse =
        serde_json::from_str(body).map_err(|e| format!("invalid messages body: {e}"))?;

    let mut text = String::new();
    let mut tool_calls = Vec::new();
    for block in resp.content {
        match block {
            Block::Text { text: t } => text.push_str(&t),
            Block::ToolUse { id, name, input } => {
                tool_calls.push(ToolCall::new(id, name, input.to_string()));
            }
            Block::Other => {}
        }
    }

    Ok(LlmResponse {
        content: (!text.is_empty()).then_some(text),
        tool_calls,
        finish_reason: resp.stop_reason,
        usage: resp.usage.map(|u| UsageInfo {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: u.input_tokens + u.output_tokens,
        }),
    })
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

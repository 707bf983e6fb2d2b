//! Wire backends: turn an `LlmRequest` into one provider's HTTP call and
//! decode its reply.
//!
//! Dispatch is a match over the config's `Backend` variant, so each
//! provider only ever sees the connection fields it owns.

pub(crate) mod anthropic;
pub(crate) mod openai;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use slidegen_core::types::{LlmRequest, LlmResponse};

use crate::registry::{describe, Backend, ProviderConfig};

/// A ready-to-send HTTP call.
#[derive(Debug)]
pub(crate) struct WireRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

/// Which decoder a reply needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WireFormat {
    ChatCompletions,
    AnthropicMessages,
}

impl WireFormat {
    pub fn parse(self, body: &str) -> Result<LlmResponse, String> {
        match self {
            WireFormat::ChatCompletions => openai::parse_response(body),
            WireFormat::AnthropicMessages => anthropic::parse_response(body),
        }
    }
}

/// Base URL requests go to, before the wire path is appended.
///
/// Hosted providers use `api_base` when given, else their default. Ollama
/// exposes its OpenAI-compatible surface under `/v1`; Custom URLs are used
/// as configured.
pub(crate) fn api_base(config: &ProviderConfig, api_base: Option<&str>) -> String {
    let base = match &config.backend {
        Backend::Ollama { endpoint_url } => {
            let trimmed = endpoint_url.trim().trim_end_matches('/');
            if trimmed.ends_with("/v1") {
                trimmed.to_string()
            } else {
                format!("{trimmed}/v1")
            }
        }
        Backend::Custom { endpoint_url, .. } => endpoint_url.trim().to_string(),
        _ => api_base
            .or(describe(config.provider()).default_api_base)
            .unwrap_or_default()
            .to_string(),
    };
    base.trim_end_matches('/').to_string()
}

/// Build the HTTP call for `model` on `config`'s backend.
///
/// `request.options` must already be filtered to the provider's
/// capabilities. Errors mean the config cannot form a valid request.
pub(crate) fn build(
    config: &ProviderConfig,
    base: &str,
    model: &str,
    request: &LlmRequest,
) -> Result<(WireRequest, WireFormat), String> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let to_json = |body: Result<serde_json::Value, serde_json::Error>| {
        body.map_err(|e| format!("failed to encode request: {e}"))
    };

    match &config.backend {
        Backend::Anthropic { api_key } => {
            headers.insert("x-api-key", header_value(api_key)?);
            headers.insert(
                "anthropic-version",
                HeaderValue::from_static(anthropic::API_VERSION),
            );
            let body = to_json(serde_json::to_value(anthropic::build_body(model, request)))?;
            Ok((
                WireRequest {
                    url: format!("{base}{}", anthropic::PATH),
                    headers,
                    body,
                },
                WireFormat::AnthropicMessages,
            ))
        }
        Backend::OpenAi { .. }
        | Backend::Google { .. }
        | Backend::Ollama { .. }
        | Backend::Custom { .. } => {
            if let Some(key) = config.backend.api_key().filter(|k| !k.trim().is_empty()) {
                headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", key.trim()))?);
            }
            let body = to_json(serde_json::to_value(openai::build_body(
                config.provider(),
                model,
                request,
            )))?;
            Ok((
                WireRequest {
                    url: format!("{base}{}", openai::PATH),
                    headers,
                    body,
                },
                WireFormat::ChatCompletions,
            ))
        }
    }
}

fn header_value(raw: &str) -> Result<HeaderValue, String> {
    let mut value =
        HeaderValue::from_str(raw.trim()).map_err(|_| "credential contains invalid characters".to_string())?;
    value.set_sensitive(true);
    Ok(value)
}

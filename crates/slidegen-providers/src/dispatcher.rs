//! LLM dispatcher: sends one chat turn to a `(provider, model)` pair.
//!
//! Pure transport: options are filtered to what the provider supports,
//! the call is made once, and failures come back classified as transient
//! or fatal. Retrying is the caller's decision.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use tracing::{debug, error, warn};

use slidegen_core::types::{LlmRequest, LlmResponse};
use slidegen_core::Provider;

use crate::backend;
use crate::error::{FatalReason, LlmError};
use crate::registry::{describe, validate, ProviderRegistry};
use crate::template::ResolvedTemplateProvider;
use crate::traits::LlmClient;

/// Local inference on a slide image can take minutes.
pub const LOCAL_TIMEOUT: Duration = Duration::from_secs(600);
pub const HOSTED_TIMEOUT: Duration = Duration::from_secs(180);

pub fn timeout_for(provider: Provider) -> Duration {
    if provider.is_local() {
        LOCAL_TIMEOUT
    } else {
        HOSTED_TIMEOUT
    }
}

// ─────────────────────────────────────────────
// Call state
// ─────────────────────────────────────────────

/// How a failed call ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureClass {
    Transient,
    Fatal,
}

/// Lifecycle of a single call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallState {
    Pending,
    Sent,
    Succeeded,
    Failed(FailureClass),
}

impl CallState {
    /// Whether `next` is a legal step from this state.
    pub fn can_transition_to(self, next: CallState) -> bool {
        matches!(
            (self, next),
            (CallState::Pending, CallState::Sent)
                | (CallState::Pending, CallState::Failed(FailureClass::Fatal))
                | (CallState::Sent, CallState::Succeeded)
                | (CallState::Sent, CallState::Failed(_))
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CallState::Succeeded | CallState::Failed(_))
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallState::Pending => f.write_str("pending"),
            CallState::Sent => f.write_str("sent"),
            CallState::Succeeded => f.write_str("succeeded"),
            CallState::Failed(FailureClass::Transient) => f.write_str("failed(transient)"),
            CallState::Failed(FailureClass::Fatal) => f.write_str("failed(fatal)"),
        }
    }
}

/// Tracks one call's state and logs each transition.
struct CallTrace<'a> {
    provider: Provider,
    model: &'a str,
    state: CallState,
}

impl<'a> CallTrace<'a> {
    fn new(provider: Provider, model: &'a str) -> Self {
        Self {
            provider,
            model,
            state: CallState::Pending,
        }
    }

    fn advance(&mut self, next: CallState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal call transition {} -> {}",
            self.state,
            next
        );
        debug!(
            provider = self.provider.as_str(),
            model = self.model,
            from = %self.state,
            to = %next,
            "llm call"
        );
        self.state = next;
    }

    fn fail(&mut self, err: LlmError) -> LlmError {
        let class = if err.is_transient() {
            FailureClass::Transient
        } else {
            FailureClass::Fatal
        };
        self.advance(CallState::Failed(class));
        err
    }
}

// ─────────────────────────────────────────────
// LlmDispatcher
// ─────────────────────────────────────────────

/// Sends requests to any configured provider. Cheap to clone.
#[derive(Clone)]
pub struct LlmDispatcher {
    client: reqwest::Client,
    registry: Arc<ProviderRegistry>,
    api_bases: HashMap<Provider, String>,
}

impl fmt::Debug for LlmDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmDispatcher")
            .field("api_bases", &self.api_bases)
            .finish()
    }
}

impl LlmDispatcher {
    pub fn new(registry: Arc<ProviderRegistry>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            registry,
            api_bases: HashMap::new(),
        })
    }

    /// Send a hosted provider's requests to another base URL.
    pub fn with_api_base(mut self, provider: Provider, base: impl Into<String>) -> Self {
        self.api_bases.insert(provider, base.into());
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Send one chat turn to `provider` using `model`.
    pub async fn invoke(
        &self,
        provider: Provider,
        model: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse, LlmError> {
        let mut trace = CallTrace::new(provider, model);

        let config = self.registry.get(provider).clone().with_model(model);
        if let Err(e) = validate(provider, &config) {
            error!(provider = provider.as_str(), model, error = %e, "provider not configured");
            return Err(trace.fail(LlmError::fatal(
                provider,
                model,
                FatalReason::Misconfigured,
                e.to_string(),
            )));
        }

        // Process-wide toggles enable options for every call.
        let mut options = request.options;
        options.tool_calls_enabled |= config.options.tool_calls_enabled;
        options.disable_thinking |= config.options.disable_thinking;
        options.extended_reasoning |= config.options.extended_reasoning;
        options.web_grounding_enabled |= config.options.web_grounding_enabled;

        let (options, dropped) = describe(provider).capabilities.filter(options);
        if !dropped.is_empty() {
            debug!(
                provider = provider.as_str(),
                dropped = ?dropped,
                "ignoring unsupported call options"
            );
        }
        let mut request = request.clone().with_options(options);
        if !options.tool_calls_enabled {
            request.tools = None;
        }

        let base = backend::api_base(&config, self.api_bases.get(&provider).map(String::as_str));
        let (wire, format) = backend::build(&config, &base, model, &request).map_err(|msg| {
            trace.fail(LlmError::fatal(provider, model, FatalReason::Misconfigured, msg))
        })?;

        debug!(
            provider = provider.as_str(),
            model,
            url = %wire.url,
            messages = request.messages.len(),
            images = request.has_images(),
            tools = request.tools.as_ref().map_or(0, |t| t.len()),
            "calling LLM"
        );

        trace.advance(CallState::Sent);
        let response = self
            .client
            .post(&wire.url)
            .headers(wire.headers)
            .timeout(timeout_for(provider))
            .json(&wire.body)
            .send()
            .await
            .map_err(|e| {
                warn!(provider = provider.as_str(), model, error = %e, "HTTP request failed");
                trace.fail(LlmError::from_reqwest(provider, model, &e))
            })?;

        let status = response.status();
        let retry_after = parse_retry_after(response.headers().get(RETRY_AFTER));
        let body = response
            .text()
            .await
            .map_err(|e| trace.fail(LlmError::from_reqwest(provider, model, &e)))?;

        if !status.is_success() {
            let err = LlmError::from_status(
                provider,
                model,
                status.as_u16(),
                &body,
                request.has_images(),
                retry_after,
            );
            warn!(
                provider = provider.as_str(),
                model,
                status = status.as_u16(),
                transient = err.is_transient(),
                error = %err,
                "LLM API error"
            );
            return Err(trace.fail(err));
        }

        let parsed = format.parse(&body).map_err(|msg| {
            error!(provider = provider.as_str(), model, error = %msg, "failed to decode LLM response");
            trace.fail(LlmError::fatal(
                provider,
                model,
                FatalReason::MalformedResponse,
                msg,
            ))
        })?;

        trace.advance(CallState::Succeeded);
        debug!(
            provider = provider.as_str(),
            model,
            has_content = parsed.content.is_some(),
            tool_calls = parsed.tool_calls.len(),
            finish_reason = parsed.finish_reason.as_deref().unwrap_or("?"),
            "LLM response received"
        );
        Ok(parsed)
    }

    /// Fix the provider and model for every call through the returned client.
    pub fn bind(&self, resolved: &ResolvedTemplateProvider) -> BoundClient {
        BoundClient {
            dispatcher: self.clone(),
            provider: resolved.provider(),
            model: resolved.model().to_string(),
        }
    }
}

/// `Retry-After` as delta-seconds. HTTP-date values are ignored.
fn parse_retry_after(value: Option<&reqwest::header::HeaderValue>) -> Option<Duration> {
    let secs: f64 = value?.to_str().ok()?.trim().parse().ok()?;
    // Out-of-range values (negative, NaN, overflow) are dropped.
    Duration::try_from_secs_f64(secs).ok()
}

// ─────────────────────────────────────────────
// BoundClient
// ─────────────────────────────────────────────

/// A dispatcher pinned to one resolved `(provider, model)` pair.
#[derive(Clone, Debug)]
pub struct BoundClient {
    dispatcher: LlmDispatcher,
    provider: Provider,
    model: String,
}

#[async_trait]
impl LlmClient for BoundClient {
    async fn chat(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.dispatcher.invoke(self.provider, &self.model, request).await
    }

    fn provider(&self) -> Provider {
        self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransientReason;
    use crate::registry::{Backend, ProviderConfig};
    use crate::template::TemplateProviderResolver;
    use serde_json::json;
    use slidegen_core::types::{CallOptions, Message, ToolDefinition};
    use slidegen_core::{Config, TemplateProviderOverride};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn registry_for(server: &MockServer) -> ProviderRegistry {
        let mut config = Config::default();
        for (key, value) in [
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-4.1"),
            ("GOOGLE_API_KEY", "g-test"),
            ("GOOGLE_MODEL", "gemini-2.0-flash"),
            ("ANTHROPIC_API_KEY", "sk-ant-test"),
            ("ANTHROPIC_MODEL", "claude-sonnet-4-20250514"),
            ("OLLAMA_MODEL", "llama3.1"),
            ("CUSTOM_MODEL", "qwen2.5-vl"),
        ] {
            config.set(key, value);
        }
        config.set("OLLAMA_URL", server.uri());
        config.set("CUSTOM_LLM_URL", format!("{}/custom/v1", server.uri()));
        ProviderRegistry::from_config(&config)
    }

    fn dispatcher_for(server: &MockServer) -> LlmDispatcher {
        let registry = Arc::new(registry_for(server));
        let mut dispatcher = LlmDispatcher::new(registry).unwrap();
        for provider in [Provider::OpenAi, Provider::Google, Provider::Anthropic] {
            dispatcher = dispatcher.with_api_base(provider, server.uri());
        }
        dispatcher
    }

    fn chat_ok(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-test",
            "choices": [{ "message": { "content": content }, "finish_reason": "stop" }],
            "usage": { "prompt_tokens": 5, "completion_tokens": 3, "total_tokens": 8 }
        }))
    }

    fn slide_request() -> LlmRequest {
        LlmRequest::new(vec![
            Message::system("Convert slides to HTML."),
            Message::user_with_image("Recreate this slide", "data:image/png;base64,iVBORw0KGgo="),
        ])
    }

    // ── Call state ──

    #[test]
    fn test_call_state_transitions() {
        use CallState::*;
        assert!(Pending.can_transition_to(Sent));
        assert!(Sent.can_transition_to(Succeeded));
        assert!(Sent.can_transition_to(Failed(FailureClass::Transient)));
        assert!(Sent.can_transition_to(Failed(FailureClass::Fatal)));
        assert!(Pending.can_transition_to(Failed(FailureClass::Fatal)));

        assert!(!Pending.can_transition_to(Succeeded));
        assert!(!Pending.can_transition_to(Failed(FailureClass::Transient)));
        assert!(!Succeeded.can_transition_to(Sent));
        assert!(!Failed(FailureClass::Fatal).can_transition_to(Sent));
        assert!(Succeeded.is_terminal() && !Sent.is_terminal());
    }

    #[test]
    fn test_timeouts() {
        assert_eq!(timeout_for(Provider::Ollama), LOCAL_TIMEOUT);
        assert_eq!(timeout_for(Provider::Custom), LOCAL_TIMEOUT);
        assert_eq!(timeout_for(Provider::Anthropic), HOSTED_TIMEOUT);
    }

    #[test]
    fn test_parse_retry_after() {
        use reqwest::header::HeaderValue;
        assert_eq!(
            parse_retry_after(Some(&HeaderValue::from_static("12"))),
            Some(Duration::from_secs(12))
        );
        assert_eq!(
            parse_retry_after(Some(&HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"))),
            None
        );
        assert_eq!(parse_retry_after(None), None);
    }

    #[test]
    fn test_parse_retry_after_out_of_range() {
        use reqwest::header::HeaderValue;
        for raw in ["1e30", "-5", "NaN", "inf"] {
            assert_eq!(
                parse_retry_after(Some(&HeaderValue::from_static(raw))),
                None,
                "retry-after {raw}"
            );
        }
        assert_eq!(
            parse_retry_after(Some(&HeaderValue::from_static("0.5"))),
            Some(Duration::from_millis(500))
        );
    }

    // ── Round trips per wire format ──

    #[tokio::test]
    async fn test_invoke_openai() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({ "model": "gpt-5", "max_completion_tokens": 8192 })))
            .respond_with(chat_ok("<div>slide</div>"))
            .expect(1)
            .mount(&server)
            .await;

        let resp = dispatcher_for(&server)
            .invoke(Provider::OpenAi, "gpt-5", &slide_request())
            .await
            .unwrap();
        assert_eq!(resp.content_str(), "<div>slide</div>");
        assert_eq!(resp.usage.unwrap().total_tokens, 8);
    }

    #[tokio::test]
    async fn test_invoke_ollama_under_v1() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({ "model": "llama3.1", "max_tokens": 8192 })))
            .respond_with(chat_ok("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let resp = dispatcher_for(&server)
            .invoke(Provider::Ollama, "llama3.1", &slide_request())
            .await
            .unwrap();
        assert_eq!(resp.content_str(), "ok");
        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_invoke_custom_url_as_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/custom/v1/chat/completions"))
            .respond_with(chat_ok("custom"))
            .expect(1)
            .mount(&server)
            .await;

        let resp = dispatcher_for(&server)
            .invoke(Provider::Custom, "qwen2.5-vl", &slide_request())
            .await
            .unwrap();
        assert_eq!(resp.content_str(), "custom");
    }

    #[tokio::test]
    async fn test_invoke_anthropic() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-ant-test"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(json!({
                "model": "claude-sonnet-4-20250514",
                "system": "Convert slides to HTML."
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{ "type": "text", "text": "<section/>" }],
                "stop_reason": "end_turn",
                "usage": { "input_tokens": 100, "output_tokens": 20 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = dispatcher_for(&server)
            .invoke(Provider::Anthropic, "claude-sonnet-4-20250514", &slide_request())
            .await
            .unwrap();
        assert_eq!(resp.content_str(), "<section/>");
        assert_eq!(resp.usage.unwrap().total_tokens, 120);
    }

    // ── Option filtering ──

    #[tokio::test]
    async fn test_unsupported_options_dropped_silently() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(chat_ok("ok"))
            .mount(&server)
            .await;

        let tool = ToolDefinition::new("emit", "emit", json!({"type": "object"}));
        let request = slide_request().with_tools(vec![tool]).with_options(CallOptions {
            tool_calls_enabled: false,
            disable_thinking: true,
            extended_reasoning: true,
            web_grounding_enabled: true,
        });

        dispatcher_for(&server)
            .invoke(Provider::Ollama, "llama3.1", &request)
            .await
            .unwrap();

        let requests: Vec<Request> = server.received_requests().await.unwrap();
        let body: serde_json::Value = requests[0].body_json().unwrap();
        assert_eq!(body["think"], false);
        assert!(body.get("reasoning_effort").is_none());
        assert!(body.get("web_search_options").is_none());
        assert!(body.get("tools").is_none());
    }

    #[tokio::test]
    async fn test_hosted_keeps_supported_options() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(chat_ok("ok"))
            .mount(&server)
            .await;

        let request = slide_request().with_options(CallOptions {
            disable_thinking: true,
            extended_reasoning: true,
            ..Default::default()
        });
        dispatcher_for(&server)
            .invoke(Provider::Google, "gemini-2.0-flash", &request)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = requests[0].body_json().unwrap();
        assert_eq!(body["reasoning_effort"], "high");
        assert!(body.get("chat_template_kwargs").is_none());
    }

    // ── Error classification ──

    #[tokio::test]
    async fn test_rate_limit_is_transient_with_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "3")
                    .set_body_json(json!({ "error": { "message": "Rate limit reached" } })),
            )
            .mount(&server)
            .await;

        let err = dispatcher_for(&server)
            .invoke(Provider::OpenAi, "gpt-5", &slide_request())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LlmError::Transient {
                reason: TransientReason::RateLimited,
                ..
            }
        ));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
    }

    #[tokio::test]
    async fn test_huge_retry_after_is_ignored() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "1e30")
                    .set_body_json(json!({ "error": { "message": "slow down" } })),
            )
            .mount(&server)
            .await;

        let err = dispatcher_for(&server)
            .invoke(Provider::OpenAi, "gpt-5", &slide_request())
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(err.retry_after(), None);
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = dispatcher_for(&server)
            .invoke(Provider::Anthropic, "claude-sonnet-4-20250514", &slide_request())
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(err.provider(), Provider::Anthropic);
    }

    #[tokio::test]
    async fn test_auth_error_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({ "error": { "message": "Incorrect API key provided" } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = dispatcher_for(&server)
            .invoke(Provider::OpenAi, "gpt-5", &slide_request())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Fatal { reason: FatalReason::Auth, .. }));
        assert!(err.to_string().contains("Incorrect API key"));
    }

    #[tokio::test]
    async fn test_non_vision_local_model_is_unsupported_capability() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({ "error": "model does not support image input" })),
            )
            .mount(&server)
            .await;

        let err = dispatcher_for(&server)
            .invoke(Provider::Ollama, "llama3.1", &slide_request())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LlmError::Fatal {
                reason: FatalReason::UnsupportedCapability,
                ..
            }
        ));
        assert!(err.to_string().contains("llama3.1"));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy page</html>"))
            .mount(&server)
            .await;

        let err = dispatcher_for(&server)
            .invoke(Provider::Custom, "qwen2.5-vl", &slide_request())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LlmError::Fatal {
                reason: FatalReason::MalformedResponse,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        let registry = ProviderRegistry::default().with(ProviderConfig {
            model_name: "llama3.1".into(),
            backend: Backend::Ollama {
                endpoint_url: "http://127.0.0.1:1".into(),
            },
            options: CallOptions::default(),
        });
        let dispatcher = LlmDispatcher::new(Arc::new(registry)).unwrap();
        let err = dispatcher
            .invoke(Provider::Ollama, "llama3.1", &slide_request())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LlmError::Transient {
                reason: TransientReason::Connect,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unconfigured_provider_fails_before_sending() {
        let server = MockServer::start().await;
        let dispatcher = LlmDispatcher::new(Arc::new(ProviderRegistry::default()))
            .unwrap()
            .with_api_base(Provider::OpenAi, server.uri());
        let err = dispatcher
            .invoke(Provider::OpenAi, "gpt-5", &slide_request())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LlmError::Fatal {
                reason: FatalReason::Misconfigured,
                ..
            }
        ));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    // ── Bound client ──

    #[tokio::test]
    async fn test_bound_client_uses_resolved_pair() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({ "model": "gpt-5" })))
            .respond_with(chat_ok("bound"))
            .expect(2)
            .mount(&server)
            .await;

        let dispatcher = dispatcher_for(&server);
        let resolved = TemplateProviderResolver::new(dispatcher.registry())
            .resolve(TemplateProviderOverride::Api, Provider::Ollama)
            .unwrap();
        let client = dispatcher.bind(&resolved);
        assert_eq!(client.provider(), Provider::OpenAi);
        assert_eq!(client.model(), "gpt-5");

        for _ in 0..2 {
            let resp = client.chat(&slide_request()).await.unwrap();
            assert_eq!(resp.content_str(), "bound");
        }
    }
}

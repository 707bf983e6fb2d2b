//! Resolution and dispatch errors.

use std::fmt;
use std::time::Duration;

use slidegen_core::{ConfigError, Provider};
use thiserror::Error;

// ─────────────────────────────────────────────
// ResolveError
// ─────────────────────────────────────────────

/// Failure to produce a usable template provider. Always fatal.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The selected provider has no valid configuration.
    #[error("template provider {provider} ({model}) is not usable: {source}")]
    UnresolvedProviderConfig {
        provider: Provider,
        model: String,
        #[source]
        source: ConfigError,
    },
}

impl ResolveError {
    /// The config key an operator should fix, when there is one.
    pub fn key(&self) -> Option<&'static str> {
        match self {
            ResolveError::Config(e) | ResolveError::UnresolvedProviderConfig { source: e, .. } => {
                e.key()
            }
        }
    }
}

// ─────────────────────────────────────────────
// LlmError
// ─────────────────────────────────────────────

/// Why a call failed in a way that may succeed on retry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransientReason {
    Timeout,
    Connect,
    RateLimited,
    ServerError(u16),
}

impl fmt::Display for TransientReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransientReason::Timeout => f.write_str("timed out"),
            TransientReason::Connect => f.write_str("connection failed"),
            TransientReason::RateLimited => f.write_str("rate limited"),
            TransientReason::ServerError(status) => write!(f, "server error {status}"),
        }
    }
}

/// Why a call failed in a way retrying will not fix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FatalReason {
    Auth,
    ModelNotFound,
    MalformedRequest,
    /// The model cannot handle the request, e.g. a non-vision model given an image.
    UnsupportedCapability,
    MalformedResponse,
    QuotaExceeded,
    /// The provider config could not be turned into a request.
    Misconfigured,
    /// Any other non-success status.
    Rejected(u16),
}

impl fmt::Display for FatalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalReason::Auth => f.write_str("authentication failed"),
            FatalReason::ModelNotFound => f.write_str("model not found"),
            FatalReason::MalformedRequest => f.write_str("malformed request"),
            FatalReason::UnsupportedCapability => f.write_str("model lacks a required capability"),
            FatalReason::MalformedResponse => f.write_str("malformed response"),
            FatalReason::QuotaExceeded => f.write_str("quota exceeded"),
            FatalReason::Misconfigured => f.write_str("provider misconfigured"),
            FatalReason::Rejected(status) => write!(f, "rejected with status {status}"),
        }
    }
}

/// A failed LLM call, tagged with the provider and model it was sent to.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LlmError {
    #[error("{provider} ({model}) {reason}: {message}")]
    Transient {
        provider: Provider,
        model: String,
        reason: TransientReason,
        message: String,
        /// Server-requested delay before the next attempt.
        retry_after: Option<Duration>,
    },

    #[error("{provider} ({model}) {reason}: {message}")]
    Fatal {
        provider: Provider,
        model: String,
        reason: FatalReason,
        message: String,
    },
}

impl LlmError {
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::Transient { .. })
    }

    pub fn provider(&self) -> Provider {
        match self {
            LlmError::Transient { provider, .. } | LlmError::Fatal { provider, .. } => *provider,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            LlmError::Transient { model, .. } | LlmError::Fatal { model, .. } => model,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::Transient { retry_after, .. } => *retry_after,
            LlmError::Fatal { .. } => None,
        }
    }

    pub fn fatal(
        provider: Provider,
        model: &str,
        reason: FatalReason,
        message: impl Into<String>,
    ) -> Self {
        LlmError::Fatal {
            provider,
            model: model.to_string(),
            reason,
            message: message.into(),
        }
    }

    /// Classify a non-success HTTP response.
    ///
    /// `has_images` marks requests carrying vision input so that a rejection
    /// mentioning images is reported as a capability problem instead of a
    /// generic bad request.
    pub fn from_status(
        provider: Provider,
        model: &str,
        status: u16,
        body: &str,
        has_images: bool,
        retry_after: Option<Duration>,
    ) -> Self {
        let message = summarize_body(body);
        let lower = body.to_ascii_lowercase();

        let transient = |reason| LlmError::Transient {
            provider,
            model: model.to_string(),
            reason,
            message: message.clone(),
            retry_after,
        };
        let fatal = |reason| LlmError::fatal(provider, model, reason, message.clone());

        if has_images && matches!(status, 400 | 404 | 415 | 422) && mentions_vision(&lower) {
            return fatal(FatalReason::UnsupportedCapability);
        }

        match status {
            408 => transient(TransientReason::Timeout),
            429 if lower.contains("insufficient_quota") || lower.contains("quota") => {
                fatal(FatalReason::QuotaExceeded)
            }
            429 => transient(TransientReason::RateLimited),
            500..=599 => transient(TransientReason::ServerError(status)),
            401 | 403 => fatal(FatalReason::Auth),
            404 => fatal(FatalReason::ModelNotFound),
            400 | 422 => fatal(FatalReason::MalformedRequest),
            other => fatal(FatalReason::Rejected(other)),
        }
    }

    /// Classify a transport-level failure.
    pub fn from_reqwest(provider: Provider, model: &str, err: &reqwest::Error) -> Self {
        let transient = |reason| LlmError::Transient {
            provider,
            model: model.to_string(),
            reason,
            message: err.to_string(),
            retry_after: None,
        };

        if err.is_timeout() {
            transient(TransientReason::Timeout)
        } else if err.is_connect() || err.is_request() {
            transient(TransientReason::Connect)
        } else if err.is_decode() || err.is_body() {
            LlmError::fatal(provider, model, FatalReason::MalformedResponse, err.to_string())
        } else if err.is_builder() {
            LlmError::fatal(provider, model, FatalReason::Misconfigured, err.to_string())
        } else {
            transient(TransientReason::Connect)
        }
    }
}

fn mentions_vision(lower_body: &str) -> bool {
    ["image", "vision", "multimodal"]
        .iter()
        .any(|needle| lower_body.contains(needle))
}

/// Pull the human-readable message out of a provider error body.
fn summarize_body(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        v.pointer("/error/message")
            .or_else(|| v.get("error").filter(|e| e.is_string()))
            .or_else(|| v.get("message"))
            .and_then(|m| m.as_str())
    });
    let text = message.unwrap_or(body).trim();
    if text.is_empty() {
        "empty response body".to_string()
    } else {
        slidegen_core::utils::truncate_string(text, 300)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

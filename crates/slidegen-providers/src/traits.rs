//! LLM client trait: the seam between the pipeline and the dispatcher.
//!
//! The dispatcher's `BoundClient` implements it for real backends; the
//! pipeline wraps it in its retry decorator, and tests swap in stubs.

use async_trait::async_trait;
use slidegen_core::types::{LlmRequest, LlmResponse};
use slidegen_core::Provider;

use crate::error::LlmError;

/// A chat client with its provider and model already fixed.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one non-streaming chat turn.
    ///
    /// Errors are classified as transient or fatal; implementations do not
    /// retry.
    async fn chat(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// The provider every call goes to.
    fn provider(&self) -> Provider;

    /// The model every call uses.
    fn model(&self) -> &str;
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for std::sync::Arc<T> {
    async fn chat(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        (**self).chat(request).await
    }

    fn provider(&self) -> Provider {
        (**self).provider()
    }

    fn model(&self) -> &str {
        (**self).model()
    }
}

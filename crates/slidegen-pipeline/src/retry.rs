//! Retry decorator for LLM clients.
//!
//! Only transient failures are retried, with exponential backoff and a
//! bounded number of attempts. A server-sent `retry-after` replaces the
//! computed delay.

use std::time::Duration;

use async_trait::async_trait;
use slidegen_core::types::{LlmRequest, LlmResponse};
use slidegen_core::Provider;
use slidegen_providers::{LlmClient, LlmError};
use tracing::warn;

/// How many times to try and how long to wait between tries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. 1 disables retrying.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before attempt `attempt + 1`, after `attempt` failures.
    pub fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let backoff = retry_after.unwrap_or_else(|| {
            let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
            self.base_delay.saturating_mul(factor)
        });
        backoff.min(self.max_delay)
    }
}

/// Wraps a client and retries its transient failures.
#[derive(Clone, Debug)]
pub struct Retrying<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: LlmClient> Retrying<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait]
impl<C: LlmClient> LlmClient for Retrying<C> {
    async fn chat(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.inner.chat(request).await {
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.policy.delay(attempt, e.retry_after());
                    warn!(
                        provider = self.inner.provider().as_str(),
                        model = self.inner.model(),
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient LLM failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn provider(&self) -> Provider {
        self.inner.provider()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidegen_core::types::Message;
    use slidegen_providers::{FatalReason, TransientReason};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Returns queued results in order, then succeeds.
    struct Scripted {
        results: Mutex<Vec<Result<LlmResponse, LlmError>>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(results: Vec<Result<LlmResponse, LlmError>>) -> Self {
            Self {
                results: Mutex::new(results),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmClient for Scripted {
        async fn chat(&self, _request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut results = self.results.lock().unwrap();
            if results.is_empty() {
                Ok(LlmResponse::text("ok"))
            } else {
                results.remove(0)
            }
        }
        fn provider(&self) -> Provider {
            Provider::Ollama
        }
        fn model(&self) -> &str {
            "llama3.1"
        }
    }

    fn transient(retry_after: Option<Duration>) -> LlmError {
        LlmError::Transient {
            provider: Provider::Ollama,
            model: "llama3.1".into(),
            reason: TransientReason::ServerError(503),
            message: "busy".into(),
            retry_after,
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    fn request() -> LlmRequest {
        LlmRequest::new(vec![Message::user("x")])
    }

    #[test]
    fn test_delay_backoff() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        };
        assert_eq!(policy.delay(1, None), Duration::from_secs(1));
        assert_eq!(policy.delay(2, None), Duration::from_secs(2));
        assert_eq!(policy.delay(3, None), Duration::from_secs(4));
        assert_eq!(policy.delay(5, None), Duration::from_secs(10));
        assert_eq!(policy.delay(1, Some(Duration::from_secs(7))), Duration::from_secs(7));
        assert_eq!(policy.delay(1, Some(Duration::from_secs(90))), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let client = Retrying::new(
            Scripted::new(vec![Err(transient(None)), Err(transient(None))]),
            fast_policy(3),
        );
        let resp = client.chat(&request()).await.unwrap();
        assert_eq!(resp.content_str(), "ok");
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let client = Retrying::new(
            Scripted::new(vec![
                Err(transient(None)),
                Err(transient(None)),
                Err(transient(Some(Duration::from_millis(1)))),
            ]),
            fast_policy(2),
        );
        let err = client.chat(&request()).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fatal_not_retried() {
        let fatal = LlmError::fatal(Provider::Ollama, "llama3.1", FatalReason::Auth, "denied");
        let client = Retrying::new(Scripted::new(vec![Err(fatal.clone())]), fast_policy(5));
        assert_eq!(client.chat(&request()).await.unwrap_err(), fatal);
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_retry_policy() {
        let client = Retrying::new(
            Scripted::new(vec![Err(transient(None))]),
            RetryPolicy::no_retry(),
        );
        assert!(client.chat(&request()).await.is_err());
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_passes_through_identity() {
        let client = Retrying::new(Scripted::new(vec![]), RetryPolicy::default());
        assert_eq!(client.provider(), Provider::Ollama);
        assert_eq!(client.model(), "llama3.1");
    }
}

//! Resilient upstream invocation with pacing and retry.
//!
//! Wraps a [`Provider`] so every call first claims the session's slot in the
//! [`RateGate`], then retries failures with exponential backoff. The gate is
//! re-acquired before every attempt, so retries are paced the same as fresh
//! calls.

use crate::gate::RateGate;
use crate::provider::{InvokeRequest, InvokeResponse, Provider};
use confab_common::{Limits, Result};
use std::sync::Arc;
use std::time::Duration;

/// Retry policy for upstream calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// First backoff delay (doubles with each retry).
    pub base_delay: Duration,
}

impl RetryConfig {
    pub fn from_limits(limits: &Limits) -> Self {
        Self {
            max_retries: limits.max_retries,
            base_delay: limits.retry_delay,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(5),
        }
    }
}

/// A provider wrapper that paces and retries every invocation.
pub struct ResilientClient {
    provider: Arc<dyn Provider>,
    gate: Arc<RateGate>,
    config: RetryConfig,
}

impl ResilientClient {
    pub fn new(provider: Arc<dyn Provider>, gate: Arc<RateGate>, config: RetryConfig) -> Self {
        Self {
            provider,
            gate,
            config,
        }
    }

    /// Calculate backoff delay for a given attempt.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.config
            .base_delay
            .saturating_mul(2_u32.saturating_pow(attempt))
    }

    /// Invoke upstream for `session_id`, retrying on any error.
    ///
    /// The attempt budget is `max_retries + 1` calls total. The last error
    /// is returned unchanged when the budget runs out.
    pub async fn invoke(&self, session_id: &str, request: InvokeRequest) -> Result<InvokeResponse> {
        let provider_name = self.provider.name();
        let mut attempt: u32 = 0;

        loop {
            self.gate.acquire(session_id).await;

            match self.provider.invoke(request.clone()).await {
                Ok(response) => {
                    if attempt > 0 {
                        tracing::info!(
                            provider = provider_name,
                            attempt = attempt + 1,
                            "Upstream recovered after retries"
                        );
                    }
                    if let Some(usage) = response.usage {
                        tracing::debug!(
                            provider = provider_name,
                            input_tokens = usage.input_tokens,
                            output_tokens = usage.output_tokens,
                            "Upstream call completed"
                        );
                    }
                    return Ok(response);
                }
                Err(e) => {
                    if attempt >= self.config.max_retries {
                        tracing::warn!(
                            provider = provider_name,
                            attempts = attempt + 1,
                            error = %e,
                            "Upstream retries exhausted"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff_delay(attempt);
                    tracing::warn!(
                        provider = provider_name,
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Upstream call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use confab_common::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    /// Mock provider for testing
    struct MockProvider {
        calls: Arc<AtomicUsize>,
        fail_until: usize,
        response: &'static str,
        make_error: fn() -> Error,
    }

    impl MockProvider {
        fn new(
            fail_until: usize,
            response: &'static str,
            make_error: fn() -> Error,
        ) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    calls: Arc::clone(&calls),
                    fail_until,
                    response,
                    make_error,
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn invoke(&self, _request: InvokeRequest) -> Result<InvokeResponse> {
            let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

            if attempt <= self.fail_until {
                return Err((self.make_error)());
            }

            Ok(InvokeResponse::text_only(self.response))
        }
    }

    fn make_request() -> InvokeRequest {
        InvokeRequest::text("hello")
    }

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            base_delay: Duration::from_millis(1),
        }
    }

    fn open_gate() -> Arc<RateGate> {
        Arc::new(RateGate::new(Duration::ZERO))
    }

    #[tokio::test]
    async fn succeeds_without_retry() {
        let (provider, calls) =
            MockProvider::new(0, "success", || Error::Upstream("boom".to_string()));
        let client = ResilientClient::new(Arc::new(provider), open_gate(), fast_config(2));

        let result = client.invoke("s1", make_request()).await.unwrap();
        assert_eq!(result.text, "success");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let (provider, calls) =
            MockProvider::new(1, "recovered", || Error::RateLimited("slow down".to_string()));
        let client = ResilientClient::new(Arc::new(provider), open_gate(), fast_config(2));

        let result = client.invoke("s1", make_request()).await.unwrap();
        assert_eq!(result.text, "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 2); // 1 fail + 1 success
    }

    #[tokio::test]
    async fn returns_last_error_when_budget_exhausted() {
        let (provider, calls) = MockProvider::new(usize::MAX, "never", || {
            Error::QuotaExceeded("quota".to_string())
        });
        let client = ResilientClient::new(Arc::new(provider), open_gate(), fast_config(3));

        let err = client.invoke("s1", make_request()).await.unwrap_err();
        assert!(matches!(err, Error::QuotaExceeded(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 4); // initial + 3 retries
    }

    #[tokio::test]
    async fn gate_is_reacquired_on_every_attempt() {
        let (provider, calls) =
            MockProvider::new(2, "eventually", || Error::Upstream("flaky".to_string()));
        let gate = Arc::new(RateGate::new(Duration::from_millis(25)));
        let client = ResilientClient::new(Arc::new(provider), gate, fast_config(3));

        let start = Instant::now();
        let result = client.invoke("s1", make_request()).await.unwrap();
        assert_eq!(result.text, "eventually");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // attempts two and three each waited out the gate interval
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn backoff_doubles_with_attempts() {
        let (provider, _) = MockProvider::new(0, "", || Error::Upstream(String::new()));
        let client = ResilientClient::new(Arc::new(provider), open_gate(), RetryConfig::default());

        // Base is 5000ms
        let d0 = client.backoff_delay(0);
        let d1 = client.backoff_delay(1);
        let d2 = client.backoff_delay(2);

        assert_eq!(d0.as_millis(), 5_000);
        assert_eq!(d1.as_millis(), 10_000);
        assert_eq!(d2.as_millis(), 20_000);
    }
}

//! Timeout and bounded-retry decorator for any embedding provider.

use crate::{EmbedResponse, EmbeddingProvider, ProviderError};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Per-attempt deadline.
    pub timeout: Duration,
    /// Total attempts, including the first one. Zero is treated as one.
    pub max_attempts: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: usize) -> Duration {
        let shift = attempt.min(16) as u32;
        self.base_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }
}

pub struct RetryingProvider<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P: EmbeddingProvider> RetryingProvider<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait::async_trait]
impl<P: EmbeddingProvider> EmbeddingProvider for RetryingProvider<P> {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0usize;
        loop {
            let result = match tokio::time::timeout(self.policy.timeout, self.inner.embed(texts))
                .await
            {
                Ok(r) => r,
                Err(_) => Err(ProviderError::Timeout(self.policy.timeout)),
            };
            match result {
                Err(err) if err.is_transient() && attempt + 1 < attempts => {
                    let delay = self.policy.backoff(attempt);
                    attempt += 1;
                    warn!(attempt, ?delay, error = %err, "embedding call failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

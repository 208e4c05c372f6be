use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use shopassist_core::config::LlmConfig;
use tracing::warn;

use crate::llm::{ChatMessage, LlmClient, ResponseFormat};

/// Randomized exponential backoff: attempt `n` waits a random duration
/// between `base_delay` and `min(max_delay, base_delay * 2^n)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(20),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
        }
    }

    /// No waiting between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self { max_retries, base_delay: Duration::ZERO, max_delay: Duration::ZERO }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ceiling = self
            .base_delay
            .checked_mul(2u32.saturating_pow(attempt))
            .unwrap_or(self.max_delay)
            .min(self.max_delay);
        let floor = self.base_delay.min(ceiling);
        if ceiling <= floor {
            return floor;
        }

        let millis = rand::thread_rng().gen_range(floor.as_millis()..=ceiling.as_millis());
        Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
    }
}

/// Retries a collaborator call with backoff. The wrapped client is unaware
/// of retries, and so is everything that consumes this one.
#[derive(Clone, Debug)]
pub struct RetryingClient<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C> RetryingClient<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<C> LlmClient for RetryingClient<C>
where
    C: LlmClient,
{
    async fn complete(&self, messages: &[ChatMessage], format: ResponseFormat) -> Result<String> {
        let mut attempt = 0u32;
        loop {
            match self.inner.complete(messages, format).await {
                Ok(reply) => return Ok(reply),
                Err(error) if attempt + 1 < self.policy.max_attempts() => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        event_name = "agent.llm.retry_scheduled",
                        attempt = attempt + 1,
                        max_attempts = self.policy.max_attempts(),
                        delay_ms = delay.as_millis() as u64,
                        error = %format!("{error:#}"),
                        "collaborator call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

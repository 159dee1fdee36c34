//! Rate limit governor
//!
//! Wraps any [`Fetch`] and absorbs `RateLimited` failures: the calling task
//! sleeps for the server's `Retry-After` hint (or an exponential backoff with
//! jitter when there is none) and re-issues the same request. Other errors
//! pass through on first occurrence.

use super::client::Fetch;
use crate::error::{Error, Result};
use crate::types::{JsonValue, QueryParams};
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, warn};

/// Bounds and timings for rate-limit retries
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed per logical request (attempts = retries + 1)
    pub max_retries: u32,
    /// First backoff when the server gives no hint
    pub initial_backoff: Duration,
    /// Upper bound for computed backoff
    pub max_backoff: Duration,
    /// Growth factor per attempt
    pub multiplier: f64,
    /// Scale computed backoff by a random 50-100%
    pub jitter: bool,
    /// Upper bound for server-provided `Retry-After`
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: true,
            max_wait: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    /// Set max retries
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set backoff bounds used when no hint is given
    #[must_use]
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Enable or disable jitter
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Cap server-provided waits
    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Computed backoff for a zero-based attempt number
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_backoff.as_secs_f64());

        let delay = if self.jitter {
            capped * rand::thread_rng().gen_range(0.5..=1.0)
        } else {
            capped
        };

        Duration::from_secs_f64(delay.max(0.0))
    }

    /// How long to wait before retry number `attempt`
    pub fn wait_for(&self, attempt: u32, retry_after_seconds: Option<u64>) -> Duration {
        match retry_after_seconds {
            Some(secs) => Duration::from_secs(secs).min(self.max_wait),
            None => self.backoff(attempt),
        }
    }
}

/// Retrying wrapper around a [`Fetch`] implementation
#[derive(Debug)]
pub struct RateLimitGovernor<F> {
    inner: F,
    policy: RetryPolicy,
}

impl<F: Fetch> RateLimitGovernor<F> {
    /// Wrap `inner` with the given policy
    pub fn new(inner: F, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// The wrapped fetcher
    pub fn inner(&self) -> &F {
        &self.inner
    }

    /// The active policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<F: Fetch> Fetch for RateLimitGovernor<F> {
    async fn fetch(&self, path: &str, query: &QueryParams) -> Result<JsonValue> {
        let mut attempt = 0u32;

        loop {
            match self.inner.fetch(path, query).await {
                Err(Error::RateLimited {
                    status,
                    retry_after_seconds,
                }) => {
                    if attempt >= self.policy.max_retries {
                        warn!(
                            path,
                            attempts = attempt + 1,
                            max_retries = self.policy.max_retries,
                            "rate limit retries exhausted"
                        );
                        return Err(Error::ExhaustedRetries {
                            max_retries: self.policy.max_retries,
                            path: path.to_string(),
                        });
                    }

                    let wait = self.policy.wait_for(attempt, retry_after_seconds);
                    warn!(
                        path,
                        status,
                        attempt = attempt + 1,
                        max_retries = self.policy.max_retries,
                        wait_ms = wait.as_millis() as u64,
                        "rate limited, backing off"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                other => {
                    if attempt > 0 && other.is_ok() {
                        debug!(path, retries = attempt, "request succeeded after backoff");
                    }
                    return other;
                }
            }
        }
    }
}

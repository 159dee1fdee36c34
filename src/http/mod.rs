//! HTTP client module
//!
//! Provides the authenticated client adapter and the retry layer above it.
//!
//! # Features
//!
//! - **Status Classification**: auth, not-found, rate-limit and decode failures
//! - **Rate Limit Governor**: `Retry-After` aware retries with bounded attempts
//! - **Throttling**: optional token bucket sized in requests per minute

mod client;
mod rate_limit;
mod retry;

pub(crate) use client::describe_error_body;
pub use client::{Fetch, HttpClient, HttpClientConfig, HttpClientConfigBuilder};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use retry::{RateLimitGovernor, RetryPolicy};

#[cfg(test)]
mod tests;

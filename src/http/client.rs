//! HTTP client adapter
//!
//! Issues one authenticated GET per call and classifies the outcome:
//! - 2xx bodies are decoded as JSON
//! - 401/403 become `Auth`, 404 becomes `NotFound`
//! - 429/5xx become `RateLimited` carrying the `Retry-After` hint
//! - anything else becomes `HttpStatus`
//!
//! Retrying is not done here; see [`super::RateLimitGovernor`].

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::auth::Credentials;
use crate::error::{Error, Result};
use crate::types::{JsonValue, OptionStringExt, QueryParams};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Anything that can turn an endpoint path plus query into a JSON body
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetch and decode one response
    async fn fetch(&self, path: &str, query: &QueryParams) -> Result<JsonValue>;
}

#[async_trait]
impl<T: Fetch + ?Sized> Fetch for Arc<T> {
    async fn fetch(&self, path: &str, query: &QueryParams) -> Result<JsonValue> {
        (**self).fetch(path, query).await
    }
}

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL all endpoint paths are joined onto
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Proactive request throttle
    pub rate_limit: Option<RateLimiterConfig>,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: Duration::from_secs(60),
            rate_limit: None,
            default_headers: HashMap::new(),
            user_agent: format!("freshdesk-source/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Authenticated HTTP client bound to one API root
pub struct HttpClient {
    client: Client,
    base_url: Url,
    config: HttpClientConfig,
    credentials: Option<Credentials>,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;
        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            base_url,
            config,
            credentials: None,
            rate_limiter,
        })
    }

    /// Create a client that authenticates every request
    pub fn with_credentials(config: HttpClientConfig, credentials: Credentials) -> Result<Self> {
        let mut client = Self::with_config(config)?;
        client.credentials = Some(credentials);
        Ok(client)
    }

    /// Base URL endpoint paths are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// Resolve a relative endpoint path
    pub fn url_for(&self, path: &str) -> Result<Url> {
        let invalid = path.starts_with('/')
            || path.contains("://")
            || path.split('/').any(|segment| segment == "..");
        if invalid {
            return Err(Error::InvalidPath {
                path: path.to_string(),
            });
        }
        Ok(self.base_url.join(path)?)
    }

    /// Send a GET without classifying the status
    pub async fn send(&self, path: &str, query: &QueryParams) -> Result<Response> {
        let url = self.url_for(path)?;

        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }

        let mut req = self.client.get(url);
        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(ref credentials) = self.credentials {
            req = credentials.apply(req);
        }

        let response = req.send().await?;
        debug!(path, status = response.status().as_u16(), "request completed");
        Ok(response)
    }
}

#[async_trait]
impl Fetch for HttpClient {
    async fn fetch(&self, path: &str, query: &QueryParams) -> Result<JsonValue> {
        let response = self.send(path, query).await?;
        classify(path, response).await
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url.as_str())
            .field("has_credentials", &self.credentials.is_some())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Turn a response into a decoded body or a classified error
async fn classify(path: &str, response: Response) -> Result<JsonValue> {
    let status = response.status();

    if status.is_success() {
        let body = response.bytes().await?;
        return serde_json::from_slice(&body)
            .map_err(|e| Error::decode(format!("'{path}' returned malformed JSON: {e}")));
    }

    if is_rate_limit_status(status) {
        let retry_after_seconds = extract_retry_after(&response);
        return Err(Error::RateLimited {
            status: status.as_u16(),
            retry_after_seconds,
        });
    }

    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            let message = describe_error_body(&body).unwrap_or_else(|| "Invalid credentials".into());
            warn!(path, status = status.as_u16(), "authentication rejected");
            Err(Error::auth(status.as_u16(), message))
        }
        StatusCode::NOT_FOUND => Err(Error::not_found(path)),
        _ => Err(Error::http_status(status.as_u16(), body)),
    }
}

/// Check if an HTTP status signals throttling or a transient server fault
fn is_rate_limit_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Extract retry-after header value in whole seconds
fn extract_retry_after(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| secs.ceil() as u64)
}

/// Render a Freshdesk error body as `code: message`
///
/// Returns `None` when the body is not JSON or carries no `message`.
pub(crate) fn describe_error_body(body: &str) -> Option<String> {
    let value: JsonValue = serde_json::from_str(body).ok()?;
    let message = value
        .get("message")
        .and_then(JsonValue::as_str)
        .map(ToString::to_string)
        .none_if_empty()?;
    let code = value
        .get("code")
        .and_then(JsonValue::as_str)
        .map(ToString::to_string)
        .none_if_empty();

    Some(match code {
        Some(code) => format!("{code}: {message}"),
        None => message,
    })
}

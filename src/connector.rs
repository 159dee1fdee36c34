//! Freshdesk source facade
//!
//! Ties configuration, the HTTP stack and the stream catalog together and
//! exposes the connector operations: check, discover and read.

use crate::auth::Credentials;
use crate::config::SourceConfig;
use crate::engine::{Message, MessageSink, SyncConfig, SyncEngine, SyncOutcome};
use crate::error::{Error, Result};
use crate::http::{
    describe_error_body, HttpClient, HttpClientConfig, RateLimitGovernor, RateLimiterConfig,
    RetryPolicy,
};
use crate::state::SyncState;
use crate::stream::{freshdesk_catalog, Stream, StreamDescriptor};
use crate::types::{JsonValue, QueryParams, SyncMode};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Endpoint probed by the connection check
pub const CHECK_PATH: &str = "settings/helpdesk";

/// Lazily produced sync messages
pub type MessageStream = BoxStream<'static, Message>;

// ============================================================================
// Check Result
// ============================================================================

/// Result of a connection check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Whether the check succeeded
    pub success: bool,

    /// Error message if failed
    pub message: Option<String>,
}

impl CheckResult {
    /// Create a successful check result
    pub fn success() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// Create a failed check result
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Discovery output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Streams in sync order
    pub streams: Vec<CatalogEntry>,
}

/// One stream as advertised by discovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stream name
    pub name: String,
    /// Permissive JSON schema
    pub json_schema: JsonValue,
    /// Modes the stream can run in
    pub supported_sync_modes: Vec<SyncMode>,
    /// Whether the cursor is fixed by the source
    pub source_defined_cursor: bool,
    /// Cursor field path, empty for full-refresh streams
    pub default_cursor_field: Vec<String>,
    /// Primary key, one path per key field
    pub source_defined_primary_key: Vec<Vec<String>>,
}

impl From<&StreamDescriptor> for CatalogEntry {
    fn from(descriptor: &StreamDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            json_schema: json!({
                "$schema": "http://json-schema.org/draft-07/schema#",
                "type": "object",
                "additionalProperties": true,
            }),
            supported_sync_modes: descriptor.supported_sync_modes(),
            source_defined_cursor: descriptor.is_incremental(),
            default_cursor_field: descriptor.cursor_field.iter().cloned().collect(),
            source_defined_primary_key: descriptor
                .primary_key
                .iter()
                .map(|field| vec![field.clone()])
                .collect(),
        }
    }
}

// ============================================================================
// Source
// ============================================================================

/// The Freshdesk source connector
#[derive(Debug, Clone)]
pub struct FreshdeskSource {
    config: SourceConfig,
    retry: RetryPolicy,
    sync: SyncConfig,
}

impl FreshdeskSource {
    /// Create a source from a config, validating it first
    pub fn new(config: SourceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            retry: RetryPolicy::default(),
            sync: SyncConfig::default(),
        })
    }

    /// Override the rate-limit retry policy
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Override engine settings
    #[must_use]
    pub fn with_sync_config(mut self, config: SyncConfig) -> Self {
        self.sync = config;
        self
    }

    /// The validated configuration
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Authenticated client without retries
    pub fn http_client(&self) -> Result<HttpClient> {
        let mut builder = HttpClientConfig::builder().base_url(self.config.api_root()?.as_str());
        if let Some(rpm) = self.config.requests_per_minute {
            builder = builder.rate_limit(RateLimiterConfig::per_minute(rpm));
        }
        HttpClient::with_credentials(builder.build(), Credentials::api_key(&self.config.api_key))
    }

    /// Authenticated client behind the rate limit governor
    pub fn client(&self) -> Result<RateLimitGovernor<HttpClient>> {
        Ok(RateLimitGovernor::new(self.http_client()?, self.retry.clone()))
    }

    /// Probe the API with the configured credentials
    ///
    /// Never fails; problems are reported in the result.
    pub async fn check(&self) -> CheckResult {
        let client = match self.http_client() {
            Ok(client) => client,
            Err(e) => return CheckResult::failure(e.to_string()),
        };

        let response = match client.send(CHECK_PATH, &QueryParams::new()).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "connection check failed");
                return CheckResult::failure(e.to_string());
            }
        };

        let status = response.status();
        if status.is_success() {
            info!(domain = %self.config.domain, "connection check succeeded");
            return CheckResult::success();
        }

        let body = response.text().await.unwrap_or_default();
        let message = describe_error_body(&body).unwrap_or_else(|| "Invalid credentials".to_string());
        warn!(status = status.as_u16(), message = %message, "connection check rejected");
        CheckResult::failure(message)
    }

    /// Describe every stream
    pub fn discover(&self) -> Catalog {
        Catalog {
            streams: freshdesk_catalog().iter().map(CatalogEntry::from).collect(),
        }
    }

    /// Streams to sync, in catalog order
    ///
    /// `selected` narrows the set; unknown names are an error.
    pub fn streams(&self, selected: Option<&[String]>) -> Result<Vec<Stream>> {
        let catalog = freshdesk_catalog();

        if let Some(names) = selected {
            if let Some(unknown) = names
                .iter()
                .find(|name| !catalog.iter().any(|d| &d.name == *name))
            {
                return Err(Error::StreamNotFound {
                    stream: unknown.clone(),
                });
            }
        }

        catalog
            .into_iter()
            .filter(|d| selected.map_or(true, |names| names.iter().any(|n| n == &d.name)))
            .map(|descriptor| {
                descriptor.validate()?;
                Ok(Stream::new(descriptor, self.config.start_date)
                    .with_not_found_policy(self.config.not_found_policy))
            })
            .collect()
    }

    fn engine(&self, cancel: CancellationToken) -> Result<SyncEngine<RateLimitGovernor<HttpClient>>> {
        Ok(SyncEngine::new(self.client()?)
            .with_config(self.sync.clone())
            .with_cancellation(cancel))
    }

    /// Sync into `sink`, starting from `state`
    pub async fn read<S: MessageSink + ?Sized>(
        &self,
        state: SyncState,
        selected: Option<&[String]>,
        sink: &mut S,
        cancel: CancellationToken,
    ) -> Result<SyncOutcome> {
        let streams = self.streams(selected)?;
        let engine = self.engine(cancel)?;

        info!(
            streams = streams.len(),
            domain = %self.config.domain,
            "starting read"
        );
        let outcome = engine.run(&streams, state, sink).await?;
        info!(
            records = outcome.stats.records_synced,
            pages = outcome.stats.pages_fetched,
            duration_ms = outcome.stats.duration_ms,
            cancelled = outcome.cancelled,
            "read finished"
        );
        Ok(outcome)
    }

    /// Sync on a background task, yielding messages as they are produced
    ///
    /// The channel holds at most one page of records, so a slow consumer
    /// holds the engine back instead of buffering. The handle resolves to
    /// the run's outcome once the stream is drained.
    pub fn read_stream(
        &self,
        state: SyncState,
        selected: Option<Vec<String>>,
        cancel: CancellationToken,
    ) -> Result<(MessageStream, JoinHandle<Result<SyncOutcome>>)> {
        let streams = self.streams(selected.as_deref())?;
        let engine = self.engine(cancel)?;
        let capacity = streams
            .iter()
            .map(|s| s.descriptor().page_size as usize)
            .max()
            .unwrap_or(1)
            .max(1);

        let (mut tx, rx) = mpsc::channel::<Message>(capacity);
        let handle = tokio::spawn(async move {
            let result = engine.run(&streams, state, &mut tx).await;
            debug!(ok = result.is_ok(), "background read finished");
            result
        });

        let messages = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|message| (message, rx))
        });

        Ok((Box::pin(messages), handle))
    }
}

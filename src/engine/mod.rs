//! Execution engine module
//!
//! Main read loop and stream orchestration.
//!
//! # Overview
//!
//! The engine module provides:
//! - `SyncEngine` - runs streams in order, forwarding records and checkpoints
//! - `MessageSink` - where messages go (vector, channel, JSON lines, state file)
//! - Message types for output (Record, State)

mod sink;
mod types;

pub use sink::{CheckpointingSink, JsonLinesSink, MessageSink};
pub use types::{Message, SyncConfig, SyncOutcome, SyncStats};

use crate::error::Result;
use crate::http::Fetch;
use crate::state::SyncState;
use crate::stream::Stream;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Sync engine for orchestrating data extraction
pub struct SyncEngine<F> {
    /// Fetcher shared by every stream
    fetcher: F,
    /// Sync configuration
    config: SyncConfig,
    /// Checked between pages
    cancel: CancellationToken,
}

impl<F: Fetch> SyncEngine<F> {
    /// Create a new sync engine
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            config: SyncConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Set sync configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Stop at the next page boundary once `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this engine's runs
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Get the fetcher
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Get the sync configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Sync `streams` in order, starting from `prior` state
    ///
    /// Records go to `sink` as soon as each page arrives. A state message
    /// follows every completed stream, and every `checkpoint_interval` pages
    /// of a stream sorted by its cursor. A fatal error aborts the run,
    /// attributed to the failing stream; checkpoints already emitted stay
    /// valid.
    pub async fn run<S: MessageSink + ?Sized>(
        &self,
        streams: &[Stream],
        prior: SyncState,
        sink: &mut S,
    ) -> Result<SyncOutcome> {
        let start = Instant::now();
        let mut state = prior;
        let mut stats = SyncStats::new();

        for stream in streams {
            let name = stream.name();
            let descriptor = stream.descriptor();

            if self.cancel.is_cancelled() {
                return self
                    .finish_cancelled(name, state, stats, start, sink)
                    .await;
            }

            let since = if descriptor.is_incremental() {
                state.get_cursor(name)
            } else {
                None
            };

            info!(
                stream = %name,
                mode = ?descriptor.sync_mode(),
                since = ?since.map(|c| c.to_string()),
                "Starting sync for stream"
            );

            let mut sync = stream.sync(&self.fetcher, since);
            let mut pages_since_checkpoint = 0u32;
            let checkpoints_mid_stream =
                descriptor.supports_mid_stream_checkpoints() && self.config.checkpoint_interval > 0;

            loop {
                let records = match sync.next_page().await {
                    Ok(Some(records)) => records,
                    Ok(None) => break,
                    Err(e) => {
                        error!(stream = %name, error = %e, "stream failed");
                        return Err(e.in_stream(name));
                    }
                };

                stats.add_page(records.len());
                for record in records {
                    sink.send(Message::record(name, record))
                        .await
                        .map_err(|e| e.in_stream(name))?;
                }

                pages_since_checkpoint += 1;
                if checkpoints_mid_stream && pages_since_checkpoint >= self.config.checkpoint_interval {
                    if let Some(cursor) = sync.updated_cursor() {
                        state.advance_cursor(name, cursor);
                    }
                    self.checkpoint(name, &state, &mut stats, sink).await?;
                    pages_since_checkpoint = 0;
                }

                if self.cancel.is_cancelled() {
                    if descriptor.supports_mid_stream_checkpoints() {
                        if let Some(cursor) = sync.updated_cursor() {
                            state.advance_cursor(name, cursor);
                        }
                    }
                    return self
                        .finish_cancelled(name, state, stats, start, sink)
                        .await;
                }
            }

            if let Some(cursor) = sync.updated_cursor() {
                state.advance_cursor(name, cursor);
            }
            self.checkpoint(name, &state, &mut stats, sink).await?;
            stats.add_stream();

            info!(
                stream = %name,
                pages = sync.pages(),
                records = sync.records(),
                cursor = ?state.get_cursor(name).map(|c| c.to_string()),
                "Completed sync for stream"
            );
        }

        #[allow(clippy::cast_possible_truncation)]
        stats.set_duration(start.elapsed().as_millis() as u64);

        Ok(SyncOutcome {
            state,
            stats,
            cancelled: false,
        })
    }

    async fn checkpoint<S: MessageSink + ?Sized>(
        &self,
        stream: &str,
        state: &SyncState,
        stats: &mut SyncStats,
        sink: &mut S,
    ) -> Result<()> {
        sink.send(Message::state(state.clone()))
            .await
            .map_err(|e| e.in_stream(stream))?;
        stats.add_checkpoint();
        Ok(())
    }

    async fn finish_cancelled<S: MessageSink + ?Sized>(
        &self,
        stream: &str,
        state: SyncState,
        mut stats: SyncStats,
        start: Instant,
        sink: &mut S,
    ) -> Result<SyncOutcome> {
        warn!(stream = %stream, "sync cancelled, emitting final checkpoint");
        self.checkpoint(stream, &state, &mut stats, sink).await?;

        #[allow(clippy::cast_possible_truncation)]
        stats.set_duration(start.elapsed().as_millis() as u64);

        Ok(SyncOutcome {
            state,
            stats,
            cancelled: true,
        })
    }
}

//! Engine types
//!
//! Message types and configuration for the sync engine.

use crate::state::SyncState;
use crate::types::{JsonValue, Record};
use chrono::{DateTime, Utc};
use serde_json::json;

/// A message emitted during sync
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// One record
    Record {
        /// Stream name
        stream: String,
        /// The record
        data: Record,
        /// When the engine emitted it
        emitted_at: DateTime<Utc>,
    },
    /// Checkpoint: every record emitted before it is covered by these cursors
    State(SyncState),
}

impl Message {
    /// Create a record message stamped now
    pub fn record(stream: impl Into<String>, data: Record) -> Self {
        Self::Record {
            stream: stream.into(),
            data,
            emitted_at: Utc::now(),
        }
    }

    /// Create a state message
    pub fn state(state: SyncState) -> Self {
        Self::State(state)
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State(_))
    }

    /// Stream a record message belongs to
    pub fn stream(&self) -> Option<&str> {
        match self {
            Self::Record { stream, .. } => Some(stream),
            Self::State(_) => None,
        }
    }

    /// Protocol form, one JSON object per message
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Record {
                stream,
                data,
                emitted_at,
            } => json!({
                "type": "RECORD",
                "record": {
                    "stream": stream,
                    "data": data,
                    "emitted_at": emitted_at.timestamp_millis(),
                }
            }),
            Self::State(state) => json!({
                "type": "STATE",
                "state": { "data": state }
            }),
        }
    }
}

/// Configuration for sync operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Pages between mid-stream checkpoints (0 disables them)
    pub checkpoint_interval: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: 10,
        }
    }
}

impl SyncConfig {
    /// Create a new sync config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the mid-stream checkpoint interval
    #[must_use]
    pub fn with_checkpoint_interval(mut self, pages: u32) -> Self {
        self.checkpoint_interval = pages;
        self
    }
}

/// Statistics from a sync operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Total records synced
    pub records_synced: u64,
    /// Total pages fetched
    pub pages_fetched: u64,
    /// Streams run to completion
    pub streams_synced: usize,
    /// State messages emitted
    pub checkpoints: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one page of `records` records
    pub fn add_page(&mut self, records: usize) {
        self.pages_fetched += 1;
        self.records_synced += records as u64;
    }

    /// Add a stream
    pub fn add_stream(&mut self) {
        self.streams_synced += 1;
    }

    /// Add a checkpoint
    pub fn add_checkpoint(&mut self) {
        self.checkpoints += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}

/// Result of a sync run that did not fail
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    /// State after the last checkpoint
    pub state: SyncState,
    /// Counters for the run
    pub stats: SyncStats,
    /// The run stopped early on request
    pub cancelled: bool,
}

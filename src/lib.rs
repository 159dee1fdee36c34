// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # Freshdesk Source
//!
//! Extracts helpdesk entities from the Freshdesk REST API (`/api/v2`) as a
//! sequence of records interleaved with resumable cursor checkpoints.
//!
//! ## Features
//!
//! - **Basic Auth**: API key credentials built once and shared by every request
//! - **Rate Limit Governor**: `Retry-After` aware retries with bounded attempts
//! - **Page Number Pagination**: with page-limit rollover for deep ticket histories
//! - **Incremental Sync**: per-stream `updated_at` cursors that never regress
//! - **Checkpointing**: state messages after each stream and every few pages
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use freshdesk_source::{FreshdeskSource, SourceConfig, Message, SyncState};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> freshdesk_source::Result<()> {
//!     let config = SourceConfig::new("acme.freshdesk.com", "api-key");
//!     let source = FreshdeskSource::new(config)?;
//!
//!     // Check connection
//!     let status = source.check().await;
//!
//!     // Read everything into memory
//!     let mut messages: Vec<Message> = Vec::new();
//!     let outcome = source
//!         .read(SyncState::new(), None, &mut messages, CancellationToken::new())
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     FreshdeskSource                         │
//! │  check() → CheckResult   discover() → Catalog   read()      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                      SyncEngine (streams in order, checkpoints)
//!                              │
//!                      Stream / StreamSync (keys, cursor)
//!                              │
//!                      Pages (page / per_page, rollover)
//!                              │
//!                      RateLimitGovernor (429 / 5xx backoff)
//!                              │
//!                      HttpClient (Basic auth, classification)
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Source configuration
pub mod config;

/// API key credentials
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Page-number pagination
pub mod pagination;

/// Stream descriptors, cursors and the catalog
pub mod stream;

/// State management and checkpointing
pub mod state;

/// Main execution engine
pub mod engine;

/// Check, discover and read
pub mod connector;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::SourceConfig;
pub use connector::{Catalog, CatalogEntry, CheckResult, FreshdeskSource, MessageStream};
pub use engine::{Message, MessageSink, SyncConfig, SyncEngine, SyncOutcome, SyncStats};
pub use error::{Error, ErrorKind, Result};
pub use state::{StateManager, SyncState};
pub use stream::{freshdesk_catalog, Cursor, Stream, StreamDescriptor};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

//! State management module
//!
//! Handles cursor tracking and checkpoint persistence.
//! State is persisted between sync runs to enable incremental syncs.
//!
//! # Overview
//!
//! The state module provides:
//! - `SyncState` - per-stream cursors, merged with `max`
//! - `StateManager` - file-based state persistence with atomic writes

mod manager;
mod types;

pub use manager::StateManager;
pub use types::{StreamState, SyncState};

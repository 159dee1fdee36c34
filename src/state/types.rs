//! State types for tracking sync progress
//!
//! These types are serialized to JSON and persisted between runs.

use crate::stream::Cursor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-stream cursors acknowledged so far
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// Per-stream state
    #[serde(default)]
    pub streams: BTreeMap<String, StreamState>,
}

impl SyncState {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get state for a stream
    pub fn get_stream(&self, stream: &str) -> Option<&StreamState> {
        self.streams.get(stream)
    }

    /// Get cursor for a stream
    pub fn get_cursor(&self, stream: &str) -> Option<Cursor> {
        self.streams.get(stream)?.cursor
    }

    /// Merge `cursor` into the stream's entry, keeping the later value
    ///
    /// Returns `true` if the stored cursor changed.
    pub fn advance_cursor(&mut self, stream: &str, cursor: Cursor) -> bool {
        let entry = self.streams.entry(stream.to_string()).or_default();
        match entry.cursor {
            Some(current) if current >= cursor => false,
            _ => {
                entry.cursor = Some(cursor);
                true
            }
        }
    }

    /// Check if no stream has a cursor yet
    pub fn is_empty(&self) -> bool {
        self.streams.values().all(|s| s.cursor.is_none())
    }
}

/// State for a single stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamState {
    /// Current cursor value (for incremental sync)
    #[serde(default)]
    pub cursor: Option<Cursor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(s: &str) -> Cursor {
        Cursor::parse(s).unwrap()
    }

    #[test]
    fn test_state_default() {
        let state = SyncState::new();
        assert!(state.streams.is_empty());
        assert!(state.is_empty());
    }

    #[test]
    fn test_advance_cursor_never_regresses() {
        let mut state = SyncState::new();
        assert!(state.get_cursor("tickets").is_none());

        assert!(state.advance_cursor("tickets", cursor("2024-02-01T00:00:00Z")));
        assert!(!state.advance_cursor("tickets", cursor("2024-01-01T00:00:00Z")));
        assert!(!state.advance_cursor("tickets", cursor("2024-02-01T00:00:00Z")));
        assert_eq!(
            state.get_cursor("tickets"),
            Some(cursor("2024-02-01T00:00:00Z"))
        );

        assert!(state.advance_cursor("tickets", cursor("2024-03-01T00:00:00Z")));
        assert_eq!(
            state.get_cursor("tickets"),
            Some(cursor("2024-03-01T00:00:00Z"))
        );
    }

    #[test]
    fn test_state_serialization_shape() {
        let mut state = SyncState::new();
        state.advance_cursor("tickets", cursor("2024-01-01T00:00:00Z"));

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"streams": {"tickets": {"cursor": "2024-01-01T00:00:00Z"}}})
        );

        let restored: SyncState = serde_json::from_value(json).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_state_tolerates_missing_fields() {
        let state: SyncState = serde_json::from_str("{}").unwrap();
        assert!(state.is_empty());

        let state: SyncState = serde_json::from_str(r#"{"streams":{"contacts":{}}}"#).unwrap();
        assert!(state.get_cursor("contacts").is_none());
    }
}

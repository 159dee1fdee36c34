//! Pagination types
//!
//! Defines the page value handed to streams and the bookkeeping the
//! paginator keeps between requests.

use crate::error::{Error, Result};
use crate::types::JsonValue;

/// Query parameter carrying the 1-based page number
pub const PAGE_PARAM: &str = "page";

/// Query parameter carrying the page size
pub const PER_PAGE_PARAM: &str = "per_page";

/// One decoded response
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Page number this response answered
    pub number: u32,
    /// Raw records in API order
    pub records: Vec<JsonValue>,
    /// Whether another request will follow
    pub has_more: bool,
}

impl Page {
    /// Number of records on the page
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the page carries no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Restart paging from page 1 once `page_limit` is reached
///
/// Only valid for endpoints sorted ascending by `cursor_field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rollover {
    /// Highest page number the API serves
    pub page_limit: u32,
    /// Record field holding the sort key
    pub cursor_field: String,
    /// Query parameter taking the lower bound
    pub cursor_filter: String,
    /// Fields identifying a record, for dropping boundary repeats
    pub key_fields: Vec<String>,
}

/// Tracks pagination state during iteration
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    /// Next page number to request
    pub page: u32,
    /// Successful requests so far
    pub pages_fetched: u32,
    /// Total records fetched so far
    pub total_fetched: u64,
    /// Number of rollovers performed
    pub rollovers: u32,
    /// Is pagination complete?
    pub done: bool,
}

impl PaginationState {
    /// Create state with a starting page
    pub fn with_page(page: u32) -> Self {
        Self {
            page,
            ..Default::default()
        }
    }

    /// Mark pagination as complete
    pub fn mark_done(&mut self) {
        self.done = true;
    }

    /// Increment page number
    pub fn next_page(&mut self) {
        self.page += 1;
    }

    /// Record a successful fetch
    pub fn add_fetched(&mut self, count: u64) {
        self.pages_fetched += 1;
        self.total_fetched += count;
    }

    /// Go back to the first page after moving the filter
    pub fn roll_over(&mut self) {
        self.page = 1;
        self.rollovers += 1;
    }
}

/// Pull the record array out of a response body
///
/// Freshdesk list endpoints return a bare array; `records_field` selects a
/// nested array for endpoints that wrap it.
pub(crate) fn extract_records(
    body: JsonValue,
    records_field: Option<&str>,
    path: &str,
) -> Result<Vec<JsonValue>> {
    let target = match records_field {
        Some(field) => match body {
            JsonValue::Object(mut map) => map.remove(field).unwrap_or(JsonValue::Null),
            _ => JsonValue::Null,
        },
        None => body,
    };

    match target {
        JsonValue::Array(records) => Ok(records),
        other => Err(Error::decode(format!(
            "'{path}' returned {} where an array of records was expected",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

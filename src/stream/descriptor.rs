//! Stream descriptors
//!
//! Every Freshdesk entity is described as data; one generic engine
//! ([`super::Stream`]) interprets the descriptor.

use crate::error::{Error, Result};
use crate::pagination::Rollover;
use crate::types::{QueryParams, SyncMode};

/// Placeholder substituted with the parent key in substream paths
pub const PARENT_ID: &str = "{parent_id}";

/// Default Freshdesk page size
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Static description of one logical entity
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    /// Stream name as exposed in the catalog
    pub name: String,
    /// Endpoint path relative to the API root, may contain `{parent_id}`
    pub path: String,
    /// Fields identifying a record
    pub primary_key: Vec<String>,
    /// Timestamp field driving incremental sync (absent ⇒ full refresh)
    pub cursor_field: Option<String>,
    /// Query parameter taking the incremental lower bound
    pub cursor_filter: Option<String>,
    /// Records requested per page
    pub page_size: u32,
    /// Field holding the record array, when the body is not a bare array
    pub records_field: Option<String>,
    /// Fixed query parameters sent with every request
    pub extra_params: QueryParams,
    /// Records come back ascending by `cursor_field`
    pub sorted_by_cursor: bool,
    /// Highest page the endpoint serves
    pub page_limit: Option<u32>,
    /// Parent endpoint for substreams
    pub parent: Option<ParentStream>,
}

/// Parent of a substream
#[derive(Debug, Clone, PartialEq)]
pub struct ParentStream {
    /// Descriptor of the parent endpoint
    pub descriptor: Box<StreamDescriptor>,
    /// Parent record field substituted into the child path
    pub key: String,
}

impl StreamDescriptor {
    /// Describe a full-refresh stream keyed by `id`
    pub fn full_refresh(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            primary_key: vec!["id".to_string()],
            cursor_field: None,
            cursor_filter: None,
            page_size: DEFAULT_PAGE_SIZE,
            records_field: None,
            extra_params: QueryParams::new(),
            sorted_by_cursor: false,
            page_limit: None,
            parent: None,
        }
    }

    /// Make the stream incremental on `field`, filtered by `filter`
    #[must_use]
    pub fn incremental(mut self, field: impl Into<String>, filter: impl Into<String>) -> Self {
        self.cursor_field = Some(field.into());
        self.cursor_filter = Some(filter.into());
        self
    }

    /// Declare ascending cursor order
    #[must_use]
    pub fn sorted(mut self) -> Self {
        self.sorted_by_cursor = true;
        self
    }

    /// Set the highest page the endpoint serves
    #[must_use]
    pub fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = Some(limit);
        self
    }

    /// Add a fixed query parameter
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_params.insert(key.into(), value.into());
        self
    }

    /// Set the page size
    #[must_use]
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    /// Set the primary key fields
    #[must_use]
    pub fn with_primary_key(mut self, fields: &[&str]) -> Self {
        self.primary_key = fields.iter().map(|f| (*f).to_string()).collect();
        self
    }

    /// Read records from a nested array field
    #[must_use]
    pub fn with_records_field(mut self, field: impl Into<String>) -> Self {
        self.records_field = Some(field.into());
        self
    }

    /// Make this a substream of `parent`, keyed by the parent's `key` field
    #[must_use]
    pub fn with_parent(mut self, parent: StreamDescriptor, key: impl Into<String>) -> Self {
        self.parent = Some(ParentStream {
            descriptor: Box::new(parent),
            key: key.into(),
        });
        self
    }

    /// Sync mode implied by the cursor field
    pub fn sync_mode(&self) -> SyncMode {
        if self.cursor_field.is_some() {
            SyncMode::Incremental
        } else {
            SyncMode::FullRefresh
        }
    }

    /// Check if this stream tracks a cursor
    pub fn is_incremental(&self) -> bool {
        self.sync_mode() == SyncMode::Incremental
    }

    /// Check if cursor checkpoints may be taken before the stream completes
    pub fn supports_mid_stream_checkpoints(&self) -> bool {
        self.is_incremental() && self.sorted_by_cursor && self.parent.is_none()
    }

    /// Sync modes advertised in the catalog
    pub fn supported_sync_modes(&self) -> Vec<SyncMode> {
        match self.sync_mode() {
            SyncMode::FullRefresh => vec![SyncMode::FullRefresh],
            SyncMode::Incremental => vec![SyncMode::FullRefresh, SyncMode::Incremental],
        }
    }

    /// Rollover settings for the paginator, if the endpoint needs them
    pub fn rollover(&self) -> Option<Rollover> {
        match (self.page_limit, &self.cursor_field, &self.cursor_filter) {
            (Some(page_limit), Some(field), Some(filter)) if self.sorted_by_cursor => {
                Some(Rollover {
                    page_limit,
                    cursor_field: field.clone(),
                    cursor_filter: filter.clone(),
                    key_fields: self.primary_key.clone(),
                })
            }
            _ => None,
        }
    }

    /// Check descriptor consistency
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("stream name must not be empty"));
        }
        if self.primary_key.is_empty() {
            return Err(Error::config(format!(
                "stream '{}' has no primary key",
                self.name
            )));
        }
        if self.page_size == 0 {
            return Err(Error::config(format!(
                "stream '{}' has a zero page size",
                self.name
            )));
        }
        if self.cursor_field.is_some() != self.cursor_filter.is_some() {
            return Err(Error::config(format!(
                "stream '{}' must set cursor field and cursor filter together",
                self.name
            )));
        }
        if self.page_limit.is_some() && self.rollover().is_none() {
            return Err(Error::config(format!(
                "stream '{}' has a page limit but is not sorted by an incremental cursor",
                self.name
            )));
        }

        match &self.parent {
            Some(parent) => {
                if !self.path.contains(PARENT_ID) {
                    return Err(Error::config(format!(
                        "substream '{}' path must contain {PARENT_ID}",
                        self.name
                    )));
                }
                parent.descriptor.validate()
            }
            None if self.path.contains(PARENT_ID) => Err(Error::config(format!(
                "stream '{}' path uses {PARENT_ID} without a parent",
                self.name
            ))),
            None => Ok(()),
        }
    }
}

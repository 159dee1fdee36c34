//! Stream module
//!
//! Entities are [`StreamDescriptor`] values; [`Stream`] is the single
//! engine that pages through any of them.
//!
//! # Overview
//!
//! - `StreamDescriptor` - path, primary key, cursor settings, parent link
//! - `Stream` / `StreamSync` - one sync pass producing validated records page by page
//! - `Cursor` - ordered timestamp watermark for incremental streams
//! - `freshdesk_catalog()` - the Freshdesk entity set, in sync order

mod catalog;
mod cursor;
mod descriptor;
mod sync;

pub use catalog::{freshdesk_catalog, tickets, TICKETS_PAGE_LIMIT, UPDATED_AT};
pub use cursor::Cursor;
pub use descriptor::{ParentStream, StreamDescriptor, DEFAULT_PAGE_SIZE, PARENT_ID};
pub use sync::{Stream, StreamSync, SyncPhase};

#[cfg(test)]
mod tests;

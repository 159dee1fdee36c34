//! Freshdesk stream catalog

use super::descriptor::{StreamDescriptor, PARENT_ID};

/// Cursor field shared by every incremental Freshdesk stream
pub const UPDATED_AT: &str = "updated_at";

/// `/tickets` refuses page numbers above this
pub const TICKETS_PAGE_LIMIT: u32 = 300;

/// The tickets endpoint, sorted ascending so it can roll over and checkpoint
pub fn tickets() -> StreamDescriptor {
    StreamDescriptor::full_refresh("tickets", "tickets")
        .incremental(UPDATED_AT, "updated_since")
        .with_param("order_by", UPDATED_AT)
        .with_param("order_type", "asc")
        .with_param("include", "description")
        .sorted()
        .with_page_limit(TICKETS_PAGE_LIMIT)
}

/// All streams, in sync order
pub fn freshdesk_catalog() -> Vec<StreamDescriptor> {
    vec![
        StreamDescriptor::full_refresh("agents", "agents"),
        StreamDescriptor::full_refresh("companies", "companies"),
        StreamDescriptor::full_refresh("contacts", "contacts")
            .incremental(UPDATED_AT, "_updated_since"),
        StreamDescriptor::full_refresh("conversations", format!("tickets/{PARENT_ID}/conversations"))
            .with_parent(tickets(), "id"),
        StreamDescriptor::full_refresh("groups", "groups"),
        StreamDescriptor::full_refresh("roles", "roles"),
        StreamDescriptor::full_refresh("skills", "skills"),
        StreamDescriptor::full_refresh("time_entries", "time_entries"),
        tickets(),
        StreamDescriptor::full_refresh("satisfaction_ratings", "surveys/satisfaction_ratings")
            .incremental(UPDATED_AT, "created_since"),
    ]
}

//! Tests for the stream module

use super::*;
use crate::error::{Error, ErrorKind, Result};
use crate::http::Fetch;
use crate::types::{JsonValue, NotFoundPolicy, QueryParams, SyncMode};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;

/// Serves queued responses per path and records every request
#[derive(Default)]
struct Routes {
    responses: Mutex<HashMap<String, Vec<Result<JsonValue>>>>,
    requests: Mutex<Vec<(String, QueryParams)>>,
}

impl Routes {
    fn on(self, path: &str, body: Result<JsonValue>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push(body);
        self
    }

    fn requests(&self) -> Vec<(String, QueryParams)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetch for Routes {
    async fn fetch(&self, path: &str, query: &QueryParams) -> Result<JsonValue> {
        self.requests
            .lock()
            .unwrap()
            .push((path.to_string(), query.clone()));
        let mut responses = self.responses.lock().unwrap();
        match responses.get_mut(path) {
            Some(queue) if !queue.is_empty() => queue.remove(0),
            _ => Ok(json!([])),
        }
    }
}

fn cursor(s: &str) -> Cursor {
    Cursor::parse(s).unwrap()
}

fn contacts() -> StreamDescriptor {
    StreamDescriptor::full_refresh("contacts", "contacts")
        .incremental(UPDATED_AT, "_updated_since")
        .with_page_size(2)
}

async fn drain<F: Fetch + ?Sized>(sync: &mut StreamSync<'_, F>) -> Result<Vec<u64>> {
    let mut ids = Vec::new();
    while let Some(records) = sync.next_page().await? {
        ids.extend(records.iter().map(|r| r["id"].as_u64().unwrap()));
    }
    Ok(ids)
}

// ============================================================================
// Catalog Tests
// ============================================================================

#[test]
fn test_catalog_order_and_modes() {
    let catalog = freshdesk_catalog();
    let names: Vec<&str> = catalog.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "agents",
            "companies",
            "contacts",
            "conversations",
            "groups",
            "roles",
            "skills",
            "time_entries",
            "tickets",
            "satisfaction_ratings",
        ]
    );

    let incremental: Vec<&str> = catalog
        .iter()
        .filter(|d| d.sync_mode() == SyncMode::Incremental)
        .map(|d| d.name.as_str())
        .collect();
    assert_eq!(
        incremental,
        vec!["contacts", "tickets", "satisfaction_ratings"]
    );

    for descriptor in &catalog {
        descriptor.validate().unwrap();
        assert_eq!(descriptor.primary_key, vec!["id".to_string()]);
        assert_eq!(descriptor.page_size, DEFAULT_PAGE_SIZE);
    }
}

#[test]
fn test_tickets_descriptor() {
    let tickets = tickets();
    assert_eq!(tickets.cursor_filter.as_deref(), Some("updated_since"));
    assert_eq!(
        tickets.extra_params.get("order_type"),
        Some(&"asc".to_string())
    );
    assert!(tickets.supports_mid_stream_checkpoints());

    let rollover = tickets.rollover().unwrap();
    assert_eq!(rollover.page_limit, TICKETS_PAGE_LIMIT);
    assert_eq!(rollover.cursor_filter, "updated_since");
}

#[test]
fn test_conversations_is_substream_of_tickets() {
    let catalog = freshdesk_catalog();
    let conversations = catalog.iter().find(|d| d.name == "conversations").unwrap();
    let parent = conversations.parent.as_ref().unwrap();

    assert_eq!(parent.descriptor.name, "tickets");
    assert_eq!(parent.key, "id");
    assert_eq!(conversations.path, "tickets/{parent_id}/conversations");
    assert!(!conversations.supports_mid_stream_checkpoints());
}

#[test]
fn test_descriptor_validation_rejects_inconsistencies() {
    let no_key = StreamDescriptor::full_refresh("agents", "agents").with_primary_key(&[]);
    assert_eq!(no_key.validate().unwrap_err().kind(), ErrorKind::Config);

    let unsorted_limit = StreamDescriptor::full_refresh("contacts", "contacts")
        .incremental(UPDATED_AT, "_updated_since")
        .with_page_limit(10);
    assert!(unsorted_limit.validate().is_err());

    let orphan = StreamDescriptor::full_refresh("notes", "tickets/{parent_id}/notes");
    assert!(orphan.validate().is_err());

    let no_placeholder = StreamDescriptor::full_refresh("notes", "notes")
        .with_parent(tickets(), "id");
    assert!(no_placeholder.validate().is_err());
}

// ============================================================================
// Sync Tests
// ============================================================================

#[tokio::test]
async fn test_full_refresh_ignores_since() {
    let routes = Routes::default().on("agents", Ok(json!([{"id": 1}, {"id": 2}])));
    let stream = Stream::new(
        StreamDescriptor::full_refresh("agents", "agents"),
        Some(cursor("2024-01-01T00:00:00Z")),
    );

    let mut sync = stream.sync(&routes, Some(cursor("2024-06-01T00:00:00Z")));
    assert_eq!(drain(&mut sync).await.unwrap(), vec![1, 2]);
    assert_eq!(sync.updated_cursor(), None);

    let (_, query) = &routes.requests()[0];
    assert_eq!(query.len(), 2, "only page and per_page: {query:?}");
}

#[tokio::test]
async fn test_incremental_filters_by_since_then_start_date() {
    let routes = Routes::default();
    let stream = Stream::new(contacts(), Some(cursor("2020-01-01T00:00:00Z")));

    let mut sync = stream.sync(&routes, Some(cursor("2024-03-01T10:00:00Z")));
    drain(&mut sync).await.unwrap();
    let mut sync = stream.sync(&routes, None);
    drain(&mut sync).await.unwrap();

    let requests = routes.requests();
    assert_eq!(
        requests[0].1.get("_updated_since"),
        Some(&"2024-03-01T10:00:00Z".to_string())
    );
    assert_eq!(
        requests[1].1.get("_updated_since"),
        Some(&"2020-01-01T00:00:00Z".to_string())
    );
}

#[tokio::test]
async fn test_incremental_without_bound_sends_no_filter() {
    let routes = Routes::default();
    let stream = Stream::new(contacts(), None);

    let mut sync = stream.sync(&routes, None);
    drain(&mut sync).await.unwrap();

    assert!(routes.requests()[0].1.get("_updated_since").is_none());
    assert_eq!(sync.updated_cursor(), None);
}

#[tokio::test]
async fn test_updated_cursor_tracks_maximum() {
    let routes = Routes::default()
        .on(
            "contacts",
            Ok(json!([
                {"id": 1, "updated_at": "2024-02-03T00:00:00Z"},
                {"id": 2, "updated_at": "2024-02-01T00:00:00Z"}
            ])),
        )
        .on(
            "contacts",
            Ok(json!([{"id": 3, "updated_at": "2024-02-02T00:00:00Z"}])),
        );
    let stream = Stream::new(contacts(), None);

    let mut sync = stream.sync(&routes, Some(cursor("2024-01-01T00:00:00Z")));
    assert_eq!(drain(&mut sync).await.unwrap(), vec![1, 2, 3]);
    assert_eq!(sync.updated_cursor(), Some(cursor("2024-02-03T00:00:00Z")));
}

#[tokio::test]
async fn test_updated_cursor_never_regresses() {
    let routes = Routes::default().on(
        "contacts",
        Ok(json!([{"id": 1, "updated_at": "2023-05-01T00:00:00Z"}])),
    );
    let stream = Stream::new(contacts(), None);
    let since = cursor("2024-01-01T00:00:00Z");

    let mut sync = stream.sync(&routes, Some(since));
    drain(&mut sync).await.unwrap();
    assert_eq!(sync.updated_cursor(), Some(since));
}

#[tokio::test]
async fn test_unusable_cursor_values_do_not_move_cursor() {
    let routes = Routes::default().on(
        "contacts",
        Ok(json!([
            {"id": 1, "updated_at": null},
            {"id": 2, "updated_at": "not a date"}
        ])),
    );
    let stream = Stream::new(contacts(), None);

    let mut sync = stream.sync(&routes, None);
    assert_eq!(drain(&mut sync).await.unwrap(), vec![1, 2]);
    assert_eq!(sync.updated_cursor(), None);
}

#[tokio::test]
async fn test_missing_primary_key_is_fatal() {
    let routes = Routes::default().on(
        "contacts",
        Ok(json!([{"id": 1}, {"name": "no id"}])),
    );
    let stream = Stream::new(contacts(), None);

    let mut sync = stream.sync(&routes, None);
    let err = sync.next_page().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert_eq!(sync.phase(), SyncPhase::Failed);
    assert!(sync.next_page().await.unwrap().is_none());
}

#[tokio::test]
async fn test_empty_string_primary_key_is_fatal() {
    let routes = Routes::default().on("agents", Ok(json!([{"id": ""}])));
    let stream = Stream::new(StreamDescriptor::full_refresh("agents", "agents"), None);

    let mut sync = stream.sync(&routes, None);
    assert_eq!(
        sync.next_page().await.unwrap_err().kind(),
        ErrorKind::Decode
    );
}

#[tokio::test]
async fn test_phase_transitions() {
    let routes = Routes::default()
        .on("contacts", Ok(json!([{"id": 1}, {"id": 2}])))
        .on("contacts", Ok(json!([{"id": 3}])));
    let stream = Stream::new(contacts(), None);

    let mut sync = stream.sync(&routes, None);
    assert_eq!(sync.phase(), SyncPhase::NotStarted);

    sync.next_page().await.unwrap();
    assert_eq!(sync.phase(), SyncPhase::Paging { page: 1 });
    sync.next_page().await.unwrap();
    assert_eq!(sync.phase(), SyncPhase::Paging { page: 2 });

    assert!(sync.next_page().await.unwrap().is_none());
    assert_eq!(sync.phase(), SyncPhase::Completed);
    assert_eq!(sync.records(), 3);
    assert_eq!(sync.pages(), 2);
}

// ============================================================================
// Not Found Policy Tests
// ============================================================================

#[tokio::test]
async fn test_not_found_on_first_page_is_skipped() {
    let routes = Routes::default().on("skills", Err(Error::not_found("skills")));
    let stream = Stream::new(StreamDescriptor::full_refresh("skills", "skills"), None);

    let mut sync = stream.sync(&routes, None);
    assert!(sync.next_page().await.unwrap().is_none());
    assert_eq!(sync.phase(), SyncPhase::Completed);
}

#[tokio::test]
async fn test_not_found_fails_under_fail_policy() {
    let routes = Routes::default().on("skills", Err(Error::not_found("skills")));
    let stream = Stream::new(StreamDescriptor::full_refresh("skills", "skills"), None)
        .with_not_found_policy(NotFoundPolicy::Fail);

    let mut sync = stream.sync(&routes, None);
    assert_eq!(
        sync.next_page().await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(sync.phase(), SyncPhase::Failed);
}

#[tokio::test]
async fn test_not_found_on_later_page_is_fatal() {
    let routes = Routes::default()
        .on("contacts", Ok(json!([{"id": 1}, {"id": 2}])))
        .on("contacts", Err(Error::not_found("contacts")));
    let stream = Stream::new(contacts(), None);

    let mut sync = stream.sync(&routes, None);
    assert!(sync.next_page().await.unwrap().is_some());
    assert_eq!(
        sync.next_page().await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

// ============================================================================
// Substream Tests
// ============================================================================

#[tokio::test]
async fn test_substream_pages_each_parent() {
    let routes = Routes::default()
        .on("tickets", Ok(json!([{"id": 7}, {"id": 8}, {"id": 9}])))
        .on("tickets/7/conversations", Ok(json!([{"id": 70}, {"id": 71}])))
        .on("tickets/8/conversations", Err(Error::not_found("tickets/8/conversations")))
        .on("tickets/9/conversations", Ok(json!([{"id": 90}])));
    let catalog = freshdesk_catalog();
    let conversations = catalog
        .into_iter()
        .find(|d| d.name == "conversations")
        .unwrap();
    let stream = Stream::new(conversations, Some(cursor("2024-01-01T00:00:00Z")));

    let mut sync = stream.sync(&routes, None);
    assert_eq!(drain(&mut sync).await.unwrap(), vec![70, 71, 90]);
    assert_eq!(sync.updated_cursor(), None);

    let requests = routes.requests();
    let (path, query) = &requests[0];
    assert_eq!(path, "tickets");
    assert_eq!(
        query.get("updated_since"),
        Some(&"2024-01-01T00:00:00Z".to_string())
    );
    let paths: Vec<&str> = requests.iter().map(|(p, _)| p.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "tickets",
            "tickets/7/conversations",
            "tickets/8/conversations",
            "tickets/9/conversations",
        ]
    );
}

#[tokio::test]
async fn test_substream_parent_without_key_is_fatal() {
    let routes = Routes::default().on("tickets", Ok(json!([{"subject": "no id"}])));
    let descriptor = StreamDescriptor::full_refresh("conversations", "tickets/{parent_id}/conversations")
        .with_parent(tickets(), "id");
    let stream = Stream::new(descriptor, None);

    let mut sync = stream.sync(&routes, None);
    assert_eq!(
        sync.next_page().await.unwrap_err().kind(),
        ErrorKind::Decode
    );
}

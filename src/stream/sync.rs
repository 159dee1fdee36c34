//! Generic stream engine
//!
//! A [`Stream`] interprets a [`StreamDescriptor`]: it builds the filtered
//! query, drives the paginator, validates primary keys and tracks the
//! running cursor maximum.

use super::cursor::Cursor;
use super::descriptor::{StreamDescriptor, PARENT_ID};
use crate::error::{Error, ErrorKind, Result};
use crate::http::Fetch;
use crate::pagination::Pages;
use crate::types::{JsonValue, NotFoundPolicy, Record};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Where a [`StreamSync`] is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No page requested yet
    NotStarted,
    /// `page` pages handed out so far
    Paging { page: u32 },
    /// Every page consumed
    Completed,
    /// A fatal error ended the sync
    Failed,
}

/// One entity stream bound to its runtime settings
#[derive(Debug, Clone)]
pub struct Stream {
    descriptor: StreamDescriptor,
    start_date: Option<Cursor>,
    not_found: NotFoundPolicy,
}

impl Stream {
    /// Bind a descriptor to the configured start date
    pub fn new(descriptor: StreamDescriptor, start_date: Option<Cursor>) -> Self {
        Self {
            descriptor,
            start_date,
            not_found: NotFoundPolicy::default(),
        }
    }

    /// Set the 404 policy
    #[must_use]
    pub fn with_not_found_policy(mut self, policy: NotFoundPolicy) -> Self {
        self.not_found = policy;
        self
    }

    /// Stream name
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// The underlying descriptor
    pub fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    /// Start a sync from `since` (ignored for full-refresh streams)
    pub fn sync<'a, F: Fetch + ?Sized>(
        &'a self,
        fetcher: &'a F,
        since: Option<Cursor>,
    ) -> StreamSync<'a, F> {
        let since = if self.descriptor.is_incremental() {
            since
        } else {
            None
        };

        let source = match &self.descriptor.parent {
            Some(parent) => Source::Substream {
                parents: self.pages(fetcher, &parent.descriptor, self.start_date),
                parent_key: &parent.key,
                pending: VecDeque::new(),
                child: None,
            },
            None => Source::Direct(self.pages(
                fetcher,
                &self.descriptor,
                since.or(self.start_date),
            )),
        };

        StreamSync {
            stream: self,
            fetcher,
            since,
            source,
            phase: SyncPhase::NotStarted,
            running_max: None,
            pages: 0,
            records: 0,
        }
    }

    fn pages<'a, F: Fetch + ?Sized>(
        &self,
        fetcher: &'a F,
        descriptor: &StreamDescriptor,
        lower_bound: Option<Cursor>,
    ) -> Pages<'a, F> {
        let mut query = descriptor.extra_params.clone();
        if let (Some(filter), Some(bound)) = (&descriptor.cursor_filter, lower_bound) {
            query.insert(filter.clone(), bound.to_string());
        }

        Pages::new(fetcher, descriptor.path.clone(), query, descriptor.page_size)
            .with_records_field(descriptor.records_field.clone())
            .with_rollover(descriptor.rollover())
    }

    fn skips(&self, err: &Error, first_page: bool) -> bool {
        first_page && err.kind() == ErrorKind::NotFound && self.not_found == NotFoundPolicy::Skip
    }
}

enum Source<'a, F: ?Sized> {
    Direct(Pages<'a, F>),
    Substream {
        parents: Pages<'a, F>,
        parent_key: &'a str,
        pending: VecDeque<String>,
        child: Option<Pages<'a, F>>,
    },
}

/// In-flight sync of one stream
pub struct StreamSync<'a, F: ?Sized> {
    stream: &'a Stream,
    fetcher: &'a F,
    since: Option<Cursor>,
    source: Source<'a, F>,
    phase: SyncPhase,
    running_max: Option<Cursor>,
    pages: u32,
    records: u64,
}

impl<'a, F: Fetch + ?Sized> StreamSync<'a, F> {
    /// Next page of validated records, `None` once the stream is drained
    pub async fn next_page(&mut self) -> Result<Option<Vec<Record>>> {
        if matches!(self.phase, SyncPhase::Completed | SyncPhase::Failed) {
            return Ok(None);
        }

        match self.fetch_next().await {
            Ok(Some(raw)) => match self.accept(raw) {
                Ok(records) => {
                    self.pages += 1;
                    self.phase = SyncPhase::Paging { page: self.pages };
                    Ok(Some(records))
                }
                Err(e) => {
                    self.phase = SyncPhase::Failed;
                    Err(e)
                }
            },
            Ok(None) => {
                self.phase = SyncPhase::Completed;
                debug!(
                    stream = %self.stream.name(),
                    pages = self.pages,
                    records = self.records,
                    "stream drained"
                );
                Ok(None)
            }
            Err(e) => {
                self.phase = SyncPhase::Failed;
                Err(e)
            }
        }
    }

    async fn fetch_next(&mut self) -> Result<Option<Vec<JsonValue>>> {
        let stream = self.stream;

        match &mut self.source {
            Source::Direct(pages) => {
                let first = pages.is_first();
                match pages.next().await {
                    Ok(page) => Ok(page.map(|p| p.records)),
                    Err(e) if stream.skips(&e, first) => {
                        warn!(
                            stream = %stream.name(),
                            path = %pages.path(),
                            "endpoint not found, treating stream as empty"
                        );
                        Ok(None)
                    }
                    Err(e) => Err(e),
                }
            }
            Source::Substream {
                parents,
                parent_key,
                pending,
                child,
            } => loop {
                if let Some(pages) = child {
                    let first = pages.is_first();
                    match pages.next().await {
                        Ok(Some(page)) => return Ok(Some(page.records)),
                        Ok(None) => *child = None,
                        Err(e) if stream.skips(&e, first) => {
                            warn!(
                                stream = %stream.name(),
                                path = %pages.path(),
                                "parent record vanished, skipping"
                            );
                            *child = None;
                        }
                        Err(e) => return Err(e),
                    }
                    continue;
                }

                if let Some(parent_id) = pending.pop_front() {
                    let descriptor = &stream.descriptor;
                    let path = descriptor.path.replace(PARENT_ID, &parent_id);
                    *child = Some(
                        Pages::new(
                            self.fetcher,
                            path,
                            descriptor.extra_params.clone(),
                            descriptor.page_size,
                        )
                        .with_records_field(descriptor.records_field.clone()),
                    );
                    continue;
                }

                let first = parents.is_first();
                match parents.next().await {
                    Ok(Some(page)) => {
                        for record in &page.records {
                            pending.push_back(parent_id(record, *parent_key, parents.path())?);
                        }
                    }
                    Ok(None) => return Ok(None),
                    Err(e) if stream.skips(&e, first) => {
                        warn!(
                            stream = %stream.name(),
                            path = %parents.path(),
                            "parent endpoint not found, treating stream as empty"
                        );
                        return Ok(None);
                    }
                    Err(e) => return Err(e),
                }
            },
        }
    }

    /// Validate keys and fold cursor values into the running maximum
    fn accept(&mut self, raw: Vec<JsonValue>) -> Result<Vec<Record>> {
        let descriptor = &self.stream.descriptor;
        let mut records = Vec::with_capacity(raw.len());

        for value in raw {
            let JsonValue::Object(record) = value else {
                return Err(Error::decode(format!(
                    "stream '{}' returned a non-object record",
                    descriptor.name
                )));
            };

            for field in &descriptor.primary_key {
                if !has_key_value(&record, field) {
                    return Err(Error::decode(format!(
                        "stream '{}' returned a record without primary key '{field}'",
                        descriptor.name
                    )));
                }
            }

            if let Some(field) = &descriptor.cursor_field {
                match record.get(field).and_then(Cursor::from_json) {
                    Some(cursor) => {
                        self.running_max = Cursor::max_of(self.running_max, Some(cursor));
                    }
                    None => warn!(
                        stream = %descriptor.name,
                        field = %field,
                        value = ?record.get(field),
                        "record has no usable cursor value"
                    ),
                }
            }

            records.push(record);
        }

        self.records += records.len() as u64;
        Ok(records)
    }

    /// Cursor to persist: the later of `since` and the maximum seen
    ///
    /// Always `None` for full-refresh streams.
    pub fn updated_cursor(&self) -> Option<Cursor> {
        if !self.stream.descriptor.is_incremental() {
            return None;
        }
        Cursor::max_of(self.since, self.running_max)
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// The stream being synced
    pub fn stream(&self) -> &Stream {
        self.stream
    }

    /// Pages handed out so far
    pub fn pages(&self) -> u32 {
        self.pages
    }

    /// Records handed out so far
    pub fn records(&self) -> u64 {
        self.records
    }
}

fn has_key_value(record: &Record, field: &str) -> bool {
    match record.get(field) {
        None | Some(JsonValue::Null) => false,
        Some(JsonValue::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn parent_id(record: &JsonValue, key: &str, path: &str) -> Result<String> {
    match record.get(key) {
        Some(JsonValue::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(JsonValue::Number(n)) => Ok(n.to_string()),
        _ => Err(Error::decode(format!(
            "'{path}' returned a parent record without '{key}'"
        ))),
    }
}

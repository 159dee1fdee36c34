//! Page-number paginator

use super::types::{extract_records, Page, PaginationState, Rollover, PAGE_PARAM, PER_PAGE_PARAM};
use crate::error::{Error, Result};
use crate::http::Fetch;
use crate::types::{JsonValue, QueryParams};
use std::collections::HashSet;
use tracing::{debug, info};

/// Keys of a run of records sharing one cursor value
#[derive(Debug, Clone)]
struct Boundary {
    cursor: JsonValue,
    keys: HashSet<String>,
}

/// Finite sequence of pages for one endpoint
///
/// Each call to [`Pages::next`] issues exactly one request. Once the last
/// page has been returned, or any request failed, the sequence is exhausted
/// and `next` keeps returning `Ok(None)`.
pub struct Pages<'a, F: ?Sized> {
    fetcher: &'a F,
    path: String,
    query: QueryParams,
    page_size: u32,
    records_field: Option<String>,
    rollover: Option<Rollover>,
    // trailing run of emitted records at the highest cursor seen
    tail: Option<Boundary>,
    // run a rollover restarted from; cleared once the cursor moves past it
    boundary: Option<Boundary>,
    state: PaginationState,
}

impl<'a, F: Fetch + ?Sized> Pages<'a, F> {
    /// Page through `path`, sending `query` with every request
    pub fn new(fetcher: &'a F, path: impl Into<String>, query: QueryParams, page_size: u32) -> Self {
        Self {
            fetcher,
            path: path.into(),
            query,
            page_size: page_size.max(1),
            records_field: None,
            rollover: None,
            tail: None,
            boundary: None,
            state: PaginationState::with_page(1),
        }
    }

    /// Read records from a nested field instead of the bare body
    #[must_use]
    pub fn with_records_field(mut self, field: Option<String>) -> Self {
        self.records_field = field;
        self
    }

    /// Enable page-limit rollover
    #[must_use]
    pub fn with_rollover(mut self, rollover: Option<Rollover>) -> Self {
        self.rollover = rollover;
        self
    }

    /// Endpoint being paged
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current pagination bookkeeping
    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    /// Check if no request has succeeded yet
    pub fn is_first(&self) -> bool {
        self.state.pages_fetched == 0
    }

    /// Check if the sequence has ended
    pub fn is_exhausted(&self) -> bool {
        self.state.done
    }

    /// Fetch the next page
    pub async fn next(&mut self) -> Result<Option<Page>> {
        if self.state.done {
            return Ok(None);
        }

        match self.fetch_page().await {
            Ok(page) => {
                if page.is_none() || page.as_ref().is_some_and(|p| !p.has_more) {
                    self.state.mark_done();
                }
                Ok(page)
            }
            Err(e) => {
                self.state.mark_done();
                Err(e)
            }
        }
    }

    async fn fetch_page(&mut self) -> Result<Option<Page>> {
        let number = self.state.page;
        let mut query = self.query.clone();
        query.insert(PAGE_PARAM.to_string(), number.to_string());
        query.insert(PER_PAGE_PARAM.to_string(), self.page_size.to_string());

        let body = self.fetcher.fetch(&self.path, &query).await?;
        let mut records = extract_records(body, self.records_field.as_deref(), &self.path)?;
        let fetched = records.len();
        self.state.add_fetched(fetched as u64);

        debug!(path = %self.path, page = number, records = fetched, "fetched page");

        if fetched == 0 {
            return Ok(None);
        }

        if let Some(rollover) = self.rollover.clone() {
            self.skip_boundary_repeats(&mut records, &rollover);
            self.track_tail(&records, &rollover);
        }

        let has_more = if fetched < self.page_size as usize {
            false
        } else if self.at_page_limit() {
            self.roll_over()?;
            true
        } else {
            self.state.next_page();
            true
        };

        Ok(Some(Page {
            number,
            records,
            has_more,
        }))
    }

    fn at_page_limit(&self) -> bool {
        self.rollover
            .as_ref()
            .is_some_and(|r| self.state.page >= r.page_limit)
    }

    /// Drop records already emitted before the last rollover
    fn skip_boundary_repeats(&mut self, records: &mut Vec<JsonValue>, rollover: &Rollover) {
        let Some(boundary) = &self.boundary else {
            return;
        };

        let before = records.len();
        let mut passed = false;
        records.retain(|record| {
            if passed {
                return true;
            }
            match record.get(&rollover.cursor_field) {
                Some(cursor) if cursor.is_string() && cursor != &boundary.cursor => {
                    passed = true;
                    true
                }
                _ => !boundary.contains(record, rollover),
            }
        });

        if before != records.len() {
            debug!(
                path = %self.path,
                dropped = before - records.len(),
                "dropped records repeated across rollover"
            );
        }
        if passed {
            self.boundary = None;
        }
    }

    fn track_tail(&mut self, records: &[JsonValue], rollover: &Rollover) {
        for record in records {
            let Some(cursor) = record.get(&rollover.cursor_field).filter(|c| c.is_string()) else {
                self.tail = None;
                continue;
            };
            let key = record_key(record, &rollover.key_fields);
            if let Some(tail) = self.tail.as_mut().filter(|t| &t.cursor == cursor) {
                tail.keys.extend(key);
            } else {
                self.tail = Some(Boundary {
                    cursor: cursor.clone(),
                    keys: key.into_iter().collect(),
                });
            }
        }
    }

    /// Move the cursor filter to the last record and restart at page 1
    fn roll_over(&mut self) -> Result<()> {
        let Some(rollover) = self.rollover.clone() else {
            return Ok(());
        };

        let Some(tail) = self.tail.clone() else {
            return Err(Error::decode(format!(
                "'{}' page {} ends with a record lacking '{}'; cannot roll over",
                self.path, self.state.page, rollover.cursor_field
            )));
        };
        let last_cursor = tail.cursor.as_str().unwrap_or_default().to_string();

        if self.query.get(&rollover.cursor_filter) == Some(&last_cursor) {
            return Err(Error::decode(format!(
                "'{}' returned {} full pages sharing {} = {last_cursor}; pagination cannot advance",
                self.path, rollover.page_limit, rollover.cursor_field
            )));
        }

        info!(
            path = %self.path,
            page_limit = rollover.page_limit,
            filter = %rollover.cursor_filter,
            from = %last_cursor,
            "page limit reached, restarting from last cursor"
        );

        self.query.insert(rollover.cursor_filter.clone(), last_cursor);
        self.boundary = Some(tail);
        self.state.roll_over();
        Ok(())
    }
}

impl Boundary {
    fn contains(&self, record: &JsonValue, rollover: &Rollover) -> bool {
        record.get(&rollover.cursor_field) == Some(&self.cursor)
            && record_key(record, &rollover.key_fields).is_some_and(|k| self.keys.contains(&k))
    }
}

/// Composite key of a record, `None` if any key field is missing
fn record_key(record: &JsonValue, key_fields: &[String]) -> Option<String> {
    let parts: Option<Vec<String>> = key_fields
        .iter()
        .map(|field| match record.get(field)? {
            JsonValue::Null => None,
            JsonValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
        .collect();
    parts.map(|p| p.join("|"))
}

impl<F: ?Sized> std::fmt::Debug for Pages<'_, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pages")
            .field("path", &self.path)
            .field("page_size", &self.page_size)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

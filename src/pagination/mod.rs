//! Pagination module
//!
//! Freshdesk pages with `page`/`per_page` query parameters. A page holding
//! fewer records than `per_page` is the last one.
//!
//! # Overview
//!
//! [`Pages`] is an explicit, finite sequence: call `next()` until it returns
//! `Ok(None)`. It is never rewound; resuming across processes goes through
//! persisted cursors instead. Endpoints that refuse deep page numbers can be
//! given a [`Rollover`], which restarts paging from page 1 with the cursor
//! filter moved up to the last record seen.

mod pages;
mod types;

pub use pages::Pages;
pub use types::{Page, PaginationState, Rollover, PAGE_PARAM, PER_PAGE_PARAM};

use std::future::Future;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::SessionError;
use crate::observability::metrics::get_metrics;

/// One page of a list endpoint.
///
/// When `next_page_cursor` is absent, `resources` is the last page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PagedResult<T> {
    #[serde(default)]
    pub resources: Vec<T>,
    #[serde(rename = "next_url", default)]
    pub next_page_cursor: Option<String>,
}

impl<T> PagedResult<T> {
    pub fn new(resources: Vec<T>, next_page_cursor: Option<String>) -> Self {
        Self { resources, next_page_cursor }
    }
}

/// Fetch pages until one comes back without a cursor and merge them in arrival order.
///
/// The first page is requested with no cursor, every following one with the
/// cursor of its predecessor. A failing page aborts the whole aggregation and
/// the pages gathered so far are dropped. More than `max_pages` pages is
/// reported as [`SessionError::PageLimitExceeded`]; the first page is always
/// fetched, even with a ceiling of zero.
pub async fn fetch_all<T, F, Fut>(max_pages: usize, mut fetch_page: F) -> Result<Vec<T>, SessionError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<PagedResult<T>, SessionError>>,
{
    let max_pages = max_pages.max(1);
    let metrics = get_metrics().await;
    let mut merged = Vec::new();
    let mut cursor: Option<String> = None;

    for page_number in 1..=max_pages {
        let page = fetch_page(cursor.take()).await?;
        metrics.pages_fetched.inc();
        merged.extend(page.resources);

        match page.next_page_cursor.filter(|c| !c.is_empty()) {
            Some(next) => {
                debug!(page_number, "following page cursor");
                cursor = Some(next);
            }
            None => {
                debug!(pages = page_number, items = merged.len(), "pagination complete");
                return Ok(merged);
            }
        }
    }

    warn!(max_pages, "page cursor chain did not end within the page ceiling");
    Err(SessionError::PageLimitExceeded { max_pages })
}

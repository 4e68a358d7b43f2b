//! Page-by-page listing with in-place rate-limit retries.
//!
//! Every listing endpoint on the platform is paginated the same way: the
//! caller asks for page `n` with a fixed page size and stops once a page comes
//! back shorter than that size. [`list_all_pages`] drives that loop and wraps
//! each single page fetch in [`RetryPolicy::run`] so that a rate-limited page
//! is retried instead of being mistaken for the end of the listing.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::Error;

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod tests;

/// Number of items requested per page.
pub const PAGE_SIZE: usize = 100;

/// Pages are numbered from one.
pub const FIRST_PAGE: u32 = 1;

/// Attempts made for one call before a rate-limit error is returned.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Wait used when a rate-limit response does not say when the limit resets.
pub const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// One fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,

    /// Whether another page should be requested
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Builds a page, deriving `has_more` from whether the page was full.
    pub fn from_items(items: Vec<T>, page_size: usize) -> Self {
        let has_more = items.len() >= page_size;
        Self { items, has_more }
    }

    /// A terminal page without items.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            has_more: false,
        }
    }
}

/// Retry policy for rate-limited calls.
///
/// A call is attempted up to `max_attempts` times. Rate-limited attempts sleep
/// for the wait reported by the platform (or `default_wait`) before the next
/// attempt; any other error is returned immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,

    /// Wait used when the platform gave no reset information
    pub default_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            default_wait: DEFAULT_RATE_LIMIT_WAIT,
        }
    }
}

impl RetryPolicy {
    /// Runs `op` until it succeeds, fails with a non rate-limit error, or the
    /// attempt budget is exhausted. In the last case the final rate-limit
    /// error is returned.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Err(e) if e.is_rate_limited() => {
                    if attempt >= self.max_attempts {
                        warn!(
                            attempts = attempt,
                            "Giving up after repeated rate-limit responses"
                        );
                        return Err(e);
                    }

                    let wait = e.retry_after().unwrap_or(self.default_wait);
                    warn!(
                        attempt,
                        wait_seconds = wait.as_secs(),
                        "Rate limited by the platform, waiting before retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

/// Collects every page produced by `fetch_page`.
///
/// Pages are requested starting at [`FIRST_PAGE`]. The loop stops after the
/// first page whose `has_more` is `false`, after `max_pages` pages when a cap
/// is given, or on the first error. On error the items gathered so far are
/// dropped and only the error is returned.
pub async fn list_all_pages<T, F, Fut>(
    policy: &RetryPolicy,
    max_pages: Option<u32>,
    mut fetch_page: F,
) -> Result<Vec<T>, Error>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, Error>>,
{
    let mut items = Vec::new();
    let mut page = FIRST_PAGE;
    loop {
        let current = policy.run(|| fetch_page(page)).await?;
        let count = current.items.len();
        items.extend(current.items);

        if !current.has_more {
            debug!(pages = page, items = items.len(), "Reached the last page");
            break;
        }

        if max_pages.is_some_and(|max| page >= max) {
            debug!(
                pages = page,
                items = items.len(),
                last_page_items = count,
                "Stopped listing at the page cap"
            );
            break;
        }

        page += 1;
    }

    Ok(items)
}

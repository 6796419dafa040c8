//! Paginated fetcher
//!
//! This module turns one page URL into a decoded envelope, including:
//! - Classifying each attempt as success, transient or fatal
//! - Retrying malformed bodies a bounded number of times
//! - Decoding the entity type that belongs to each edge kind
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | Transport error / timeout | Immediate failure |
//! | Non-2xx (strict status) | Immediate failure |
//! | Body is not JSON, or is truncated | Wait one pacing interval, retry |
//! | JSON of the wrong shape | Immediate failure |
//! | Retry limit reached | Failure with the last decode error |

use crate::api::{is_malformed, DiscoveredPage, Envelope, Member, PageSource, Topic};
use crate::state::EdgeKind;
use crate::HarvestError;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Characters of a malformed body echoed into the log
const BODY_PREVIEW_CHARS: usize = 120;

/// Result of a single fetch attempt
#[derive(Debug)]
pub enum FetchOutcome<T> {
    /// The body decoded as an envelope
    Success(Envelope<T>),

    /// The body looked like an error page or was cut short; worth retrying
    Transient(serde_json::Error),

    /// Retrying would not help
    Fatal(HarvestError),
}

/// Fetches single pages with bounded retry of malformed bodies
#[derive(Clone)]
pub struct PaginatedFetcher {
    source: Arc<dyn PageSource>,
    retry_limit: u32,
    retry_delay: Duration,
}

impl PaginatedFetcher {
    /// Creates a fetcher
    ///
    /// # Arguments
    ///
    /// * `source` - Where page bodies come from
    /// * `retry_limit` - Total attempts allowed per page (at least 1)
    /// * `retry_delay` - Wait between attempts, normally the pacing interval
    pub fn new(source: Arc<dyn PageSource>, retry_limit: u32, retry_delay: Duration) -> Self {
        Self {
            source,
            retry_limit: retry_limit.max(1),
            retry_delay,
        }
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    /// Makes one request for `url` and classifies the outcome
    pub async fn attempt<T: DeserializeOwned>(&self, url: &str) -> FetchOutcome<T> {
        let body = match self.source.get(url).await {
            Ok(body) => body,
            Err(e) => return FetchOutcome::Fatal(e),
        };

        match serde_json::from_str::<Envelope<T>>(&body) {
            Ok(envelope) => FetchOutcome::Success(envelope),
            Err(e) if is_malformed(&e) => {
                tracing::debug!(
                    url = %url,
                    preview = %preview(&body),
                    "Malformed response body"
                );
                FetchOutcome::Transient(e)
            }
            Err(e) => FetchOutcome::Fatal(HarvestError::Schema {
                url: url.to_string(),
                source: e,
            }),
        }
    }

    /// Fetches and decodes one page, retrying malformed bodies
    ///
    /// # Returns
    ///
    /// * `Ok(Envelope)` - The page decoded
    /// * `Err(HarvestError::RetriesExhausted)` - Every allowed attempt returned a malformed body
    /// * `Err(HarvestError)` - A transport, status or schema failure, not retried
    pub async fn fetch_page<T: DeserializeOwned>(&self, url: &str) -> Result<Envelope<T>, HarvestError> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.attempt::<T>(url).await {
                FetchOutcome::Success(envelope) => return Ok(envelope),
                FetchOutcome::Fatal(e) => return Err(e),
                FetchOutcome::Transient(e) => {
                    if attempts >= self.retry_limit {
                        return Err(HarvestError::RetriesExhausted {
                            url: url.to_string(),
                            attempts,
                            source: e,
                        });
                    }

                    tracing::warn!(
                        url = %url,
                        attempt = attempts,
                        limit = self.retry_limit,
                        "Malformed page, retrying after {:?}: {}",
                        self.retry_delay,
                        e
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    /// Fetches one page of `kind` and reduces it to discovered identifiers
    pub async fn fetch_edge_page(&self, kind: EdgeKind, url: &str) -> Result<DiscoveredPage, HarvestError> {
        let page = match kind {
            EdgeKind::Followees | EdgeKind::Followers => {
                DiscoveredPage::from(self.fetch_page::<Member>(url).await?)
            }
            EdgeKind::TopicChildren => DiscoveredPage::from(self.fetch_page::<Topic>(url).await?),
        };

        tracing::debug!(
            url = %url,
            items = page.item_count,
            is_end = page.paging.is_end,
            "Fetched {} page",
            kind
        );

        Ok(page)
    }
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

//! Fetching results from the arXiv index.
//!
//! # Architecture
//!
//! - [`ArticleIndex`]: one search round-trip against the index
//! - [`ArxivClient`]: the HTTP implementation, answering with Atom
//! - [`Fetcher`]: wraps any index with a [`RetryPolicy`] and drops cross-listed
//!   results afterwards
//!
//! Results come back sorted by submission time, oldest first, and keep that
//! order through filtering.

use std::time::Duration;

use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::models::{ArticleFeedItem, AtomFeed};
use crate::query::FeedQuery;
use crate::retry::RetryPolicy;
use crate::utils::truncate_for_log;

/// Public arXiv search endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://export.arxiv.org/api/query";

/// Upper bound on results requested in one query.
pub const DEFAULT_MAX_RESULTS: usize = 1000;

/// A searchable article index.
pub trait ArticleIndex {
    /// Run `query` once, returning at most `max_results` items sorted by
    /// submission time, oldest first.
    async fn search(&self, query: &FeedQuery, max_results: usize) -> Result<Vec<ArticleFeedItem>>;
}

/// How a result's primary category is compared with the requested one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CategoryMatch {
    /// Primary category must equal the requested category.
    #[default]
    Exact,
    /// Primary category must start with the requested category.
    Prefix,
}

impl CategoryMatch {
    pub fn matches(self, requested: &str, primary: &str) -> bool {
        match self {
            Self::Exact => primary == requested,
            Self::Prefix => primary.starts_with(requested),
        }
    }
}

/// Drop cross-listed items: the index returns anything tagged with the
/// category, not only items that primarily belong to it.
pub fn filter_primary(
    items: Vec<ArticleFeedItem>,
    category: &str,
    matching: CategoryMatch,
) -> Vec<ArticleFeedItem> {
    items
        .into_iter()
        .filter(|item| {
            let keep = matching.matches(category, &item.primary_category);
            if !keep {
                debug!(id = %item.id, primary = %item.primary_category, "Dropping cross-listed item");
            }
            keep
        })
        .collect()
}

/// HTTP client for the arXiv Atom API.
#[derive(Debug, Clone)]
pub struct ArxivClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl ArxivClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: Url::parse(endpoint)?,
        })
    }

    /// Full request URL for `query`.
    pub fn request_url(&self, query: &FeedQuery, max_results: usize) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("search_query", &query.expression())
            .append_pair("sortBy", "submittedDate")
            .append_pair("sortOrder", "ascending")
            .append_pair("start", "0")
            .append_pair("max_results", &max_results.to_string());
        url
    }
}

impl ArticleIndex for ArxivClient {
    #[instrument(level = "info", skip_all, fields(category = %query.category))]
    async fn search(&self, query: &FeedQuery, max_results: usize) -> Result<Vec<ArticleFeedItem>> {
        let url = self.request_url(query, max_results);
        debug!(%url, "Requesting feed");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::from_http("fetch", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::from_http("fetch", e))?;
        if !status.is_success() {
            return Err(Error::from_status("fetch", status, &body));
        }

        let feed = AtomFeed::parse(&body).inspect_err(|e| {
            debug!(error = %e, body = %truncate_for_log(&body, 300), "Unreadable feed");
        })?;
        Ok(feed.into_items())
    }
}

/// Index search with retry and cross-list filtering.
#[derive(Debug)]
pub struct Fetcher<I> {
    index: I,
    retry: RetryPolicy,
    max_results: usize,
    matching: CategoryMatch,
}

impl<I: ArticleIndex> Fetcher<I> {
    pub fn new(index: I, retry: RetryPolicy, max_results: usize, matching: CategoryMatch) -> Self {
        Self {
            index,
            retry,
            max_results,
            matching,
        }
    }

    #[cfg(test)]
    pub(crate) fn index(&self) -> &I {
        &self.index
    }

    /// Search for `query`, retrying transient failures, and keep only items
    /// whose primary category matches the queried one.
    #[instrument(level = "info", skip_all, fields(category = %query.category))]
    pub async fn fetch_paper_feeds(&self, query: &FeedQuery) -> Result<Vec<ArticleFeedItem>> {
        info!(query = %query, max_results = self.max_results, "Querying index");

        let items = self
            .retry
            .run("fetch", || self.index.search(query, self.max_results))
            .await?;

        let fetched = items.len();
        let kept = filter_primary(items, &query.category, self.matching);

        let outside = kept
            .iter()
            .filter(|item| item.published.is_some_and(|p| !query.window.contains(&p)))
            .count();
        if outside > 0 {
            warn!(outside, window = %query.window, "Index returned items submitted outside the window");
        }

        info!(
            fetched,
            kept = kept.len(),
            cross_listed = fetched - kept.len(),
            "Fetched feed"
        );
        Ok(kept)
    }
}

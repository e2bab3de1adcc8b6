//! Rendering results as Slack notification lines.
//!
//! One result becomes one line:
//!
//! ```text
//! [<http://arxiv.org/abs/2101.00001|2101.00001>] Title (First Author, Second Author, ...)
//! ```

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::models::ArticleFeedItem;
use crate::window::AnnouncedDate;

/// Authors shown before the list is cut.
pub const AUTHOR_LIMIT: usize = 2;

/// Marker appended to a cut author list.
pub const ELLIPSIS: &str = "...";

static ABS_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://[^/\s]+/abs/(\d{4}\.\d{5})(?:v\d+)?$").expect("valid identifier pattern")
});

static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").expect("valid whitespace pattern"));

/// Extract the short identifier from an abstract-page URL.
///
/// # Errors
///
/// [`Error::Format`] when the URL is not `http://<host>/abs/NNNN.NNNNN`
/// (optionally followed by a version suffix). A different shape means the
/// index changed its format and someone should look at it.
pub fn article_id(url: &str) -> Result<&str> {
    ABS_URL
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| Error::Format {
            url: url.to_string(),
        })
}

/// Replace line breaks with spaces and collapse runs of spaces.
pub fn clean_title(title: &str) -> String {
    let single_line = title.replace("\r\n", " ").replace(['\n', '\r'], " ");
    SPACES.replace_all(&single_line, " ").trim().to_string()
}

/// Keep the first `limit` authors, adding [`ELLIPSIS`] when some were dropped.
pub fn truncate_authors(authors: &[String], limit: usize) -> Vec<&str> {
    let mut shown: Vec<&str> = authors.iter().take(limit).map(String::as_str).collect();
    if authors.len() > limit {
        shown.push(ELLIPSIS);
    }
    shown
}

/// Render one result as a notification line.
pub fn feed_to_post(item: &ArticleFeedItem) -> Result<String> {
    let id = article_id(&item.url)?;
    let title = clean_title(&item.title);
    let authors = truncate_authors(&item.authors, AUTHOR_LIMIT).into_iter().join(", ");
    Ok(format!("[<{}|{}>] {} ({})", item.url, id, title, authors))
}

/// Lead line sent ahead of a batch.
pub fn batch_header(category: &str, date: AnnouncedDate, count: usize) -> String {
    let noun = if count == 1 { "submission" } else { "submissions" };
    format!("*{category}* announced on {date}: {count} new {noun}")
}

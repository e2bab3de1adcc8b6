//! Data models for index results.
//!
//! - [`ArticleFeedItem`]: one search result, as the rest of the crate sees it
//! - [`AtomFeed`] and friends: the Atom document the arXiv API answers with
//!
//! The Atom structs mirror only the elements this crate reads; everything
//! else in the document is skipped during deserialization.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::error::Result;

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleFeedItem {
    /// Canonical abstract page, e.g. `http://arxiv.org/abs/2101.00001v1`.
    pub url: String,
    /// The entry identifier as published by the index.
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    /// Primary classification tag, e.g. `cs.CL`.
    pub primary_category: String,
    /// First-version submission time, when the feed carries a parseable one.
    pub published: Option<DateTime<FixedOffset>>,
}

/// Root `<feed>` element.
#[derive(Debug, Deserialize)]
pub struct AtomFeed {
    #[serde(rename = "entry", default)]
    pub entries: Vec<AtomEntry>,
}

/// One `<entry>` of the feed.
#[derive(Debug, Deserialize)]
pub struct AtomEntry {
    pub id: String,
    #[serde(default)]
    pub published: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "author", default)]
    pub authors: Vec<AtomAuthor>,
    #[serde(rename = "link", default)]
    pub links: Vec<AtomLink>,
    #[serde(rename = "primary_category", alias = "arxiv:primary_category", default)]
    pub primary_category: Option<AtomCategory>,
}

#[derive(Debug, Deserialize)]
pub struct AtomAuthor {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AtomLink {
    #[serde(rename = "@href")]
    pub href: String,
    #[serde(rename = "@rel", default)]
    pub rel: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AtomCategory {
    #[serde(rename = "@term")]
    pub term: String,
}

impl AtomFeed {
    /// Parse an Atom document.
    pub fn parse(xml: &str) -> Result<Self> {
        Ok(quick_xml::de::from_str(xml)?)
    }

    pub fn into_items(self) -> Vec<ArticleFeedItem> {
        self.entries.into_iter().map(ArticleFeedItem::from).collect()
    }
}

impl From<AtomEntry> for ArticleFeedItem {
    fn from(entry: AtomEntry) -> Self {
        // The abstract page is the `alternate` link; older feeds only carry the id.
        let url = entry
            .links
            .iter()
            .find(|link| link.rel.as_deref() == Some("alternate"))
            .map(|link| link.href.clone())
            .unwrap_or_else(|| entry.id.clone());

        Self {
            url,
            published: entry
                .published
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok()),
            id: entry.id,
            title: entry.title,
            authors: entry.authors.into_iter().map(|a| a.name).collect(),
            primary_category: entry
                .primary_category
                .map(|c| c.term)
                .unwrap_or_default(),
        }
    }
}

//! Search expressions for the article index.

use std::fmt;

use chrono::{DateTime, FixedOffset};

use crate::window::{SubmissionWindow, reference_offset};

/// Timestamp layout the index expects inside `submittedDate:[.. TO ..]`.
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// A category filter combined with a submission-time range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub category: String,
    pub window: SubmissionWindow,
}

impl FeedQuery {
    pub fn new(category: impl Into<String>, window: SubmissionWindow) -> Self {
        Self {
            category: category.into(),
            window,
        }
    }

    /// `cat:<category> AND submittedDate:[<begin> TO <end>]`
    pub fn expression(&self) -> String {
        format!(
            "cat:{} AND submittedDate:[{} TO {}]",
            self.category,
            timestamp(self.window.begin()),
            timestamp(self.window.end())
        )
    }
}

impl fmt::Display for FeedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression())
    }
}

/// Second-precision wall time on the reference clock, no zone suffix.
fn timestamp(instant: DateTime<FixedOffset>) -> String {
    instant
        .with_timezone(&reference_offset())
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

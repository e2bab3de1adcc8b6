//! Error taxonomy for a notification run.
//!
//! Every failure the pipeline can hit maps onto one [`Error`] variant. Only
//! [`Error::Transient`] is eligible for retry; everything else ends the run.

use chrono::{NaiveDate, Weekday};
use reqwest::StatusCode;
use thiserror::Error;

use crate::utils::truncate_for_log;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Network or service hiccup on fetch or notify.
    #[error("transient failure during {operation}: {message}")]
    Transient { operation: String, message: String },

    /// Missing credential, malformed configuration file, or bad CLI input.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A result URL did not carry the expected identifier shape.
    #[error("unexpected article URL format: {url}")]
    Format { url: String },

    /// A submission window was requested for a weekend announced date.
    #[error("no submission window for {date} ({weekday}): announced dates never fall on a weekend")]
    InvalidWindow { date: NaiveDate, weekday: Weekday },

    /// The remote side answered but refused the request.
    #[error("{operation} rejected with HTTP {status}: {body}")]
    Rejected {
        operation: String,
        status: StatusCode,
        body: String,
    },

    /// The index answered with something that is not a readable Atom feed.
    #[error("feed parse error: {0}")]
    Feed(#[from] quick_xml::DeError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Create a transient error for the named operation.
    pub fn transient(operation: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Transient {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a rejection error for the named operation.
    pub fn rejected(operation: impl Into<String>, status: StatusCode, body: impl Into<String>) -> Self {
        Self::Rejected {
            operation: operation.into(),
            status,
            body: body.into(),
        }
    }

    /// Whether a retry policy may try the failed call again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Classify a failed HTTP exchange.
    ///
    /// Connection failures, timeouts, 429 and 5xx are transient; any other
    /// status is a rejection.
    pub fn from_http(operation: &str, err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if is_retryable_status(status) => Self::transient(operation, err),
            Some(status) => Self::rejected(operation, status, err.to_string()),
            None if err.is_timeout() || err.is_connect() || err.is_request() => {
                Self::transient(operation, err)
            }
            None => Self::Http(err),
        }
    }

    /// Classify a response that arrived with a non-success status.
    pub fn from_status(operation: &str, status: StatusCode, body: &str) -> Self {
        if is_retryable_status(status) {
            Self::transient(operation, format!("HTTP {status}"))
        } else {
            Self::rejected(operation, status, truncate_for_log(body.trim(), 300))
        }
    }
}

/// HTTP statuses worth another attempt.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

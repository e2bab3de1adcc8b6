//! Command-line interface definitions for the arXiv notifier.
//!
//! Options map onto [`Settings`] and a channel list. The index endpoint can
//! also come from the environment.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use clap::{Parser, ValueEnum};

use crate::config::{Channel, Settings, load_channels};
use crate::error::{Error, Result};
use crate::fetch::{CategoryMatch, DEFAULT_ENDPOINT, DEFAULT_MAX_RESULTS};
use crate::notify::NotificationTarget;
use crate::retry::RetryPolicy;
use crate::window::{AnnouncementPolicy, CUTOFF_HOUR, clock, on_reference_clock};

/// Announcement-date rule selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PolicyArg {
    /// 20:00 cutoff with 14:00 windows
    #[default]
    EveningCutoff,
    /// Yesterday's whole calendar day
    PreviousDay,
    /// A whole calendar day `--lag-days` business days back
    BusinessDayLag,
}

/// Retry preset for index fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FetchRetryArg {
    /// 10 attempts, 30 s apart
    #[default]
    Patient,
    /// 5 attempts, 60 s apart
    Legacy,
}

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Post today's cs.CL batch to the webhook stored in $SLACK_WEBHOOK_NLP
/// arxiv_notify -c cs.CL -w SLACK_WEBHOOK_NLP
///
/// # Replay the batch announced on a past Tuesday, without posting
/// arxiv_notify -c cs.CL -d 2024-01-16
///
/// # Several channels from a file
/// arxiv_notify --config channels.yaml --announce
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// arXiv category to watch, e.g. cs.CL
    #[arg(short, long, required_unless_present = "config", conflicts_with = "config")]
    pub category: Option<String>,

    /// Slack webhook URL, or the name of the environment variable holding it.
    /// Without one the run only logs what it would post.
    #[arg(short, long, value_parser = parse_target, conflicts_with = "config")]
    pub webhook: Option<NotificationTarget>,

    /// Reference instant: RFC 3339, a wall time on the UTC-5 clock, or a bare
    /// date meaning 20:00 that day. Defaults to now.
    #[arg(short, long, value_parser = parse_reference)]
    pub date: Option<DateTime<FixedOffset>>,

    /// YAML channel list, instead of --category/--webhook
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Announcement-date rule
    #[arg(long, value_enum, default_value_t = PolicyArg::EveningCutoff)]
    pub policy: PolicyArg,

    /// Business days to step back under --policy business-day-lag
    #[arg(long, default_value_t = 2)]
    pub lag_days: u32,

    /// How primary categories are compared with the requested one
    #[arg(long = "match", value_enum, default_value_t = CategoryMatch::Exact)]
    pub matching: CategoryMatch,

    /// Upper bound on results per query
    #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
    pub max_results: usize,

    /// Search endpoint of the index
    #[arg(long, env = "ARXIV_INDEX_URL", default_value = DEFAULT_ENDPOINT)]
    pub index_url: String,

    /// Retry preset for index fetches
    #[arg(long, value_enum, default_value_t = FetchRetryArg::Patient)]
    pub fetch_retry: FetchRetryArg,

    /// Override the preset's fetch attempts
    #[arg(long)]
    pub fetch_attempts: Option<usize>,

    /// Override the preset's pause between fetch attempts
    #[arg(long)]
    pub fetch_delay_secs: Option<u64>,

    /// Attempts per webhook post
    #[arg(long, default_value_t = 5)]
    pub notify_attempts: usize,

    /// Pause between webhook attempts
    #[arg(long, default_value_t = 60)]
    pub notify_delay_secs: u64,

    /// Per-request HTTP timeout
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Post a lead line with the announced date before a non-empty batch
    #[arg(long)]
    pub announce: bool,
}

fn parse_target(value: &str) -> std::result::Result<NotificationTarget, String> {
    if value.trim().is_empty() {
        return Err("webhook must not be empty".into());
    }
    Ok(NotificationTarget::parse(value))
}

/// Read a `--date` value.
pub fn parse_reference(value: &str) -> std::result::Result<DateTime<FixedOffset>, String> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(on_reference_clock(naive.date(), naive.time()));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(on_reference_clock(date, clock(CUTOFF_HOUR, 0, 0)));
    }
    Err(format!(
        "`{value}` is not an RFC 3339 timestamp, a YYYY-MM-DD[THH:MM[:SS]] wall time, or a date"
    ))
}

impl Cli {
    pub fn settings(&self) -> Settings {
        let policy = match self.policy {
            PolicyArg::EveningCutoff => AnnouncementPolicy::EveningCutoff,
            PolicyArg::PreviousDay => AnnouncementPolicy::PreviousDay,
            PolicyArg::BusinessDayLag => AnnouncementPolicy::BusinessDayLag {
                days: self.lag_days,
            },
        };

        let mut fetch_retry = match self.fetch_retry {
            FetchRetryArg::Patient => RetryPolicy::patient_fetch(),
            FetchRetryArg::Legacy => RetryPolicy::legacy_fetch(),
        };
        if let Some(attempts) = self.fetch_attempts {
            fetch_retry.max_attempts = attempts;
        }
        if let Some(secs) = self.fetch_delay_secs {
            fetch_retry.delay = Duration::from_secs(secs);
        }

        Settings {
            policy,
            matching: self.matching,
            max_results: self.max_results,
            endpoint: self.index_url.clone(),
            http_timeout: Duration::from_secs(self.timeout_secs),
            fetch_retry,
            notify_retry: RetryPolicy::fixed(
                self.notify_attempts,
                Duration::from_secs(self.notify_delay_secs),
            ),
            announce: self.announce,
        }
    }

    /// The instant the run is evaluated at.
    pub fn reference(&self) -> DateTime<FixedOffset> {
        self.date.unwrap_or_else(|| Utc::now().fixed_offset())
    }

    /// Channels to run, from `--config` or from `--category`/`--webhook`.
    pub async fn channels(&self) -> Result<Vec<Channel>> {
        if let Some(path) = &self.config {
            return load_channels(path).await;
        }
        let category = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::config("no category given"))?;
        Ok(vec![Channel {
            category: category.to_string(),
            target: self.webhook.clone(),
        }])
    }
}

//! One notification run across all configured channels.
//!
//! 1. Compute the announced date and submission window once
//! 2. Resolve every channel's webhook, so a missing credential stops the run
//!    before anything is fetched or posted
//! 3. Per channel, in order: fetch, drop cross-lists, format every result,
//!    then post the lines oldest first

use chrono::{DateTime, FixedOffset};
use tracing::{info, instrument};

use crate::config::Channel;
use crate::error::Result;
use crate::fetch::{ArticleIndex, Fetcher};
use crate::format::{batch_header, feed_to_post};
use crate::notify::{CredentialSource, Notifier, Webhook, WebhookSender};
use crate::query::FeedQuery;
use crate::window::{AnnouncedDate, AnnouncementPolicy, SubmissionWindow};

/// Outcome of one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelReport {
    pub category: String,
    /// Results left after dropping cross-lists.
    pub found: usize,
    /// Lines delivered, lead line included.
    pub posted: usize,
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub date: AnnouncedDate,
    pub window: SubmissionWindow,
    pub channels: Vec<ChannelReport>,
}

pub struct Runner<I, S, C> {
    policy: AnnouncementPolicy,
    fetcher: Fetcher<I>,
    notifier: Notifier<S>,
    credentials: C,
    announce: bool,
}

impl<I, S, C> Runner<I, S, C>
where
    I: ArticleIndex,
    S: WebhookSender,
    C: CredentialSource,
{
    pub fn new(
        policy: AnnouncementPolicy,
        fetcher: Fetcher<I>,
        notifier: Notifier<S>,
        credentials: C,
        announce: bool,
    ) -> Self {
        Self {
            policy,
            fetcher,
            notifier,
            credentials,
            announce,
        }
    }

    /// Run every channel against the batch announced as of `reference`.
    ///
    /// Stops at the first fatal error; lines posted before it stay posted.
    #[instrument(level = "info", skip_all, fields(policy = %self.policy))]
    pub async fn run(&self, reference: DateTime<FixedOffset>, channels: &[Channel]) -> Result<RunReport> {
        let (date, window) = self.policy.resolve(&reference)?;
        info!(
            reference = %reference.to_rfc3339(),
            announced = %date,
            anchor = %date.anchor().to_rfc3339(),
            %window,
            span_hours = window.span().num_hours(),
            "Computed submission window"
        );

        let resolved = channels
            .iter()
            .map(|channel| {
                let webhook = channel
                    .target
                    .as_ref()
                    .map(|target| target.resolve(&self.credentials))
                    .transpose()?;
                Ok((channel, webhook))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut reports = Vec::with_capacity(resolved.len());
        for (channel, webhook) in resolved {
            reports.push(
                self.run_channel(date, window, &channel.category, webhook.as_ref())
                    .await?,
            );
        }

        Ok(RunReport {
            date,
            window,
            channels: reports,
        })
    }

    #[instrument(level = "info", skip_all, fields(%category))]
    async fn run_channel(
        &self,
        date: AnnouncedDate,
        window: SubmissionWindow,
        category: &str,
        webhook: Option<&Webhook>,
    ) -> Result<ChannelReport> {
        let query = FeedQuery::new(category, window);
        let items = self.fetcher.fetch_paper_feeds(&query).await?;

        // Format the whole batch first: an unexpected URL posts nothing.
        let mut lines = items.iter().map(feed_to_post).collect::<Result<Vec<_>>>()?;
        if self.announce && !lines.is_empty() {
            lines.insert(0, batch_header(category, date, items.len()));
        }

        let Some(webhook) = webhook else {
            for line in &lines {
                info!(line = %line, "Dry run; not posting");
            }
            info!(found = items.len(), "No destination configured; nothing posted");
            return Ok(ChannelReport {
                category: category.to_string(),
                found: items.len(),
                posted: 0,
            });
        };

        for line in &lines {
            self.notifier.notify_slack(line, webhook).await?;
        }
        info!(found = items.len(), posted = lines.len(), "Channel done");

        Ok(ChannelReport {
            category: category.to_string(),
            found: items.len(),
            posted: lines.len(),
        })
    }
}

//! # arXiv Notify
//!
//! Posts the newest arXiv submissions of a category to a Slack channel, one
//! line per paper, oldest first.
//!
//! ## Usage
//!
//! ```sh
//! arxiv_notify -c cs.CL -w SLACK_WEBHOOK_NLP
//! ```
//!
//! ## Architecture
//!
//! 1. **Window**: map the reference instant to the most recently announced
//!    batch and the submission window it covers
//! 2. **Fetching**: query the index for the window, retrying transient
//!    failures, and drop cross-listed results
//! 3. **Formatting**: turn every result into a `[<url|id>] title (authors)` line
//! 4. **Delivery**: post the lines to the channel's webhook, oldest first

use std::error::Error;

use clap::Parser;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod fetch;
mod format;
mod models;
mod notify;
mod query;
mod retry;
mod runner;
mod utils;
mod window;

use cli::Cli;
use fetch::{ArxivClient, Fetcher};
use notify::{Notifier, ProcessEnv, SlackWebhook};
use runner::Runner;

#[tokio::main(flavor = "current_thread")]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("arxiv_notify starting up");

    let args = Cli::parse();
    let settings = args.settings();
    debug!(?settings, "Parsed CLI arguments");

    let channels = args.channels().await.inspect_err(|e| {
        error!(error = %e, "Could not determine channels");
    })?;

    let fetcher = Fetcher::new(
        ArxivClient::new(&settings.endpoint, settings.http_timeout)?,
        settings.fetch_retry,
        settings.max_results,
        settings.matching,
    );
    let notifier = Notifier::new(SlackWebhook::new(settings.http_timeout)?, settings.notify_retry);
    let runner = Runner::new(settings.policy, fetcher, notifier, ProcessEnv, settings.announce);

    let report = match runner.run(args.reference(), &channels).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Run failed");
            return Err(e.into());
        }
    };

    for channel in &report.channels {
        info!(
            category = %channel.category,
            found = channel.found,
            posted = channel.posted,
            "Channel summary"
        );
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        announced = %report.date,
        window = %report.window,
        "Execution complete"
    );

    Ok(())
}

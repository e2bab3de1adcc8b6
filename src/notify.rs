//! Delivering notification lines to Slack incoming webhooks.
//!
//! # Architecture
//!
//! - [`NotificationTarget`]: where a line should go, either a webhook URL or
//!   the name of an environment variable holding one
//! - [`CredentialSource`]: resolves such names; [`ProcessEnv`] reads the
//!   process environment
//! - [`WebhookSender`]: one POST to one webhook; [`SlackWebhook`] is the HTTP
//!   implementation
//! - [`Notifier`]: a sender plus a [`RetryPolicy`]
//!
//! Webhook URLs embed their secret in the path and never appear in logs
//! beyond their host.

use std::fmt;
use std::time::Duration;

use serde_json::json;
use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::utils::redact_url;

/// Destination of a channel's notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationTarget {
    /// A webhook URL given directly.
    Url(String),
    /// Name of the environment variable that holds the webhook URL.
    Env(String),
}

impl NotificationTarget {
    /// Read a CLI value: anything that looks like an http(s) URL is used as
    /// is, any other value names an environment variable.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.starts_with("https://") || value.starts_with("http://") {
            Self::Url(value.to_string())
        } else {
            Self::Env(value.to_string())
        }
    }

    /// Resolve to a concrete webhook.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] naming the variable when `credentials` has no
    /// value for it.
    pub fn resolve(&self, credentials: &impl CredentialSource) -> Result<Webhook> {
        match self {
            Self::Url(url) => Ok(Webhook(url.clone())),
            Self::Env(name) => credentials.lookup(name).map(Webhook).ok_or_else(|| {
                Error::config(format!(
                    "webhook credential `{name}` is not set in the environment"
                ))
            }),
        }
    }
}

impl fmt::Display for NotificationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(&redact_url(url)),
            Self::Env(name) => write!(f, "${name}"),
        }
    }
}

/// Name → secret lookup supplied by the host environment.
pub trait CredentialSource {
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Reads credentials from the process environment. Blank values count as
/// unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl CredentialSource for ProcessEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    }
}

/// A resolved webhook URL.
#[derive(Clone, PartialEq, Eq)]
pub struct Webhook(String);

impl Webhook {
    pub fn url(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Webhook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Webhook").field(&redact_url(&self.0)).finish()
    }
}

impl fmt::Display for Webhook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&redact_url(&self.0))
    }
}

/// Posts one text payload to one webhook.
pub trait WebhookSender {
    async fn post(&self, webhook: &Webhook, text: &str) -> Result<()>;
}

/// HTTP sender speaking Slack's incoming-webhook protocol.
#[derive(Debug, Clone)]
pub struct SlackWebhook {
    http: reqwest::Client,
}

impl SlackWebhook {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

impl WebhookSender for SlackWebhook {
    async fn post(&self, webhook: &Webhook, text: &str) -> Result<()> {
        let response = self
            .http
            .post(webhook.url())
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| Error::from_http("notify", e.without_url()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::from_status("notify", status, &body))
    }
}

/// Webhook delivery with retry.
#[derive(Debug)]
pub struct Notifier<S> {
    sender: S,
    retry: RetryPolicy,
}

impl<S: WebhookSender> Notifier<S> {
    pub fn new(sender: S, retry: RetryPolicy) -> Self {
        Self { sender, retry }
    }

    #[cfg(test)]
    pub(crate) fn sender(&self) -> &S {
        &self.sender
    }

    /// Post `text` to `webhook`.
    ///
    /// Transient failures are retried; a rejected payload is not.
    #[instrument(level = "info", skip_all, fields(%webhook))]
    pub async fn notify_slack(&self, text: &str, webhook: &Webhook) -> Result<()> {
        info!(text, "Slack");
        self.retry
            .run("notify", || self.sender.post(webhook, text))
            .await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};

    /// Sender recording every attempt and answering from a script.
    #[derive(Default)]
    pub(crate) struct FakeSender {
        pub script: RefCell<VecDeque<Result<()>>>,
        pub attempts: RefCell<Vec<(String, String)>>,
    }

    impl FakeSender {
        pub(crate) fn with(script: Vec<Result<()>>) -> Self {
            Self {
                script: RefCell::new(script.into()),
                ..Self::default()
            }
        }
    }

    impl WebhookSender for FakeSender {
        async fn post(&self, webhook: &Webhook, text: &str) -> Result<()> {
            self.attempts
                .borrow_mut()
                .push((webhook.url().to_string(), text.to_string()));
            self.script.borrow_mut().pop_front().unwrap_or(Ok(()))
        }
    }

    impl CredentialSource for HashMap<String, String> {
        fn lookup(&self, name: &str) -> Option<String> {
            self.get(name).cloned()
        }
    }

    fn notifier(sender: FakeSender, attempts: usize) -> Notifier<FakeSender> {
        Notifier::new(sender, RetryPolicy::fixed(attempts, Duration::ZERO))
    }

    fn hook() -> Webhook {
        Webhook("https://hooks.slack.com/services/T/B/secret".into())
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(
            NotificationTarget::parse("https://hooks.slack.com/services/T/B/X"),
            NotificationTarget::Url("https://hooks.slack.com/services/T/B/X".into())
        );
        assert_eq!(
            NotificationTarget::parse("SLACK_WEBHOOK_NLP"),
            NotificationTarget::Env("SLACK_WEBHOOK_NLP".into())
        );
    }

    #[test]
    fn test_resolve_named_target() {
        let creds = HashMap::from([("SLACK_NLP".to_string(), "https://hooks/x".to_string())]);
        let hook = NotificationTarget::Env("SLACK_NLP".into()).resolve(&creds).unwrap();
        assert_eq!(hook.url(), "https://hooks/x");
    }

    #[test]
    fn test_missing_credential_names_the_variable() {
        let creds: HashMap<String, String> = HashMap::new();
        let err = NotificationTarget::Env("SLACK_MISSING".into())
            .resolve(&creds)
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(ref msg) if msg.contains("SLACK_MISSING")));
    }

    #[test]
    fn test_direct_url_needs_no_credentials() {
        let creds: HashMap<String, String> = HashMap::new();
        let hook = NotificationTarget::Url("https://hooks/direct".into())
            .resolve(&creds)
            .unwrap();
        assert_eq!(hook.url(), "https://hooks/direct");
    }

    #[test]
    fn test_webhook_debug_hides_secret() {
        let rendered = format!("{:?} {}", hook(), hook());
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("hooks.slack.com"));
    }

    #[tokio::test]
    async fn test_notify_posts_text() {
        let n = notifier(FakeSender::default(), 5);
        n.notify_slack("hello", &hook()).await.unwrap();
        let attempts = n.sender.attempts.borrow();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].1, "hello");
    }

    #[tokio::test]
    async fn test_notify_retries_transient_failures() {
        let n = notifier(
            FakeSender::with(vec![
                Err(Error::transient("notify", "HTTP 503")),
                Err(Error::transient("notify", "timeout")),
                Ok(()),
            ]),
            5,
        );
        n.notify_slack("hello", &hook()).await.unwrap();
        assert_eq!(n.sender.attempts.borrow().len(), 3);
    }

    #[tokio::test]
    async fn test_notify_does_not_retry_rejected_payload() {
        let n = notifier(
            FakeSender::with(vec![Err(Error::rejected(
                "notify",
                StatusCode::BAD_REQUEST,
                "invalid_payload",
            ))]),
            5,
        );
        let err = n.notify_slack("hello", &hook()).await.unwrap_err();
        assert!(matches!(err, Error::Rejected { .. }));
        assert_eq!(n.sender.attempts.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_notify_gives_up_after_max_attempts() {
        let n = notifier(
            FakeSender::with((0..5).map(|_| Err(Error::transient("notify", "down"))).collect()),
            5,
        );
        assert!(n.notify_slack("hello", &hook()).await.unwrap_err().is_transient());
        assert_eq!(n.sender.attempts.borrow().len(), 5);
    }
}

//! Run configuration: the channel list and the knobs of one run.
//!
//! A channel file is a YAML list; each entry names a category and exactly one
//! destination:
//!
//! ```yaml
//! - category: cs.CL
//!   webhook_env: SLACK_WEBHOOK_NLP
//! - category: stat.ML
//!   webhook_url: https://hooks.slack.com/services/T000/B000/XXXX
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::fetch::{CategoryMatch, DEFAULT_ENDPOINT, DEFAULT_MAX_RESULTS};
use crate::notify::NotificationTarget;
use crate::retry::RetryPolicy;
use crate::window::AnnouncementPolicy;

/// One category and where its notifications go.
///
/// Without a target the channel runs dry: results are logged, nothing is
/// posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub category: String,
    pub target: Option<NotificationTarget>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChannelEntry {
    category: String,
    #[serde(default)]
    webhook_env: Option<String>,
    #[serde(default)]
    webhook_url: Option<String>,
}

impl ChannelEntry {
    fn into_channel(self, index: usize) -> Result<Channel> {
        let category = self.category.trim().to_string();
        if category.is_empty() {
            return Err(Error::config(format!("channel #{index}: empty category")));
        }
        let target = match (self.webhook_env, self.webhook_url) {
            (Some(name), None) if !name.trim().is_empty() => {
                NotificationTarget::Env(name.trim().to_string())
            }
            (None, Some(url)) if !url.trim().is_empty() => {
                NotificationTarget::Url(url.trim().to_string())
            }
            (None, None) => {
                return Err(Error::config(format!(
                    "channel #{index} ({category}): needs `webhook_env` or `webhook_url`"
                )));
            }
            (Some(_), Some(_)) => {
                return Err(Error::config(format!(
                    "channel #{index} ({category}): set only one of `webhook_env` and `webhook_url`"
                )));
            }
            _ => {
                return Err(Error::config(format!(
                    "channel #{index} ({category}): empty webhook"
                )));
            }
        };
        Ok(Channel {
            category,
            target: Some(target),
        })
    }
}

/// Parse a YAML channel list.
pub fn parse_channels(yaml: &str) -> Result<Vec<Channel>> {
    let entries: Vec<ChannelEntry> = serde_yaml::from_str(yaml)?;
    if entries.is_empty() {
        return Err(Error::config("channel list is empty"));
    }
    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| entry.into_channel(i + 1))
        .collect()
}

/// Load a YAML channel list from `path`.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_channels(path: &Path) -> Result<Vec<Channel>> {
    let yaml = tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::config(format!("cannot read channel file {}: {e}", path.display()))
    })?;
    let channels = parse_channels(&yaml)?;
    info!(count = channels.len(), "Loaded channel list");
    Ok(channels)
}

/// Everything a run needs besides its channels.
#[derive(Debug, Clone)]
pub struct Settings {
    pub policy: AnnouncementPolicy,
    pub matching: CategoryMatch,
    pub max_results: usize,
    pub endpoint: String,
    pub http_timeout: Duration,
    pub fetch_retry: RetryPolicy,
    pub notify_retry: RetryPolicy,
    /// Send a lead line announcing the batch date before the items.
    pub announce: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            policy: AnnouncementPolicy::default(),
            matching: CategoryMatch::default(),
            max_results: DEFAULT_MAX_RESULTS,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            http_timeout: Duration::from_secs(60),
            fetch_retry: RetryPolicy::patient_fetch(),
            notify_retry: RetryPolicy::notify(),
            announce: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_channels() {
        let yaml = r#"
- category: cs.CL
  webhook_env: SLACK_WEBHOOK_NLP
- category: " stat.ML "
  webhook_url: https://hooks.slack.com/services/T/B/X
"#;
        let channels = parse_channels(yaml).unwrap();
        assert_eq!(
            channels,
            vec![
                Channel {
                    category: "cs.CL".into(),
                    target: Some(NotificationTarget::Env("SLACK_WEBHOOK_NLP".into())),
                },
                Channel {
                    category: "stat.ML".into(),
                    target: Some(NotificationTarget::Url(
                        "https://hooks.slack.com/services/T/B/X".into()
                    )),
                },
            ]
        );
    }

    #[test]
    fn test_parse_channels_rejects_missing_target() {
        let err = parse_channels("- category: cs.CL\n").unwrap_err();
        assert!(matches!(err, Error::Configuration(ref m) if m.contains("cs.CL")));
    }

    #[test]
    fn test_parse_channels_rejects_two_targets() {
        let yaml = "- category: cs.CL\n  webhook_env: A\n  webhook_url: https://x\n";
        assert!(matches!(parse_channels(yaml), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_parse_channels_rejects_empty_values() {
        assert!(matches!(
            parse_channels("- category: ''\n  webhook_env: A\n"),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            parse_channels("- category: cs.CL\n  webhook_env: '  '\n"),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(parse_channels("[]"), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_parse_channels_rejects_malformed_yaml() {
        assert!(matches!(parse_channels("category: cs.CL"), Err(Error::Yaml(_))));
        assert!(matches!(
            parse_channels("- category: cs.CL\n  webhook: A\n"),
            Err(Error::Yaml(_))
        ));
    }

    #[tokio::test]
    async fn test_load_channels_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "- category: cs.CL\n  webhook_env: SLACK_NLP").unwrap();
        let channels = load_channels(file.path()).await.unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].category, "cs.CL");
    }

    #[tokio::test]
    async fn test_load_channels_missing_file() {
        let err = load_channels(Path::new("/nonexistent/channels.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(ref m) if m.contains("channels.yaml")));
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.policy, AnnouncementPolicy::EveningCutoff);
        assert_eq!(settings.matching, CategoryMatch::Exact);
        assert_eq!(settings.max_results, 1000);
        assert_eq!(settings.fetch_retry.max_attempts, 10);
        assert_eq!(settings.fetch_retry.delay, Duration::from_secs(30));
        assert_eq!(settings.notify_retry.max_attempts, 5);
        assert!(!settings.announce);
    }
}

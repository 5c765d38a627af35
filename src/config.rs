//! Runtime configuration from environment variables.
//!
//! Required:
//! - `REVIEW_RADAR_REPO` - repository to track, as `owner/repo`
//! - `GITHUB_TOKEN` - API token for the source-of-truth client
//! - `REVIEW_RADAR_WEBHOOK_SECRET` - HMAC secret for webhook verification
//!
//! Optional:
//! - `SLACK_WEBHOOK_URL` - notifications go nowhere without it
//! - `REVIEW_RADAR_STALE_THRESHOLD_HOURS` (default 24)
//! - `REVIEW_RADAR_SYNC_INTERVAL_MINS` (default 30)
//! - `REVIEW_RADAR_STALE_CHECK_INTERVAL_MINS` (default 60)
//! - `REVIEW_RADAR_SUMMARY_INTERVAL_HOURS` (default 24)
//! - `REVIEW_RADAR_BIND_ADDR` (default 0.0.0.0:3000)
//!
//! Unparseable optional values fall back to their defaults with a warning.

use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::types::RepoId;

const DEFAULT_STALE_THRESHOLD_HOURS: i64 = 24;
const DEFAULT_SYNC_INTERVAL_MINS: u64 = 30;
const DEFAULT_STALE_CHECK_INTERVAL_MINS: u64 = 60;
const DEFAULT_SUMMARY_INTERVAL_HOURS: u64 = 24;

/// Jitter percentage applied to the sync interval (0-100).
const SYNC_JITTER_PERCENT: u8 = 20;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {var}: {source}")]
    InvalidRepo {
        var: &'static str,
        source: crate::types::InvalidRepoId,
    },
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// The repository being tracked.
    pub repo: RepoId,

    /// GitHub API token.
    pub github_token: String,

    /// Webhook secret for HMAC-SHA256 signature verification.
    pub webhook_secret: Vec<u8>,

    /// Slack incoming-webhook URL, if notifications are wanted.
    pub slack_webhook_url: Option<String>,

    /// Hours before an unreviewed (or long-unreviewed) PR counts as stale.
    pub stale_threshold_hours: i64,

    /// Interval between reconciliation cycles.
    pub sync_interval: Duration,

    /// Interval between stale-PR sweeps.
    pub stale_check_interval: Duration,

    /// Interval between daily summaries.
    pub summary_interval: Duration,

    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
}

impl Config {
    /// Reads configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            repo: required_var("REVIEW_RADAR_REPO")?
                .parse()
                .map_err(|source| ConfigError::InvalidRepo {
                    var: "REVIEW_RADAR_REPO",
                    source,
                })?,
            github_token: required_var("GITHUB_TOKEN")?,
            webhook_secret: required_var("REVIEW_RADAR_WEBHOOK_SECRET")?.into_bytes(),
            slack_webhook_url: std::env::var("SLACK_WEBHOOK_URL").ok(),
            stale_threshold_hours: parsed_var(
                "REVIEW_RADAR_STALE_THRESHOLD_HOURS",
                DEFAULT_STALE_THRESHOLD_HOURS,
            ),
            sync_interval: Duration::from_secs(
                parsed_var("REVIEW_RADAR_SYNC_INTERVAL_MINS", DEFAULT_SYNC_INTERVAL_MINS) * 60,
            ),
            stale_check_interval: Duration::from_secs(
                parsed_var(
                    "REVIEW_RADAR_STALE_CHECK_INTERVAL_MINS",
                    DEFAULT_STALE_CHECK_INTERVAL_MINS,
                ) * 60,
            ),
            summary_interval: Duration::from_secs(
                parsed_var(
                    "REVIEW_RADAR_SUMMARY_INTERVAL_HOURS",
                    DEFAULT_SUMMARY_INTERVAL_HOURS,
                ) * 3600,
            ),
            bind_addr: parsed_var(
                "REVIEW_RADAR_BIND_ADDR",
                SocketAddr::from(([0, 0, 0, 0], 3000)),
            ),
        })
    }

    /// Returns the sync interval with jitter derived from the repo identity.
    ///
    /// Instances tracking different repositories that restart together spread
    /// their reconciliation load this way. The jitter is deterministic, so the
    /// same repo always syncs on the same cadence.
    ///
    /// Formula: `interval * (1 + (hash(repo) % jitter_percent) / 100)`.
    pub fn sync_interval_with_jitter(&self) -> Duration {
        if SYNC_JITTER_PERCENT == 0 {
            return self.sync_interval;
        }
        let mut hasher = std::hash::DefaultHasher::new();
        self.repo.hash(&mut hasher);
        let jitter = (hasher.finish() % SYNC_JITTER_PERCENT as u64) as f64 / 100.0;
        Duration::from_secs_f64(self.sync_interval.as_secs_f64() * (1.0 + jitter))
    }
}

fn required_var(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

fn parsed_var<T: std::str::FromStr>(name: &'static str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(var = name, value = %raw, "Unparseable value; using default");
                default
            }
        },
        Err(_) => default,
    }
}

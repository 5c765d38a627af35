//! Error taxonomy for GitHub API calls.
//!
//! Every octocrab failure is folded into a [`GitHubApiError`] tagged either
//! transient or permanent. The tag is what the retry layer keys on: transient
//! failures (5xx, rate limits, network trouble) get backed-off retries,
//! permanent ones (bad credentials, missing repo or PR) surface immediately.

use std::fmt;

use thiserror::Error;

/// Whether a failed call is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorKind {
    /// 5xx, 429, rate-limited 403, or transport-level trouble.
    Transient,
    /// Remaining 4xx, bad credentials, missing repo or PR, malformed
    /// responses. Retrying cannot help.
    Permanent,
}

impl GitHubErrorKind {
    pub fn is_retriable(self) -> bool {
        self == GitHubErrorKind::Transient
    }
}

/// A classified GitHub API failure.
#[derive(Debug, Error)]
pub struct GitHubApiError {
    pub kind: GitHubErrorKind,

    /// HTTP status, when the failure came from a GitHub response rather than
    /// the transport.
    pub status_code: Option<u16>,

    pub message: String,

    #[source]
    pub source: Option<octocrab::Error>,
}

impl fmt::Display for GitHubApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "GitHub API error (HTTP {}): {}", code, self.message),
            None => write!(f, "GitHub API error: {}", self.message),
        }
    }
}

impl GitHubApiError {
    /// A permanent error with no underlying octocrab failure.
    pub fn permanent_without_source(message: impl Into<String>) -> Self {
        GitHubApiError {
            kind: GitHubErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// A transient error with no underlying octocrab failure.
    pub fn transient_without_source(message: impl Into<String>) -> Self {
        GitHubApiError {
            kind: GitHubErrorKind::Transient,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Classifies an octocrab error.
    pub fn from_octocrab(error: octocrab::Error) -> Self {
        let (kind, status_code) = classify(&error);
        GitHubApiError {
            kind,
            status_code,
            message: error.to_string(),
            source: Some(error),
        }
    }
}

fn classify(error: &octocrab::Error) -> (GitHubErrorKind, Option<u16>) {
    match error {
        octocrab::Error::GitHub { source, .. } => {
            let code = source.status_code.as_u16();
            let kind = match code {
                429 => GitHubErrorKind::Transient,
                403 if mentions_rate_limit(&source.message) => GitHubErrorKind::Transient,
                500..=599 => GitHubErrorKind::Transient,
                _ => GitHubErrorKind::Permanent,
            };
            (kind, Some(code))
        }
        // Anything below the HTTP layer carries no status code. Timeouts and
        // connection failures are retriable; everything else (serde failures,
        // bad URIs) indicates a bug, not weather.
        other => {
            let kind = if looks_like_network_trouble(&other.to_string()) {
                GitHubErrorKind::Transient
            } else {
                GitHubErrorKind::Permanent
            };
            (kind, None)
        }
    }
}

fn mentions_rate_limit(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("rate limit") || lower.contains("abuse detection")
}

fn looks_like_network_trouble(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["timeout", "timed out", "connection", "network", "dns"]
        .iter()
        .any(|needle| lower.contains(needle))
}

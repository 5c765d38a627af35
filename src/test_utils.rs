//! Shared test fixtures: canned PR data, a scriptable fetcher, and a
//! notification recorder.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::github::{GitHubApiError, PrFetcher};
use crate::notify::{Notification, Notifier, NotifyError};
use crate::types::{ClosedPr, PrNumber, PrSnapshot, ReviewRecord};

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// A plain open, non-draft snapshot authored by octocat.
pub fn snapshot(number: u64, created_at: DateTime<Utc>) -> PrSnapshot {
    PrSnapshot {
        number: PrNumber(number),
        title: format!("PR {number}"),
        url: format!("https://github.com/acme/widgets/pull/{number}"),
        author: "octocat".to_string(),
        created_at,
        updated_at: Some(created_at),
        is_draft: false,
    }
}

pub fn review(reviewer: &str, submitted_at: DateTime<Utc>) -> ReviewRecord {
    ReviewRecord {
        reviewer: reviewer.to_string(),
        submitted_at,
    }
}

pub fn closed_pr(
    number: u64,
    created_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
) -> ClosedPr {
    ClosedPr {
        number: PrNumber(number),
        title: format!("PR {number}"),
        created_at,
        merged_at,
    }
}

/// A `PrFetcher` whose answers, and failures, are scripted per test.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    pub open: Vec<PrSnapshot>,
    pub closed: Vec<ClosedPr>,
    pub reviews: HashMap<PrNumber, Vec<ReviewRecord>>,
    pub fail_reviews_for: HashSet<PrNumber>,
    pub fail_listing: bool,
    pub fail_closed_listing: bool,
}

#[async_trait]
impl PrFetcher for FakeFetcher {
    async fn list_open_prs(&self) -> Result<Vec<PrSnapshot>, GitHubApiError> {
        if self.fail_listing {
            return Err(GitHubApiError::transient_without_source("listing down"));
        }
        Ok(self.open.clone())
    }

    async fn list_reviews(&self, pr: PrNumber) -> Result<Vec<ReviewRecord>, GitHubApiError> {
        if self.fail_reviews_for.contains(&pr) {
            return Err(GitHubApiError::transient_without_source(
                "review listing down",
            ));
        }
        Ok(self.reviews.get(&pr).cloned().unwrap_or_default())
    }

    async fn list_closed_prs(&self, limit: usize) -> Result<Vec<ClosedPr>, GitHubApiError> {
        if self.fail_closed_listing {
            return Err(GitHubApiError::transient_without_source(
                "closed listing down",
            ));
        }
        Ok(self.closed.iter().take(limit).cloned().collect())
    }
}

/// A `Notifier` that records what it was asked to deliver.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    /// When set, every send fails after recording nothing.
    pub fail: bool,
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, note: Notification) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Status(500));
        }
        self.sent.lock().unwrap().push(note);
        Ok(())
    }
}

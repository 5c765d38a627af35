//! Pull request types for the review lifecycle tracker.
//!
//! These types represent the tracker's view of pull requests, updated
//! incrementally from webhooks and corrected by periodic reconciliation.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::PrNumber;

/// A point-in-time snapshot of a pull request as reported by the upstream
/// source (a webhook payload or a list-PRs response).
///
/// Snapshots carry no review state; review counts and reviewer sets are
/// accumulated separately (see [`TrackedPr`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrSnapshot {
    /// The PR number.
    pub number: PrNumber,

    /// The PR title at snapshot time.
    pub title: String,

    /// Web URL of the PR.
    pub url: String,

    /// Login of the PR author.
    pub author: String,

    /// When the PR was opened.
    pub created_at: DateTime<Utc>,

    /// Most recent activity known to the upstream source, if reported.
    pub updated_at: Option<DateTime<Utc>>,

    /// Whether the PR is a draft. Draft PRs are never tracked.
    pub is_draft: bool,
}

/// A single review submission, in upstream submission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Login of the reviewer.
    pub reviewer: String,

    /// When the review was submitted.
    pub submitted_at: DateTime<Utc>,
}

/// A closed pull request from the historical sample used by metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedPr {
    /// The PR number.
    pub number: PrNumber,

    /// The PR title.
    pub title: String,

    /// When the PR was opened.
    pub created_at: DateTime<Utc>,

    /// When the PR was merged. `None` means closed without merging.
    pub merged_at: Option<DateTime<Utc>>,
}

impl ClosedPr {
    /// Returns true if the PR was merged rather than closed unmerged.
    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }
}

/// A tracked open, non-draft pull request.
///
/// One entry exists per open PR; entries are created and destroyed by webhook
/// ingestion and by reconciliation (see the `store` and `reconcile` modules).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedPr {
    /// The PR number (the store key).
    pub number: PrNumber,

    /// The PR title.
    pub title: String,

    /// Web URL of the PR.
    pub url: String,

    /// Login of the PR author. Immutable for the lifetime of the entry.
    pub author: String,

    /// When the PR was opened. Immutable; age is derived from this at read
    /// time rather than stored.
    pub created_at: DateTime<Utc>,

    /// Timestamp of the most recent known review, if any.
    pub last_reviewed_at: Option<DateTime<Utc>>,

    /// Timestamp of the most recent known activity (commit push or comment).
    pub last_updated: Option<DateTime<Utc>>,

    /// Cumulative count of reviews observed while tracked.
    pub review_count: u32,

    /// Distinct reviewer logins observed while tracked.
    pub reviewers: BTreeSet<String>,

    /// Whether the PR is a draft. Always false for stored entries; the flag
    /// mirrors the upstream snapshot so callers can filter before insert.
    pub is_draft: bool,
}

impl TrackedPr {
    /// Creates a fresh entry from an upstream snapshot with no review state.
    pub fn from_snapshot(snapshot: PrSnapshot) -> Self {
        TrackedPr {
            number: snapshot.number,
            title: snapshot.title,
            url: snapshot.url,
            author: snapshot.author,
            created_at: snapshot.created_at,
            last_reviewed_at: None,
            last_updated: snapshot.updated_at,
            review_count: 0,
            reviewers: BTreeSet::new(),
            is_draft: snapshot.is_draft,
        }
    }

    /// Refreshes identity and activity fields from a newer snapshot while
    /// preserving accumulated review state.
    pub fn refresh_from(&mut self, snapshot: &PrSnapshot) {
        self.title = snapshot.title.clone();
        self.url = snapshot.url.clone();
        self.author = snapshot.author.clone();
        self.created_at = snapshot.created_at;
        if snapshot.updated_at.is_some() {
            self.last_updated = snapshot.updated_at;
        }
        self.is_draft = snapshot.is_draft;
    }

    /// Merges a typed partial update into this entry.
    ///
    /// Replacement fields overwrite when present; `review_delta` adds to the
    /// cumulative count; `reviewer` inserts into the set (idempotent).
    pub fn apply(&mut self, update: PrUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(ts) = update.last_updated {
            self.last_updated = Some(ts);
        }
        if let Some(ts) = update.last_reviewed_at {
            self.last_reviewed_at = Some(ts);
        }
        self.review_count = self.review_count.saturating_add(update.review_delta);
        if let Some(reviewer) = update.reviewer {
            self.reviewers.insert(reviewer);
        }
    }

    /// Hours elapsed since the PR was opened, computed at read time.
    pub fn age_hours(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_hours()
    }
}

/// A typed partial update for a tracked PR.
///
/// The field kinds are explicit in the type rather than inferred from names:
/// `title`, `last_updated`, and `last_reviewed_at` are replacements,
/// `review_delta` is an increment, and `reviewer` is a set insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrUpdate {
    /// Replaces the stored title when present.
    pub title: Option<String>,

    /// Replaces the last-activity timestamp when present.
    pub last_updated: Option<DateTime<Utc>>,

    /// Replaces the last-review timestamp when present.
    pub last_reviewed_at: Option<DateTime<Utc>>,

    /// Added to the stored cumulative review count.
    pub review_delta: u32,

    /// Inserted into the stored reviewer set when present.
    pub reviewer: Option<String>,
}

impl PrUpdate {
    /// An update recording non-review activity (commit push or comment).
    pub fn activity(at: DateTime<Utc>) -> Self {
        PrUpdate {
            last_updated: Some(at),
            ..Default::default()
        }
    }

    /// An update recording a retitle.
    pub fn retitle(title: impl Into<String>) -> Self {
        PrUpdate {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// An update recording one submitted review.
    pub fn review(reviewer: impl Into<String>, at: DateTime<Utc>) -> Self {
        PrUpdate {
            last_reviewed_at: Some(at),
            review_delta: 1,
            reviewer: Some(reviewer.into()),
            ..Default::default()
        }
    }
}

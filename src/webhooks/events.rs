//! Typed webhook events consumed by ingestion.
//!
//! These are the normalized forms of the GitHub deliveries the tracker cares
//! about. Anything else (labels, assignments, check runs, ...) is dropped at
//! parse time and never reaches this layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{PrNumber, PrSnapshot, RepoId};

/// A parsed GitHub webhook event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GitHubEvent {
    /// Pull request lifecycle change (opened, closed, edited, ...).
    PullRequest(PullRequestEvent),
    /// A submitted pull request review.
    Review(ReviewEvent),
    /// A comment on a PR (counts as activity, not review).
    Comment(CommentEvent),
}

impl GitHubEvent {
    /// Returns the repository this event belongs to.
    pub fn repo_id(&self) -> &RepoId {
        match self {
            GitHubEvent::PullRequest(e) => &e.repo,
            GitHubEvent::Review(e) => &e.repo,
            GitHubEvent::Comment(e) => &e.repo,
        }
    }
}

/// Pull request actions relevant to review tracking.
///
/// GitHub sends many more; the parser drops the rest before they get here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrAction {
    Opened,
    Closed,
    Reopened,
    Edited,
    /// New commits pushed to the head branch.
    Synchronize,
    ConvertedToDraft,
    ReadyForReview,
}

/// A `pull_request` event with the snapshot the tracker needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestEvent {
    /// Repository the PR belongs to.
    pub repo: RepoId,
    /// What happened.
    pub action: PrAction,
    /// Point-in-time PR state from the payload. Present for every action;
    /// `closed` only needs the number but the payload carries the rest anyway.
    pub snapshot: PrSnapshot,
    /// True when a `closed` action merged the PR rather than discarding it.
    pub merged: bool,
}

/// The review verdict attached to a submitted review.
///
/// GitHub reports these in SCREAMING_SNAKE_CASE on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
}

impl ReviewState {
    /// Human-readable label for notification text.
    pub fn label(&self) -> &'static str {
        match self {
            ReviewState::Approved => "approved",
            ReviewState::ChangesRequested => "requested changes",
            ReviewState::Commented => "commented",
            ReviewState::Dismissed => "dismissed",
            ReviewState::Pending => "pending",
        }
    }
}

/// A `pull_request_review` event for a *submitted* review.
///
/// Dismissals and edits are ignored: review counts track observed
/// submissions and are corrected wholesale by reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEvent {
    /// Repository the PR belongs to.
    pub repo: RepoId,
    /// The reviewed PR.
    pub number: PrNumber,
    /// Login of the reviewer.
    pub reviewer: String,
    /// The verdict.
    pub state: ReviewState,
    /// When the review was submitted.
    pub submitted_at: DateTime<Utc>,
}

/// An `issue_comment created` event on a pull request.
///
/// Comments on plain issues carry `number: None` and are dropped by
/// ingestion; GitHub funnels both through the same event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentEvent {
    /// Repository the comment belongs to.
    pub repo: RepoId,
    /// The PR commented on, if the issue is actually a PR.
    pub number: Option<PrNumber>,
    /// When the comment was created.
    pub commented_at: DateTime<Utc>,
}

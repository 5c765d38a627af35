//! GitHub webhook payload parser.
//!
//! Turns raw delivery JSON into typed [`GitHubEvent`] values. The event type
//! comes from the `X-GitHub-Event` header; the payload is deserialized into
//! minimal raw structures and validated explicitly.
//!
//! Policy: unknown event types and irrelevant actions parse to `Ok(None)`
//! (GitHub adds both over time, and neither is an error); structurally
//! malformed payloads for a known type are `Err`.

use serde::Deserialize;
use thiserror::Error;

use crate::types::{PrNumber, PrSnapshot, RepoId};

use super::events::{
    CommentEvent, GitHubEvent, PrAction, PullRequestEvent, ReviewEvent, ReviewState,
};

/// Error type for webhook parsing failures.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON deserialization failed (includes missing required fields).
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A field was present but carried a value we cannot interpret.
    #[error("invalid field value for {field}: {value}")]
    InvalidField { field: &'static str, value: String },
}

/// Parses a webhook delivery into a typed event.
///
/// * `Ok(Some(event))` - a known event type with a relevant action
/// * `Ok(None)` - unknown event type, or a known type with an action the
///   tracker does not care about
/// * `Err(e)` - malformed payload for a known event type
pub fn parse_webhook(event_type: &str, payload: &[u8]) -> Result<Option<GitHubEvent>, ParseError> {
    match event_type {
        "pull_request" => parse_pull_request(payload).map(|o| o.map(GitHubEvent::PullRequest)),
        "pull_request_review" => parse_review(payload).map(|o| o.map(GitHubEvent::Review)),
        "issue_comment" => parse_issue_comment(payload).map(|o| o.map(GitHubEvent::Comment)),
        _ => Ok(None),
    }
}

// ─── Raw payload structures ───────────────────────────────────────────────────
//
// These mirror just the slices of GitHub's webhook JSON we consume. Optional
// wire fields stay Option here and are defaulted or validated explicitly.

#[derive(Debug, Deserialize)]
struct RawRepository {
    owner: RawOwner,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawPullRequestPayload {
    action: String,
    pull_request: RawPullRequest,
    repository: RawRepository,
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    number: u64,
    title: String,
    html_url: String,
    user: RawUser,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: Option<chrono::DateTime<chrono::Utc>>,
    draft: Option<bool>,
    merged: Option<bool>,
}

fn parse_pull_request(payload: &[u8]) -> Result<Option<PullRequestEvent>, ParseError> {
    let raw: RawPullRequestPayload = serde_json::from_slice(payload)?;

    let action = match raw.action.as_str() {
        "opened" => PrAction::Opened,
        "closed" => PrAction::Closed,
        "reopened" => PrAction::Reopened,
        "edited" => PrAction::Edited,
        "synchronize" => PrAction::Synchronize,
        "converted_to_draft" => PrAction::ConvertedToDraft,
        "ready_for_review" => PrAction::ReadyForReview,
        // assigned, labeled, review_requested, ... are not review lifecycle
        _ => return Ok(None),
    };

    let pr = raw.pull_request;
    Ok(Some(PullRequestEvent {
        repo: RepoId::new(raw.repository.owner.login, raw.repository.name),
        action,
        snapshot: PrSnapshot {
            number: PrNumber(pr.number),
            title: pr.title,
            url: pr.html_url,
            author: pr.user.login,
            created_at: pr.created_at,
            updated_at: pr.updated_at,
            is_draft: pr.draft.unwrap_or(false),
        },
        merged: pr.merged.unwrap_or(false),
    }))
}

#[derive(Debug, Deserialize)]
struct RawReviewPayload {
    action: String,
    review: RawReview,
    pull_request: RawPullRequestMinimal,
    repository: RawRepository,
}

#[derive(Debug, Deserialize)]
struct RawReview {
    user: RawUser,
    state: String,
    submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
struct RawPullRequestMinimal {
    number: u64,
}

fn parse_review(payload: &[u8]) -> Result<Option<ReviewEvent>, ParseError> {
    let raw: RawReviewPayload = serde_json::from_slice(payload)?;

    // Only submissions matter; dismissals and edits never change the
    // cumulative count (reconciliation recounts from the full list anyway).
    if raw.action != "submitted" {
        return Ok(None);
    }

    // GitHub sends lowercase in review webhooks but SCREAMING_SNAKE_CASE
    // in the REST API; accept both.
    let state = match raw.review.state.to_uppercase().as_str() {
        "APPROVED" => ReviewState::Approved,
        "CHANGES_REQUESTED" => ReviewState::ChangesRequested,
        "COMMENTED" => ReviewState::Commented,
        "DISMISSED" => ReviewState::Dismissed,
        "PENDING" => ReviewState::Pending,
        other => {
            return Err(ParseError::InvalidField {
                field: "review.state",
                value: other.to_string(),
            });
        }
    };

    let submitted_at = raw.review.submitted_at.ok_or(ParseError::InvalidField {
        field: "review.submitted_at",
        value: "null".to_string(),
    })?;

    Ok(Some(ReviewEvent {
        repo: RepoId::new(raw.repository.owner.login, raw.repository.name),
        number: PrNumber(raw.pull_request.number),
        reviewer: raw.review.user.login,
        state,
        submitted_at,
    }))
}

#[derive(Debug, Deserialize)]
struct RawIssueCommentPayload {
    action: String,
    comment: RawComment,
    issue: RawIssue,
    repository: RawRepository,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    number: u64,
    // Present iff the "issue" is actually a pull request.
    pull_request: Option<serde_json::Value>,
}

fn parse_issue_comment(payload: &[u8]) -> Result<Option<CommentEvent>, ParseError> {
    let raw: RawIssueCommentPayload = serde_json::from_slice(payload)?;

    // Edits and deletions are not fresh activity.
    if raw.action != "created" {
        return Ok(None);
    }

    let number = raw.issue.pull_request.map(|_| PrNumber(raw.issue.number));

    Ok(Some(CommentEvent {
        repo: RepoId::new(raw.repository.owner.login, raw.repository.name),
        number,
        commented_at: raw.comment.created_at,
    }))
}

//! Webhook event ingestion.
//!
//! Applies one parsed event to the store and reports what happened. This is
//! the fast path of the tracker: every operation is a single synchronous map
//! edit that trusts the payload verbatim. Nothing here ever fetches from
//! GitHub; drift introduced by dropped or reordered deliveries is corrected
//! by the next reconciliation.
//!
//! Handlers return any notification the caller should deliver rather than
//! sending it themselves, keeping this layer synchronous and free of I/O.

use tracing::{debug, info};

use crate::notify::{Notification, PrNotification, ReviewNotification};
use crate::store::{PrStore, TrackOutcome};
use crate::types::PrUpdate;

use super::events::{CommentEvent, GitHubEvent, PrAction, PullRequestEvent, ReviewEvent};

/// What an event did to the store, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A PR entered tracking.
    Tracked,
    /// An already-tracked PR was refreshed (duplicate or late delivery).
    Refreshed,
    /// A PR left tracking.
    Removed,
    /// An existing entry was partially updated.
    Updated,
    /// The update targeted an untracked PR and was dropped.
    DroppedUnknownPr,
    /// The snapshot was a draft and was not tracked.
    SkippedDraft,
    /// The event carried nothing for the tracker.
    Ignored,
}

/// Result of applying one webhook event.
#[derive(Debug)]
pub struct Ingestion {
    pub outcome: IngestOutcome,
    /// Best-effort notification for the caller to deliver, if any.
    pub notification: Option<Notification>,
}

impl Ingestion {
    fn silent(outcome: IngestOutcome) -> Self {
        Ingestion {
            outcome,
            notification: None,
        }
    }
}

/// Applies a parsed event to the store.
///
/// The caller has already verified the delivery signature and confirmed the
/// event belongs to the tracked repository.
pub fn handle_event(event: GitHubEvent, store: &PrStore) -> Ingestion {
    match event {
        GitHubEvent::PullRequest(e) => handle_pull_request(e, store),
        GitHubEvent::Review(e) => handle_review(e, store),
        GitHubEvent::Comment(e) => handle_comment(e, store),
    }
}

fn handle_pull_request(event: PullRequestEvent, store: &PrStore) -> Ingestion {
    let number = event.snapshot.number;
    match event.action {
        PrAction::Opened | PrAction::Reopened | PrAction::ReadyForReview => {
            let note = PrNotification {
                number,
                title: event.snapshot.title.clone(),
                url: event.snapshot.url.clone(),
                author: event.snapshot.author.clone(),
            };
            match store.track(event.snapshot) {
                TrackOutcome::Inserted => {
                    info!(pr = %number, action = ?event.action, "Now tracking PR");
                    Ingestion {
                        outcome: IngestOutcome::Tracked,
                        notification: Some(Notification::Opened(note)),
                    }
                }
                TrackOutcome::Refreshed => {
                    debug!(pr = %number, "PR already tracked; refreshed");
                    Ingestion::silent(IngestOutcome::Refreshed)
                }
                TrackOutcome::SkippedDraft => {
                    debug!(pr = %number, "Ignoring draft PR");
                    Ingestion::silent(IngestOutcome::SkippedDraft)
                }
            }
        }
        PrAction::Closed => {
            if store.remove(number).is_some() {
                info!(pr = %number, merged = event.merged, "PR closed; untracked");
                Ingestion::silent(IngestOutcome::Removed)
            } else {
                debug!(pr = %number, "Close for untracked PR");
                Ingestion::silent(IngestOutcome::Ignored)
            }
        }
        PrAction::ConvertedToDraft => {
            if store.remove(number).is_some() {
                info!(pr = %number, "PR converted to draft; untracked");
                Ingestion::silent(IngestOutcome::Removed)
            } else {
                Ingestion::silent(IngestOutcome::Ignored)
            }
        }
        PrAction::Edited => {
            let applied = store.apply(number, PrUpdate::retitle(event.snapshot.title));
            Ingestion::silent(if applied {
                IngestOutcome::Updated
            } else {
                IngestOutcome::DroppedUnknownPr
            })
        }
        PrAction::Synchronize => match event.snapshot.updated_at {
            Some(at) => {
                let applied = store.apply(number, PrUpdate::activity(at));
                Ingestion::silent(if applied {
                    IngestOutcome::Updated
                } else {
                    IngestOutcome::DroppedUnknownPr
                })
            }
            None => Ingestion::silent(IngestOutcome::Ignored),
        },
    }
}

fn handle_review(event: ReviewEvent, store: &PrStore) -> Ingestion {
    let applied = store.apply(
        event.number,
        PrUpdate::review(event.reviewer.clone(), event.submitted_at),
    );
    if !applied {
        return Ingestion::silent(IngestOutcome::DroppedUnknownPr);
    }
    debug!(pr = %event.number, reviewer = %event.reviewer, "Recorded review");

    // Read back for current identity fields; the entry can only vanish here
    // if a concurrent close won the race, in which case stay quiet.
    let notification = store.get(event.number).map(|pr| {
        Notification::Review(ReviewNotification {
            pr: PrNotification::from(&pr),
            reviewer: event.reviewer,
            state: event.state,
        })
    });
    Ingestion {
        outcome: IngestOutcome::Updated,
        notification,
    }
}

fn handle_comment(event: CommentEvent, store: &PrStore) -> Ingestion {
    let Some(number) = event.number else {
        // Comment on a plain issue.
        return Ingestion::silent(IngestOutcome::Ignored);
    };
    let applied = store.apply(number, PrUpdate::activity(event.commented_at));
    Ingestion::silent(if applied {
        IngestOutcome::Updated
    } else {
        IngestOutcome::DroppedUnknownPr
    })
}

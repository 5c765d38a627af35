//! Periodic reconciliation against GitHub.
//!
//! Webhook deliveries are lossy: GitHub retries only briefly, the process may
//! be down, and events for unknown PRs are deliberately dropped. Reconciliation
//! is the correction mechanism. Each cycle fetches the full open-PR list,
//! removes entries that are no longer open (or are now drafts), and replaces
//! each tracked PR's review state with what GitHub actually reports.
//!
//! Unlike webhook ingestion, which accumulates deltas, reconciliation is
//! authoritative: reviewer sets and counts are overwritten wholesale. Running
//! a cycle twice with no upstream change leaves the store identical.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::github::{GitHubApiError, PrFetcher};
use crate::store::{PrStore, TrackOutcome};
use crate::types::ReviewRecord;

/// Counters from one reconciliation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Open non-draft PRs tracked after this cycle.
    pub tracked: usize,

    /// PRs newly added by this cycle.
    pub added: usize,

    /// Entries removed because the PR is no longer open or is now a draft.
    pub removed: usize,

    /// Open PRs skipped this cycle because their review listing failed.
    pub skipped: usize,
}

/// Reconciles the store against the repository's actual open PRs.
#[derive(Clone)]
pub struct Reconciler {
    store: PrStore,
    fetcher: Arc<dyn PrFetcher>,
}

impl Reconciler {
    pub fn new(store: PrStore, fetcher: Arc<dyn PrFetcher>) -> Self {
        Self { store, fetcher }
    }

    /// Runs one full reconciliation cycle.
    ///
    /// Fails only when the open-PR listing itself fails, in which case the
    /// store is left untouched. A review-listing failure for an individual PR
    /// skips that PR, leaving its prior entry (or absence) intact until the
    /// next successful cycle.
    #[instrument(skip(self))]
    pub async fn sync(&self) -> Result<SyncOutcome, GitHubApiError> {
        let snapshots = self.fetcher.list_open_prs().await?;

        let keep: HashSet<_> = snapshots
            .iter()
            .filter(|s| !s.is_draft)
            .map(|s| s.number)
            .collect();
        let removed = self.store.retain_numbers(&keep);
        for number in &removed {
            debug!(pr = %number, "Untracked during sync; PR no longer open");
        }

        let mut added = 0usize;
        let mut skipped = 0usize;
        for snapshot in snapshots {
            if snapshot.is_draft {
                continue;
            }
            let number = snapshot.number;

            // Reviews come first so that one PR's fetch failure leaves its
            // prior state, or absence, untouched.
            let reviews = match self.fetcher.list_reviews(number).await {
                Ok(reviews) => reviews,
                Err(error) => {
                    warn!(pr = %number, error = %error, "Review listing failed; skipping PR this cycle");
                    skipped += 1;
                    continue;
                }
            };

            if matches!(self.store.track(snapshot), TrackOutcome::Inserted) {
                added += 1;
            }
            let rollup = review_rollup(&reviews);
            self.store.replace_review_state(
                number,
                rollup.reviewers,
                rollup.review_count,
                rollup.last_reviewed_at,
            );
        }

        let outcome = SyncOutcome {
            tracked: self.store.len(),
            added,
            removed: removed.len(),
            skipped,
        };
        info!(
            tracked = outcome.tracked,
            added = outcome.added,
            removed = outcome.removed,
            skipped = outcome.skipped,
            "Reconciliation complete"
        );
        Ok(outcome)
    }
}

struct ReviewRollup {
    reviewers: BTreeSet<String>,
    review_count: u32,
    last_reviewed_at: Option<DateTime<Utc>>,
}

/// Collapses a review listing into the store's per-PR review fields.
fn review_rollup(reviews: &[ReviewRecord]) -> ReviewRollup {
    let mut reviewers = BTreeSet::new();
    let mut last_reviewed_at: Option<DateTime<Utc>> = None;

    for review in reviews {
        reviewers.insert(review.reviewer.clone());
        if last_reviewed_at.map_or(true, |current| review.submitted_at > current) {
            last_reviewed_at = Some(review.submitted_at);
        }
    }

    ReviewRollup {
        reviewers,
        review_count: reviews.len() as u32,
        last_reviewed_at,
    }
}

//! In-memory store of tracked pull requests.
//!
//! The store is the single mutable state shared between webhook ingestion,
//! reconciliation, and the read-only query paths. It is a plain map keyed by
//! PR number behind one process-wide lock: PR counts are small and every
//! operation is a cheap map edit, so a single mutual-exclusion domain is
//! sufficient and per-record locking would buy nothing.
//!
//! Locking rules:
//! - all operations are synchronous; guards never cross an `.await`
//! - network fetches happen before calling in here, never under the lock
//! - readers get a complete write or no write, never a partial one
//!
//! The store is volatile by design. It is rebuilt by reconciliation at
//! startup and periodically thereafter; nothing is persisted.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::types::{PrNumber, PrSnapshot, PrUpdate, TrackedPr};

/// Result of a [`PrStore::track`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// A new entry was created with empty review state.
    Inserted,
    /// An existing entry was refreshed; accumulated review state preserved.
    Refreshed,
    /// The snapshot was a draft: nothing was inserted, and any existing
    /// entry for that number was dropped.
    SkippedDraft,
}

/// Cheaply cloneable handle to the shared PR map.
///
/// Constructed once by the composition root and handed to the server state
/// and the scheduler; tests construct their own.
#[derive(Debug, Clone, Default)]
pub struct PrStore {
    inner: Arc<RwLock<HashMap<PrNumber, TrackedPr>>>,
}

impl PrStore {
    pub fn new() -> Self {
        PrStore::default()
    }

    fn read_map(&self) -> RwLockReadGuard<'_, HashMap<PrNumber, TrackedPr>> {
        // A poisoned lock means a writer panicked mid-edit; the map itself is
        // still structurally valid, so keep serving rather than wedging.
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_map(&self) -> RwLockWriteGuard<'_, HashMap<PrNumber, TrackedPr>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Upserts a PR from an upstream snapshot.
    ///
    /// Existing entries keep their accumulated `review_count`, `reviewers`,
    /// and `last_reviewed_at`; identity and activity fields are refreshed
    /// from the snapshot. Draft snapshots are never stored: the call drops
    /// any existing entry instead, keeping the no-drafts invariant enforced
    /// in one place.
    pub fn track(&self, snapshot: PrSnapshot) -> TrackOutcome {
        let mut map = self.write_map();
        if snapshot.is_draft {
            map.remove(&snapshot.number);
            return TrackOutcome::SkippedDraft;
        }
        match map.get_mut(&snapshot.number) {
            Some(existing) => {
                existing.refresh_from(&snapshot);
                TrackOutcome::Refreshed
            }
            None => {
                map.insert(snapshot.number, TrackedPr::from_snapshot(snapshot));
                TrackOutcome::Inserted
            }
        }
    }

    /// Merges a typed partial update into the entry for `number`.
    ///
    /// Returns false (after a warning) when the number is untracked; the
    /// update is dropped, never queued or retried.
    pub fn apply(&self, number: PrNumber, update: PrUpdate) -> bool {
        let mut map = self.write_map();
        match map.get_mut(&number) {
            Some(pr) => {
                pr.apply(update);
                true
            }
            None => {
                warn!(pr = %number, "Dropping update for untracked PR");
                false
            }
        }
    }

    /// Authoritatively overwrites the review state of an entry.
    ///
    /// Used only by reconciliation, which recomputes these fields from the
    /// full upstream review list. Unlike [`PrStore::apply`], the count here
    /// is a replacement, not a delta.
    pub fn replace_review_state(
        &self,
        number: PrNumber,
        reviewers: BTreeSet<String>,
        review_count: u32,
        last_reviewed_at: Option<DateTime<Utc>>,
    ) -> bool {
        let mut map = self.write_map();
        match map.get_mut(&number) {
            Some(pr) => {
                pr.reviewers = reviewers;
                pr.review_count = review_count;
                pr.last_reviewed_at = last_reviewed_at;
                true
            }
            None => {
                warn!(pr = %number, "Cannot replace review state for untracked PR");
                false
            }
        }
    }

    /// Deletes the entry for `number`, returning it if present.
    ///
    /// Deleting an absent key is a no-op. Removal is final for that PR's
    /// lifetime in the process; a later reopen creates a fresh entry.
    pub fn remove(&self, number: PrNumber) -> Option<TrackedPr> {
        self.write_map().remove(&number)
    }

    /// Drops every entry whose number is not in `keep`, returning the
    /// removed numbers. This is reconciliation's "no longer open" sweep.
    pub fn retain_numbers(&self, keep: &HashSet<PrNumber>) -> Vec<PrNumber> {
        let mut map = self.write_map();
        let removed: Vec<PrNumber> = map
            .keys()
            .filter(|n| !keep.contains(n))
            .copied()
            .collect();
        for number in &removed {
            map.remove(number);
        }
        removed
    }

    /// Returns a copy of the entry for `number`, if tracked.
    pub fn get(&self, number: PrNumber) -> Option<TrackedPr> {
        self.read_map().get(&number).cloned()
    }

    /// Returns a snapshot of all tracked PRs, ordered by PR number.
    ///
    /// The ordering makes downstream output (notifications, summaries,
    /// idempotence comparisons) deterministic.
    pub fn all(&self) -> Vec<TrackedPr> {
        let map = self.read_map();
        let mut prs: Vec<TrackedPr> = map.values().cloned().collect();
        prs.sort_by_key(|pr| pr.number);
        prs
    }

    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_map().is_empty()
    }
}

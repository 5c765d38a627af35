//! Aggregated review metrics.
//!
//! Combines two populations that must not be conflated:
//!
//! - the live store of open PRs (open counts, needing-review, stale,
//!   top contributors by open-PR count), and
//! - a fixed-size sample of recently closed PRs fetched from GitHub
//!   (review/merge durations, reviews per merged PR, top reviewers).
//!
//! A closed PR whose review listing fails is excluded from the review-based
//! figures but still counts toward time-to-merge. Only a failure to list the
//! closed sample itself aborts the computation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::github::{GitHubApiError, PrFetcher};
use crate::queries;
use crate::store::PrStore;
use crate::types::ClosedPr;

/// How many recently closed PRs feed the historical figures.
pub const CLOSED_SAMPLE_SIZE: usize = 50;

/// Entries per leaderboard.
const LEADERBOARD_SIZE: usize = 5;

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub login: String,
    pub count: usize,
}

/// The full metrics report served to the operational surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Open non-draft PRs currently tracked.
    pub total_open: usize,

    /// Tracked PRs with no review activity at all.
    pub needs_review: usize,

    /// Tracked PRs past the staleness threshold.
    pub stale: usize,

    /// Mean time from open to first review over the closed sample,
    /// tier-formatted ("<1h", "5h", "2d"), or "n/a" with no data.
    pub avg_time_to_first_review: String,

    /// Mean time from open to merge over the closed sample, same format.
    pub avg_time_to_merge: String,

    /// Mean review submissions per merged PR, one decimal.
    pub avg_reviews_per_merged_pr: f64,

    /// Top authors by open-PR count, drawn from the live store.
    pub top_contributors: Vec<LeaderboardEntry>,

    /// Top reviewers by review volume, drawn from the closed sample.
    pub top_reviewers: Vec<LeaderboardEntry>,
}

/// Computes the full report.
///
/// Reads the store once up front; all GitHub calls happen without any lock
/// held. Fails only if the closed-PR listing itself fails.
#[instrument(skip(store, fetcher))]
pub async fn compute(
    store: &PrStore,
    fetcher: &dyn PrFetcher,
    stale_threshold_hours: i64,
    now: DateTime<Utc>,
) -> Result<MetricsReport, GitHubApiError> {
    let open = store.all();
    let total_open = open.len();
    let needs_review = queries::needs_review(&open).len();
    let stale = queries::stale(&open, stale_threshold_hours, now).len();

    let mut contributions: HashMap<String, usize> = HashMap::new();
    for pr in &open {
        *contributions.entry(pr.author.clone()).or_default() += 1;
    }

    let closed = fetcher.list_closed_prs(CLOSED_SAMPLE_SIZE).await?;
    let sample = sample_reviews(fetcher, &closed).await;

    let merge_durations: Vec<f64> = closed
        .iter()
        .filter_map(|pr| pr.merged_at.map(|merged| ms_between(pr.created_at, merged)))
        .collect();

    let mut first_review_durations = Vec::new();
    let mut review_volume: HashMap<String, usize> = HashMap::new();
    let mut merged_review_total = 0usize;
    let mut merged_with_reviews_known = 0usize;

    for (pr, reviews) in &sample {
        if let Some(first) = reviews.iter().map(|r| r.submitted_at).min() {
            first_review_durations.push(ms_between(pr.created_at, first));
        }
        for review in reviews {
            *review_volume.entry(review.reviewer.clone()).or_default() += 1;
        }
        if pr.is_merged() {
            merged_review_total += reviews.len();
            merged_with_reviews_known += 1;
        }
    }

    let avg_reviews_per_merged_pr = if merged_with_reviews_known == 0 {
        0.0
    } else {
        round_to_tenth(merged_review_total as f64 / merged_with_reviews_known as f64)
    };

    debug!(
        sampled = closed.len(),
        with_reviews = sample.len(),
        merged = merge_durations.len(),
        "Computed metrics over closed sample"
    );

    Ok(MetricsReport {
        total_open,
        needs_review,
        stale,
        avg_time_to_first_review: format_mean(&first_review_durations),
        avg_time_to_merge: format_mean(&merge_durations),
        avg_reviews_per_merged_pr,
        top_contributors: top_n(contributions, LEADERBOARD_SIZE),
        top_reviewers: top_n(review_volume, LEADERBOARD_SIZE),
    })
}

/// Fetches reviews for each sampled PR, dropping PRs whose listing fails.
async fn sample_reviews(
    fetcher: &dyn PrFetcher,
    closed: &[ClosedPr],
) -> Vec<(ClosedPr, Vec<crate::types::ReviewRecord>)> {
    let mut sample = Vec::with_capacity(closed.len());
    for pr in closed {
        match fetcher.list_reviews(pr.number).await {
            Ok(reviews) => sample.push((pr.clone(), reviews)),
            Err(error) => {
                warn!(pr = %pr.number, error = %error, "Review listing failed; excluding PR from review figures");
            }
        }
    }
    sample
}

fn ms_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64
}

/// Tier-formats the mean of a set of durations, "n/a" when empty.
fn format_mean(durations_ms: &[f64]) -> String {
    if durations_ms.is_empty() {
        return "n/a".to_string();
    }
    let mean = durations_ms.iter().sum::<f64>() / durations_ms.len() as f64;
    queries::format_mean_duration_ms(mean)
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Ranks by count descending, ties broken by login, truncated to `n`.
fn top_n(counts: HashMap<String, usize>, n: usize) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = counts
        .into_iter()
        .map(|(login, count)| LeaderboardEntry { login, count })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.login.cmp(&b.login)));
    entries.truncate(n);
    entries
}

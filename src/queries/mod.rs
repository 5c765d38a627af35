//! Read-only views over the tracked PR set.
//!
//! Everything here is a pure function over a store snapshot plus an explicit
//! clock, so staleness logic can be tested without a live store or a real
//! wall clock.

use chrono::{DateTime, Duration, Utc};

use crate::types::TrackedPr;

/// Milliseconds per hour, for converting metric means into age tiers.
const MS_PER_HOUR: f64 = 3_600_000.0;

/// Returns every PR with no recorded review activity.
///
/// A PR qualifies when its cumulative review count is zero or it has no
/// last-review timestamp; between reconciliations the two can disagree
/// briefly, and either one missing means nobody has looked yet.
pub fn needs_review(prs: &[TrackedPr]) -> Vec<&TrackedPr> {
    prs.iter()
        .filter(|pr| pr.review_count == 0 || pr.last_reviewed_at.is_none())
        .collect()
}

/// Returns every PR that is past the age threshold and has not been
/// reviewed within that same threshold window.
///
/// Both conditions must hold: a brand-new PR is not stale no matter how
/// unreviewed, and an old PR freshly reviewed is not stale either. A PR
/// reviewed once long ago goes stale again when that review itself ages
/// past the threshold; staleness tracks time since last attention, gated
/// by a minimum PR age.
pub fn stale(prs: &[TrackedPr], threshold_hours: i64, now: DateTime<Utc>) -> Vec<&TrackedPr> {
    let threshold = Duration::hours(threshold_hours);
    prs.iter()
        .filter(|pr| {
            let old_enough = now - pr.created_at > threshold;
            let unattended = match pr.last_reviewed_at {
                Some(reviewed_at) => now - reviewed_at > threshold,
                None => true,
            };
            old_enough && unattended
        })
        .collect()
}

/// Age and duration tiers share their boundaries: under an hour, whole
/// hours up to a day, then whole days (integer floor).
enum Tier {
    UnderAnHour,
    Hours(i64),
    Days(i64),
}

fn tier_for_hours(hours: i64) -> Tier {
    if hours < 1 {
        Tier::UnderAnHour
    } else if hours < 24 {
        Tier::Hours(hours)
    } else {
        Tier::Days(hours / 24)
    }
}

/// Formats a PR age in whole hours for human consumption.
pub fn format_age(hours: i64) -> String {
    match tier_for_hours(hours) {
        Tier::UnderAnHour => "just opened".to_string(),
        Tier::Hours(h) => format!("{h}h old"),
        Tier::Days(d) => format!("{d}d old"),
    }
}

/// Formats the age of a tracked PR at the given clock.
pub fn format_age_of(pr: &TrackedPr, now: DateTime<Utc>) -> String {
    format_age(pr.age_hours(now))
}

/// Formats a mean duration in milliseconds with the same tier boundaries
/// as [`format_age`].
///
/// Means are durations, not ages, so the sub-hour tier renders as "<1h"
/// rather than "just opened".
pub fn format_mean_duration_ms(ms: f64) -> String {
    let hours = (ms / MS_PER_HOUR).floor() as i64;
    match tier_for_hours(hours) {
        Tier::UnderAnHour => "<1h".to_string(),
        Tier::Hours(h) => format!("{h}h"),
        Tier::Days(d) => format!("{d}d"),
    }
}

//! Notification payloads and delivery.
//!
//! Notifications are data first: ingestion and the scheduler produce
//! [`Notification`] values, and a [`Notifier`] implementation delivers them.
//! Delivery is strictly best-effort; failures are logged and never propagated
//! back into tracking state.

mod slack;

pub use slack::SlackNotifier;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::types::{PrNumber, TrackedPr};
use crate::webhooks::events::ReviewState;

/// The PR identity fields every notification carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrNotification {
    pub number: PrNumber,
    pub title: String,
    pub url: String,
    pub author: String,
}

impl From<&TrackedPr> for PrNotification {
    fn from(pr: &TrackedPr) -> Self {
        PrNotification {
            number: pr.number,
            title: pr.title.clone(),
            url: pr.url.clone(),
            author: pr.author.clone(),
        }
    }
}

/// A review was submitted on a tracked PR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewNotification {
    pub pr: PrNotification,
    pub reviewer: String,
    pub state: ReviewState,
}

/// A tracked PR crossed the staleness threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleNotification {
    pub pr: PrNotification,
    /// Pre-rendered age string ("2d old", ...).
    pub age: String,
    pub review_count: u32,
}

/// Periodic roll-up of tracker state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    pub total_open: usize,
    pub needs_review: usize,
    pub stale: usize,
    /// Pre-rendered mean ("3h", "<1h", ...).
    pub avg_review_time: String,
}

/// Everything the tracker can say to the notification channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    Opened(PrNotification),
    Review(ReviewNotification),
    Stale(StaleNotification),
    Summary(DailySummary),
}

/// Errors surfaced by a notifier backend.
///
/// Callers log these and move on; see [`send_best_effort`].
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("notification channel answered HTTP {0}")]
    Status(u16),
}

/// Delivery backend for notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, note: Notification) -> Result<(), NotifyError>;
}

/// A notifier that drops everything, used when no channel is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, _note: Notification) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Sends a notification, absorbing any failure with a warning.
///
/// The rest of the crate delivers through this helper rather than calling
/// [`Notifier::send`] directly.
pub async fn send_best_effort(notifier: &dyn Notifier, note: Notification) {
    if let Err(e) = notifier.send(note).await {
        warn!(error = %e, "Failed to deliver notification");
    }
}

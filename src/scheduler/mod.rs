//! Periodic background jobs.
//!
//! One task drives three independent cadences over the shared store:
//! reconciliation syncs, stale-PR sweeps, and the daily summary. The store
//! starts empty on boot, so the first reconciliation runs immediately instead
//! of waiting out an interval. A failed cycle is logged and the next tick
//! proceeds normally.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::config::Config;
use crate::github::PrFetcher;
use crate::metrics;
use crate::notify::{
    send_best_effort, DailySummary, Notification, Notifier, PrNotification, StaleNotification,
};
use crate::queries;
use crate::reconcile::Reconciler;
use crate::store::PrStore;

/// Owns the periodic job loop.
pub struct Scheduler {
    store: PrStore,
    fetcher: Arc<dyn PrFetcher>,
    notifier: Arc<dyn Notifier>,
    reconciler: Reconciler,
    config: Config,
}

impl Scheduler {
    pub fn new(
        store: PrStore,
        fetcher: Arc<dyn PrFetcher>,
        notifier: Arc<dyn Notifier>,
        config: Config,
    ) -> Self {
        let reconciler = Reconciler::new(store.clone(), fetcher.clone());
        Scheduler {
            store,
            fetcher,
            notifier,
            reconciler,
            config,
        }
    }

    /// Runs until the shutdown token fires.
    #[instrument(skip(self, shutdown), fields(repo = %self.config.repo))]
    pub async fn run(self, shutdown: CancellationToken) {
        info!("Scheduler started");

        self.run_sync().await;

        let mut sync_ticks = tokio::time::interval(self.config.sync_interval_with_jitter());
        let mut stale_ticks = tokio::time::interval(self.config.stale_check_interval);
        let mut summary_ticks = tokio::time::interval(self.config.summary_interval);
        for ticks in [&mut sync_ticks, &mut stale_ticks, &mut summary_ticks] {
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // An interval's first tick completes immediately; the boot sync
            // above already covered it.
            ticks.reset();
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received, stopping scheduler");
                    break;
                }
                _ = sync_ticks.tick() => self.run_sync().await,
                _ = stale_ticks.tick() => self.run_stale_check().await,
                _ = summary_ticks.tick() => self.run_summary().await,
            }
        }

        info!("Scheduler stopped");
    }

    async fn run_sync(&self) {
        if let Err(error) = self.reconciler.sync().await {
            error!(error = %error, "Reconciliation cycle failed");
        }
    }

    async fn run_stale_check(&self) {
        let flagged = stale_sweep(
            &self.store,
            self.notifier.as_ref(),
            self.config.stale_threshold_hours,
            Utc::now(),
        )
        .await;
        if flagged > 0 {
            info!(stale = flagged, "Stale sweep complete");
        }
    }

    async fn run_summary(&self) {
        let report = match metrics::compute(
            &self.store,
            self.fetcher.as_ref(),
            self.config.stale_threshold_hours,
            Utc::now(),
        )
        .await
        {
            Ok(report) => report,
            Err(error) => {
                error!(error = %error, "Summary metrics failed; skipping this cycle");
                return;
            }
        };

        let note = Notification::Summary(DailySummary {
            total_open: report.total_open,
            needs_review: report.needs_review,
            stale: report.stale,
            avg_review_time: report.avg_time_to_first_review,
        });
        send_best_effort(self.notifier.as_ref(), note).await;
    }
}

/// Flags every stale PR and sends a notification for each.
///
/// Shared by the scheduled sweep and the manual trigger endpoint. Returns the
/// number of stale PRs found; delivery failures do not reduce it.
pub async fn stale_sweep(
    store: &PrStore,
    notifier: &dyn Notifier,
    threshold_hours: i64,
    now: DateTime<Utc>,
) -> usize {
    let all = store.all();
    let stale = queries::stale(&all, threshold_hours, now);
    let flagged = stale.len();

    for pr in stale {
        let note = Notification::Stale(StaleNotification {
            pr: PrNotification::from(pr),
            age: queries::format_age_of(pr, now),
            review_count: pr.review_count,
        });
        send_best_effort(notifier, note).await;
    }

    flagged
}

//! Review Radar - a PR review-lifecycle tracker for a single GitHub repository.
//!
//! Keeps an in-memory picture of every open, non-draft pull request, fed by
//! GitHub webhooks and corrected by periodic reconciliation against the REST
//! API. On top of that picture it answers staleness queries, aggregates
//! review metrics, and pushes Slack notifications.

pub mod config;
pub mod github;
pub mod metrics;
pub mod notify;
pub mod queries;
pub mod reconcile;
pub mod scheduler;
pub mod server;
pub mod store;
pub mod types;
pub mod webhooks;

#[cfg(test)]
pub(crate) mod test_utils;

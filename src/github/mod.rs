//! GitHub API client for listing PRs and reviews via octocrab.
//!
//! Key features:
//! - Exponential backoff retry for transient failures
//! - Distinguishes transient vs permanent errors
//! - `PrFetcher` trait so reconciliation and metrics can run against fakes

mod client;
mod error;
mod fetch;
mod retry;

pub use client::OctocrabClient;
pub use error::{GitHubApiError, GitHubErrorKind};
pub use fetch::PrFetcher;
pub use retry::{retry_with_backoff, RetryConfig};

//! PR and review fetching via the GitHub REST API.
//!
//! `PrFetcher` is the seam between reconciliation/metrics and GitHub: the
//! production implementation drives octocrab with retry, while tests swap in
//! fakes. All listings paginate at GitHub's 100-item page cap.

use async_trait::async_trait;
use octocrab::models::pulls;
use tracing::{debug, warn};

use crate::types::{ClosedPr, PrNumber, PrSnapshot, ReviewRecord};

use super::client::OctocrabClient;
use super::error::GitHubApiError;
use super::retry::{retry_with_backoff, RetryConfig};

/// Page size for list endpoints. GitHub caps `per_page` at 100.
const PAGE_SIZE: u8 = 100;

/// Safety limit when paging through closed PRs.
const MAX_CLOSED_PAGES: u32 = 10;

/// Read access to the tracked repository's pull requests.
#[async_trait]
pub trait PrFetcher: Send + Sync {
    /// Lists every open PR in the repository, drafts included.
    async fn list_open_prs(&self) -> Result<Vec<PrSnapshot>, GitHubApiError>;

    /// Lists submitted reviews for one PR, in the order GitHub returns them.
    async fn list_reviews(&self, pr: PrNumber) -> Result<Vec<ReviewRecord>, GitHubApiError>;

    /// Lists recently closed PRs, most recently updated first, up to `limit`.
    async fn list_closed_prs(&self, limit: usize) -> Result<Vec<ClosedPr>, GitHubApiError>;
}

#[async_trait]
impl PrFetcher for OctocrabClient {
    async fn list_open_prs(&self) -> Result<Vec<PrSnapshot>, GitHubApiError> {
        retry_with_backoff(RetryConfig::DEFAULT, || fetch_open_prs(self)).await
    }

    async fn list_reviews(&self, pr: PrNumber) -> Result<Vec<ReviewRecord>, GitHubApiError> {
        retry_with_backoff(RetryConfig::DEFAULT, || fetch_reviews(self, pr)).await
    }

    async fn list_closed_prs(&self, limit: usize) -> Result<Vec<ClosedPr>, GitHubApiError> {
        retry_with_backoff(RetryConfig::DEFAULT, || fetch_closed_prs(self, limit)).await
    }
}

// ─── Listing ──────────────────────────────────────────────────────────────────

async fn fetch_open_prs(client: &OctocrabClient) -> Result<Vec<PrSnapshot>, GitHubApiError> {
    let mut page = 1u32;
    let mut snapshots = Vec::new();

    loop {
        let items = client
            .inner()
            .pulls(client.owner(), client.repo_name())
            .list()
            .state(octocrab::params::State::Open)
            .per_page(PAGE_SIZE)
            .page(page)
            .send()
            .await
            .map_err(GitHubApiError::from_octocrab)?
            .items;
        let last_page = items.len() < PAGE_SIZE as usize;

        snapshots.extend(
            items
                .into_iter()
                .filter_map(|pull| snapshot_from_pull(client, pull)),
        );

        if last_page {
            break;
        }
        page += 1;
    }

    debug!(count = snapshots.len(), "Fetched open PRs");
    Ok(snapshots)
}

async fn fetch_reviews(
    client: &OctocrabClient,
    pr: PrNumber,
) -> Result<Vec<ReviewRecord>, GitHubApiError> {
    let mut page = 1u32;
    let mut records = Vec::new();

    loop {
        let items = client
            .inner()
            .pulls(client.owner(), client.repo_name())
            .list_reviews(pr.0)
            .per_page(PAGE_SIZE)
            .page(page)
            .send()
            .await
            .map_err(GitHubApiError::from_octocrab)?
            .items;
        let last_page = items.len() < PAGE_SIZE as usize;

        // Pending reviews have no submitted_at and carry no signal; they
        // drop out here.
        records.extend(items.into_iter().filter_map(review_from_octocrab));

        if last_page {
            break;
        }
        page += 1;
    }

    debug!(pr = %pr, reviews = records.len(), "Fetched reviews");
    Ok(records)
}

async fn fetch_closed_prs(
    client: &OctocrabClient,
    limit: usize,
) -> Result<Vec<ClosedPr>, GitHubApiError> {
    // GitHub's PR list API cannot sort by close time; most-recently-updated
    // is the closest available ordering for a recency sample.
    let mut page = 1u32;
    let mut sample = Vec::new();

    loop {
        let items = client
            .inner()
            .pulls(client.owner(), client.repo_name())
            .list()
            .state(octocrab::params::State::Closed)
            .sort(octocrab::params::pulls::Sort::Updated)
            .direction(octocrab::params::Direction::Descending)
            .per_page(PAGE_SIZE)
            .page(page)
            .send()
            .await
            .map_err(GitHubApiError::from_octocrab)?
            .items;
        let last_page = items.len() < PAGE_SIZE as usize;

        for pull in items {
            if let Some(closed) = closed_from_pull(pull) {
                sample.push(closed);
                if sample.len() >= limit {
                    return Ok(sample);
                }
            }
        }

        if last_page {
            return Ok(sample);
        }
        if page >= MAX_CLOSED_PAGES {
            warn!(
                pages = page,
                sampled = sample.len(),
                "Hit pagination limit for closed PRs; sample may run short"
            );
            return Ok(sample);
        }
        page += 1;
    }
}

// ─── Conversions ──────────────────────────────────────────────────────────────

fn snapshot_from_pull(client: &OctocrabClient, pull: pulls::PullRequest) -> Option<PrSnapshot> {
    let number = PrNumber(pull.number);
    let Some(created_at) = pull.created_at else {
        warn!(pr = %number, "Skipping PR with no creation timestamp");
        return None;
    };

    let url = pull
        .html_url
        .as_ref()
        .map(|u| u.to_string())
        .unwrap_or_else(|| canonical_pr_url(client.owner(), client.repo_name(), number));

    Some(PrSnapshot {
        number,
        title: pull.title.unwrap_or_default(),
        url,
        author: author_login(pull.user.as_deref().map(|u| u.login.as_str())),
        created_at,
        updated_at: pull.updated_at,
        is_draft: pull.draft.unwrap_or(false),
    })
}

fn review_from_octocrab(review: pulls::Review) -> Option<ReviewRecord> {
    let reviewer = review.user.as_ref().map(|u| u.login.clone())?;
    let submitted_at = review.submitted_at?;
    Some(ReviewRecord {
        reviewer,
        submitted_at,
    })
}

fn closed_from_pull(pull: pulls::PullRequest) -> Option<ClosedPr> {
    let number = PrNumber(pull.number);
    let Some(created_at) = pull.created_at else {
        warn!(pr = %number, "Skipping closed PR with no creation timestamp");
        return None;
    };

    Some(ClosedPr {
        number,
        title: pull.title.unwrap_or_default(),
        created_at,
        merged_at: pull.merged_at,
    })
}

/// GitHub shows deleted accounts as the `ghost` user; fall back to the same
/// login when the author is missing from the payload.
fn author_login(login: Option<&str>) -> String {
    login.unwrap_or("ghost").to_string()
}

fn canonical_pr_url(owner: &str, repo: &str, number: PrNumber) -> String {
    format!("https://github.com/{owner}/{repo}/pull/{}", number.0)
}

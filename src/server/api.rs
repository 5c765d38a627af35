//! Read-side API endpoints.
//!
//! `GET /api/metrics` computes the review metrics report on demand, and
//! `POST /api/stale-check` runs a stale sweep immediately instead of waiting
//! for the next scheduled one.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::AppState;
use crate::github::GitHubApiError;
use crate::metrics::{self, MetricsReport};
use crate::scheduler;

/// Errors that can occur when serving API requests.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The closed-PR sample could not be fetched from GitHub.
    #[error(transparent)]
    GitHub(#[from] GitHubApiError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::GitHub(_) => StatusCode::BAD_GATEWAY,
        };

        (status, self.to_string()).into_response()
    }
}

/// Response body for the manual stale check.
#[derive(Debug, Serialize, Deserialize)]
pub struct StaleCheckResponse {
    /// Number of stale PRs found (each one got a notification).
    pub stale: usize,
}

/// Metrics handler.
///
/// Aggregates the in-memory store with a freshly fetched closed-PR sample.
/// Returns 502 when GitHub cannot supply the sample; the store-only figures
/// are not worth returning with misleading zeroed averages.
pub async fn metrics_handler(
    State(app_state): State<AppState>,
) -> Result<Json<MetricsReport>, ApiError> {
    let report = metrics::compute(
        app_state.store(),
        app_state.fetcher(),
        app_state.stale_threshold_hours(),
        Utc::now(),
    )
    .await?;

    Ok(Json(report))
}

/// Manual stale-check trigger.
///
/// Runs the same sweep the scheduler runs on its timer and reports how many
/// PRs were flagged.
pub async fn stale_check_handler(State(app_state): State<AppState>) -> Json<StaleCheckResponse> {
    let stale = scheduler::stale_sweep(
        app_state.store(),
        app_state.notifier().as_ref(),
        app_state.stale_threshold_hours(),
        Utc::now(),
    )
    .await;

    Json(StaleCheckResponse { stale })
}

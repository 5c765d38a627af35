//! HTTP server for the review tracker.
//!
//! - Accepts webhooks from GitHub, validates signatures, and applies them to
//!   the in-memory store
//! - Serves the aggregated metrics report
//! - Allows triggering a stale check manually
//! - Provides health checks for liveness probes
//!
//! # Endpoints
//!
//! - `POST /webhook` - Accepts GitHub webhook deliveries (returns 202 Accepted)
//! - `GET /api/metrics` - Returns the metrics report as JSON
//! - `POST /api/stale-check` - Runs a stale sweep now and reports the count
//! - `GET /health` - Returns 200 if the server is running

use std::sync::Arc;

pub mod api;
pub mod health;
pub mod webhook;

pub use api::{metrics_handler, stale_check_handler};
pub use health::health_handler;
pub use webhook::webhook_handler;

use crate::github::PrFetcher;
use crate::notify::Notifier;
use crate::store::PrStore;
use crate::types::RepoId;

/// Shared application state.
///
/// Passed to all handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// The live set of open, non-draft PRs.
    store: PrStore,

    /// GitHub client used by the read-side endpoints.
    fetcher: Arc<dyn PrFetcher>,

    /// Notification channel for stale sweeps and webhook-driven alerts.
    notifier: Arc<dyn Notifier>,

    /// The single repository this instance watches.
    repo: RepoId,

    /// Webhook secret for HMAC-SHA256 signature verification.
    webhook_secret: Vec<u8>,

    /// Age threshold for the staleness queries, in hours.
    stale_threshold_hours: i64,
}

impl AppState {
    pub fn new(
        store: PrStore,
        fetcher: Arc<dyn PrFetcher>,
        notifier: Arc<dyn Notifier>,
        repo: RepoId,
        webhook_secret: impl Into<Vec<u8>>,
        stale_threshold_hours: i64,
    ) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                store,
                fetcher,
                notifier,
                repo,
                webhook_secret: webhook_secret.into(),
                stale_threshold_hours,
            }),
        }
    }

    /// Returns the PR store.
    pub fn store(&self) -> &PrStore {
        &self.inner.store
    }

    /// Returns the GitHub fetcher.
    pub fn fetcher(&self) -> &dyn PrFetcher {
        self.inner.fetcher.as_ref()
    }

    /// Returns the notifier.
    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.inner.notifier
    }

    /// Returns the watched repository.
    pub fn repo(&self) -> &RepoId {
        &self.inner.repo
    }

    /// Returns the webhook secret.
    pub fn webhook_secret(&self) -> &[u8] {
        &self.inner.webhook_secret
    }

    /// Returns the staleness threshold in hours.
    pub fn stale_threshold_hours(&self) -> i64 {
        self.inner.stale_threshold_hours
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/api/metrics", get(metrics_handler))
        .route("/api/stale-check", post(stale_check_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}


#[cfg(test)]
mod integration_tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{Duration, Utc};
    use http_body_util::BodyExt;
    use std::collections::HashMap;
    use tower::ServiceExt;

    use crate::metrics::MetricsReport;
    use crate::notify::Notification;
    use crate::server::api::StaleCheckResponse;
    use crate::test_utils::{closed_pr, review, snapshot, ts, FakeFetcher, RecordingNotifier};
    use crate::types::PrNumber;
    use crate::webhooks::sign_payload;

    /// Creates a test app state watching acme/widgets.
    fn test_app_state(secret: &[u8], fetcher: FakeFetcher) -> (AppState, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::new(
            PrStore::new(),
            Arc::new(fetcher),
            notifier.clone(),
            RepoId::new("acme", "widgets"),
            secret.to_vec(),
            24,
        );
        (state, notifier)
    }

    /// Creates a valid webhook request with a proper signature.
    fn create_webhook_request(
        secret: &[u8],
        event_type: &str,
        delivery_id: &str,
        body: &serde_json::Value,
    ) -> Request<Body> {
        let body_bytes = serde_json::to_vec(body).unwrap();
        let signature_header = sign_payload(&body_bytes, secret);

        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .header("x-github-event", event_type)
            .header("x-github-delivery", delivery_id)
            .header("x-hub-signature-256", signature_header)
            .body(Body::from(body_bytes))
            .unwrap()
    }

    /// A pull_request webhook payload for acme/widgets.
    fn pr_payload(action: &str, number: u64) -> serde_json::Value {
        serde_json::json!({
            "action": action,
            "pull_request": {
                "number": number,
                "title": format!("PR {number}"),
                "html_url": format!("https://github.com/acme/widgets/pull/{number}"),
                "user": { "login": "octocat" },
                "created_at": "2024-05-01T12:00:00Z",
                "updated_at": "2024-05-01T12:00:00Z",
                "draft": false
            },
            "repository": { "owner": { "login": "acme" }, "name": "widgets" }
        })
    }

    // ─── Health endpoint ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn health_returns_200() {
        let (state, _) = test_app_state(b"secret", FakeFetcher::default());
        let app = build_router(state);

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"OK");
    }

    // ─── Webhook endpoint ────────────────────────────────────────────────────

    #[tokio::test]
    async fn webhook_opened_tracks_the_pr() {
        let secret = b"test-secret";
        let (state, _) = test_app_state(secret, FakeFetcher::default());
        let app = build_router(state.clone());

        let request = create_webhook_request(
            secret,
            "pull_request",
            "delivery-1",
            &pr_payload("opened", 7),
        );

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let tracked = state.store().get(PrNumber(7)).unwrap();
        assert_eq!(tracked.title, "PR 7");
        assert_eq!(tracked.author, "octocat");
    }

    #[tokio::test]
    async fn webhook_with_wrong_secret_returns_401() {
        let (state, _) = test_app_state(b"correct-secret", FakeFetcher::default());
        let app = build_router(state.clone());

        let request = create_webhook_request(
            b"wrong-secret",
            "pull_request",
            "delivery-2",
            &pr_payload("opened", 7),
        );

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(state.store().is_empty());
    }

    #[tokio::test]
    async fn webhook_missing_event_header_returns_400() {
        let secret = b"test-secret";
        let (state, _) = test_app_state(secret, FakeFetcher::default());
        let app = build_router(state);

        let body_bytes = serde_json::to_vec(&pr_payload("opened", 7)).unwrap();
        let signature_header = sign_payload(&body_bytes, secret);

        // No x-github-event header.
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .header("x-github-delivery", "delivery-3")
            .header("x-hub-signature-256", signature_header)
            .body(Body::from(body_bytes))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn webhook_with_malformed_payload_returns_400() {
        let secret = b"test-secret";
        let (state, _) = test_app_state(secret, FakeFetcher::default());
        let app = build_router(state);

        let body_bytes = b"not json".to_vec();
        let signature_header = sign_payload(&body_bytes, secret);

        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .header("x-github-event", "pull_request")
            .header("x-github-delivery", "delivery-4")
            .header("x-hub-signature-256", signature_header)
            .body(Body::from(body_bytes))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn webhook_for_unwatched_repo_is_accepted_and_dropped() {
        let secret = b"test-secret";
        let (state, _) = test_app_state(secret, FakeFetcher::default());
        let app = build_router(state.clone());

        let mut payload = pr_payload("opened", 7);
        payload["repository"]["owner"]["login"] = serde_json::json!("someone-else");

        let request = create_webhook_request(
            secret,
            "pull_request",
            "delivery-5",
            &payload,
        );

        let response = app.oneshot(request).await.unwrap();

        // 202 so GitHub does not retry, but nothing is tracked.
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(state.store().is_empty());
    }

    #[tokio::test]
    async fn webhook_closed_untracks_the_pr() {
        let secret = b"test-secret";
        let (state, _) = test_app_state(secret, FakeFetcher::default());
        state
            .store()
            .track(snapshot(7, Utc::now() - Duration::hours(2)));
        let app = build_router(state.clone());

        let request = create_webhook_request(
            secret,
            "pull_request",
            "delivery-6",
            &pr_payload("closed", 7),
        );

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(state.store().is_empty());
    }

    #[tokio::test]
    async fn webhook_update_for_untracked_pr_is_dropped() {
        let secret = b"test-secret";
        let (state, _) = test_app_state(secret, FakeFetcher::default());
        let app = build_router(state.clone());

        let request = create_webhook_request(
            secret,
            "pull_request",
            "delivery-7",
            &pr_payload("edited", 99),
        );

        let response = app.oneshot(request).await.unwrap();

        // Updates never insert; the PR stays untracked until opened or synced.
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(state.store().is_empty());
    }

    // ─── Metrics endpoint ────────────────────────────────────────────────────

    #[tokio::test]
    async fn metrics_returns_the_aggregated_report() {
        let opened = 1_600_000_000;
        let fetcher = FakeFetcher {
            closed: vec![closed_pr(10, ts(opened), Some(ts(opened + 4 * 3600)))],
            reviews: HashMap::from([(
                PrNumber(10),
                vec![review("alice", ts(opened + 2 * 3600))],
            )]),
            ..Default::default()
        };
        let (state, _) = test_app_state(b"secret", fetcher);
        state
            .store()
            .track(snapshot(7, Utc::now() - Duration::hours(2)));
        let app = build_router(state);

        let request = Request::builder()
            .uri("/api/metrics")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: MetricsReport = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.total_open, 1);
        assert_eq!(parsed.needs_review, 1);
        assert_eq!(parsed.stale, 0);
        assert_eq!(parsed.avg_time_to_first_review, "2h");
        assert_eq!(parsed.avg_time_to_merge, "4h");
        assert_eq!(parsed.avg_reviews_per_merged_pr, 1.0);
        assert_eq!(parsed.top_contributors[0].login, "octocat");
        assert_eq!(parsed.top_reviewers[0].login, "alice");
    }

    #[tokio::test]
    async fn metrics_maps_github_failure_to_502() {
        let fetcher = FakeFetcher {
            fail_closed_listing: true,
            ..Default::default()
        };
        let (state, _) = test_app_state(b"secret", fetcher);
        let app = build_router(state);

        let request = Request::builder()
            .uri("/api/metrics")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    // ─── Stale-check endpoint ────────────────────────────────────────────────

    #[tokio::test]
    async fn stale_check_flags_and_notifies() {
        let (state, notifier) = test_app_state(b"secret", FakeFetcher::default());
        state
            .store()
            .track(snapshot(1, Utc::now() - Duration::hours(30)));
        state
            .store()
            .track(snapshot(2, Utc::now() - Duration::hours(1)));
        let app = build_router(state);

        let request = Request::builder()
            .method("POST")
            .uri("/api/stale-check")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: StaleCheckResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.stale, 1);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(matches!(sent[0], Notification::Stale(_)));
    }
}

//! Liveness probe.

use axum::http::StatusCode;

/// `GET /health`. The store is in-memory and always reachable, so being able
/// to answer at all is the whole check.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

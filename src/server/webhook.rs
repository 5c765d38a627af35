//! Webhook intake endpoint.
//!
//! `POST /webhook` verifies each GitHub delivery, parses it, and applies it
//! to the store before answering 202. Any notification the event produced is
//! delivered on a spawned task so the response never waits on Slack.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::AppState;
use crate::notify::send_best_effort;
use crate::webhooks::{handle_event, parse_webhook, verify_signature, ParseError};

/// Rejections for a webhook delivery.
///
/// 400s mean GitHub (or whoever is posting) sent something unusable; 401
/// means the shared secret does not match. GitHub retries none of these.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] ParseError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
            WebhookError::MissingHeader(_) | WebhookError::InvalidPayload(_) => {
                StatusCode::BAD_REQUEST
            }
        };
        (status, self.to_string()).into_response()
    }
}

/// The three headers GitHub attaches to every delivery.
#[derive(Debug)]
struct Delivery {
    event_type: String,
    delivery_id: String,
    signature: String,
}

impl Delivery {
    fn from_headers(headers: &HeaderMap) -> Result<Self, WebhookError> {
        let require = |name: &'static str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
                .ok_or(WebhookError::MissingHeader(name))
        };
        Ok(Delivery {
            event_type: require("x-github-event")?,
            delivery_id: require("x-github-delivery")?,
            signature: require("x-hub-signature-256")?,
        })
    }
}

/// Applies one GitHub webhook delivery to the tracker.
///
/// Answers 202 for everything that authenticates, including event types and
/// repositories the tracker ignores; anything else would make GitHub retry
/// deliveries that will never be wanted.
pub async fn webhook_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), WebhookError> {
    let delivery = Delivery::from_headers(&headers)?;
    debug!(
        delivery_id = %delivery.delivery_id,
        event_type = %delivery.event_type,
        "Received webhook"
    );

    // Authenticate before parsing; unverified bodies get no further work.
    if !verify_signature(&body, &delivery.signature, app_state.webhook_secret()) {
        warn!(delivery_id = %delivery.delivery_id, "Invalid webhook signature");
        return Err(WebhookError::InvalidSignature);
    }

    let Some(event) = parse_webhook(&delivery.event_type, &body)? else {
        debug!(
            delivery_id = %delivery.delivery_id,
            event_type = %delivery.event_type,
            "Ignoring irrelevant event"
        );
        return Ok((StatusCode::ACCEPTED, "Accepted (ignored)"));
    };

    if event.repo_id() != app_state.repo() {
        debug!(
            delivery_id = %delivery.delivery_id,
            repo = %event.repo_id(),
            "Dropping event for unwatched repository"
        );
        return Ok((StatusCode::ACCEPTED, "Accepted (ignored)"));
    }

    let ingestion = handle_event(event, app_state.store());
    info!(
        delivery_id = %delivery.delivery_id,
        event_type = %delivery.event_type,
        outcome = ?ingestion.outcome,
        "Webhook applied"
    );

    if let Some(note) = ingestion.notification {
        let notifier = app_state.notifier().clone();
        tokio::spawn(async move {
            send_best_effort(notifier.as_ref(), note).await;
        });
    }

    Ok((StatusCode::ACCEPTED, "Accepted"))
}

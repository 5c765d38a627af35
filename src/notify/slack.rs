//! Slack incoming-webhook notifier.
//!
//! Renders each notification as a single mrkdwn text message and posts it to
//! the configured webhook URL. Slack answers non-2xx for bad payloads or
//! revoked URLs; those surface as [`NotifyError::Status`] and are absorbed by
//! the caller's best-effort policy.

use async_trait::async_trait;
use serde_json::json;

use super::{Notification, Notifier, NotifyError};

/// Posts notifications to a Slack incoming webhook.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    http: reqwest::Client,
    webhook_url: String,
}

impl SlackNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        SlackNotifier {
            http: reqwest::Client::new(),
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, note: Notification) -> Result<(), NotifyError> {
        let body = json!({ "text": render_text(&note) });
        let response = self
            .http
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Renders a notification as Slack mrkdwn.
fn render_text(note: &Notification) -> String {
    match note {
        Notification::Opened(pr) => format!(
            "New PR {} by {}: <{}|{}>",
            pr.number, pr.author, pr.url, pr.title
        ),
        Notification::Review(r) => format!(
            "{} {} PR {}: <{}|{}>",
            r.reviewer,
            r.state.label(),
            r.pr.number,
            r.pr.url,
            r.pr.title
        ),
        Notification::Stale(s) => format!(
            "Stale: PR {} by {} is {} with {} reviews: <{}|{}>",
            s.pr.number, s.pr.author, s.age, s.review_count, s.pr.url, s.pr.title
        ),
        Notification::Summary(s) => format!(
            "Daily review summary\n\
             - Open PRs: {}\n\
             - Needing review: {}\n\
             - Stale: {}\n\
             - Avg time to first review: {}",
            s.total_open, s.needs_review, s.stale, s.avg_review_time
        ),
    }
}

//! Webhook notifier for matched markets.

use crate::error::{TranscriptError, TranscriptResult};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers match notifications to a configured webhook.
///
/// Delivery is fire-and-forget: failures are logged and never surfaced to
/// the caller. With no webhook configured every send is a no-op.
pub struct Notifier {
    client: Client,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> TranscriptResult<Self> {
        let client = Client::builder()
            .timeout(NOTIFY_TIMEOUT)
            .build()
            .map_err(|e| TranscriptError::HttpClient(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            webhook_url,
        })
    }

    /// Post a plain-text notification to the webhook, if one is configured.
    pub async fn send(&self, text: &str) {
        let Some(url) = &self.webhook_url else {
            debug!("No webhook configured, skipping notification");
            return;
        };

        let result = self
            .client
            .post(url)
            .json(&json!({ "text": text }))
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Notification delivered");
            }
            Ok(response) => {
                warn!(status = %response.status(), "Webhook rejected notification");
            }
            Err(e) => {
                warn!(error = %e, "Failed to deliver notification");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_without_webhook_is_noop() {
        let notifier = Notifier::new(None).unwrap();
        notifier.send("matched something").await;
    }

    #[tokio::test]
    async fn test_send_failure_does_not_panic() {
        // Unroutable local port; delivery fails and is swallowed.
        let notifier = Notifier::new(Some("http://127.0.0.1:1/hook".to_string())).unwrap();
        notifier.send("matched something").await;
    }
}

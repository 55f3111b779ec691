use std::time::Duration;

use tracing::debug;

use cadence_core::workflow::{NotificationEmitter, StepNotification};
use cadence_core::{CadenceError, Result};

/// Posts each notification as JSON to a fixed URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    url: String,
    http_client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CadenceError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            http_client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl NotificationEmitter for WebhookNotifier {
    async fn emit(&self, notification: &StepNotification) -> Result<()> {
        let response = self
            .http_client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| CadenceError::Notification(format!("Webhook request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CadenceError::Notification(format!(
                "Webhook {} answered {}",
                self.url, status
            )));
        }

        debug!(url = %self.url, step_id = %notification.step_id, "Webhook delivered");
        Ok(())
    }
}

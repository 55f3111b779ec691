//! Notification emitters.

mod log;
mod webhook;

pub use log::LogNotifier;
pub use webhook::WebhookNotifier;

use cadence_core::config::{NotificationsConfig, NotifierKind};
use cadence_core::workflow::{NotificationEmitter, StepNotification};
use cadence_core::{CadenceError, Result};

/// Notifier selected from configuration at startup.
#[derive(Debug, Clone)]
pub enum NotifierBackend {
    Log(LogNotifier),
    Webhook(WebhookNotifier),
}

impl NotifierBackend {
    pub fn from_config(config: &NotificationsConfig) -> Result<Self> {
        match config.backend {
            NotifierKind::Log => Ok(Self::Log(LogNotifier::new())),
            NotifierKind::Webhook => {
                let url = config.webhook_url.as_deref().ok_or_else(|| {
                    CadenceError::Config("notifications.webhook_url is not set".into())
                })?;
                Ok(Self::Webhook(WebhookNotifier::new(url, config.timeout_secs)?))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Log(_) => "log",
            Self::Webhook(_) => "webhook",
        }
    }
}

impl NotificationEmitter for NotifierBackend {
    async fn emit(&self, notification: &StepNotification) -> Result<()> {
        match self {
            Self::Log(n) => n.emit(notification).await,
            Self::Webhook(n) => n.emit(notification).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backend_is_log() {
        let backend = NotifierBackend::from_config(&NotificationsConfig::default()).unwrap();
        assert_eq!(backend.name(), "log");
    }

    #[test]
    fn test_webhook_requires_url() {
        let config = NotificationsConfig {
            backend: NotifierKind::Webhook,
            webhook_url: None,
            ..Default::default()
        };
        let err = NotifierBackend::from_config(&config).unwrap_err();
        assert!(matches!(err, CadenceError::Config(_)));
    }

    #[test]
    fn test_webhook_from_config() {
        let config = NotificationsConfig {
            backend: NotifierKind::Webhook,
            webhook_url: Some("http://localhost:9000/hooks/cadence".into()),
            ..Default::default()
        };
        let backend = NotifierBackend::from_config(&config).unwrap();
        assert_eq!(backend.name(), "webhook");
    }
}

use tracing::info;

use cadence_core::workflow::{NotificationEmitter, StepNotification};
use cadence_core::Result;

/// Writes each notification as a structured log event.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl NotificationEmitter for LogNotifier {
    async fn emit(&self, notification: &StepNotification) -> Result<()> {
        info!(
            instance_id = %notification.instance_id,
            step_id = %notification.step_id,
            kind = ?notification.kind,
            scheduled_for = ?notification.scheduled_for,
            automatable = notification.automatable,
            "{}: {}",
            notification.title,
            notification.message
        );
        Ok(())
    }
}

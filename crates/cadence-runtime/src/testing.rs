//! Test doubles for the engine's collaborators.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;

use cadence_core::workflow::{
    InstanceStore, NotificationEmitter, StepNotification, WorkflowInstance,
};
use cadence_core::{CadenceError, Result};

use crate::store::InMemoryInstanceStore;

/// Keeps every notification it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<StepNotification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the notifications received so far.
    pub fn notifications(&self) -> Vec<StepNotification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NotificationEmitter for RecordingNotifier {
    async fn emit(&self, notification: &StepNotification) -> Result<()> {
        self.sent
            .lock()
            .map_err(|_| CadenceError::Internal("notification log poisoned".into()))?
            .push(notification.clone());
        Ok(())
    }
}

/// Rejects every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingNotifier;

impl NotificationEmitter for FailingNotifier {
    async fn emit(&self, _notification: &StepNotification) -> Result<()> {
        Err(CadenceError::Notification("notifier unavailable".into()))
    }
}

/// Records notifications after holding each one for `delay`.
#[derive(Debug, Clone)]
pub struct SlowNotifier {
    delay: Duration,
    inner: RecordingNotifier,
}

impl SlowNotifier {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: RecordingNotifier::new(),
        }
    }

    /// Notifications that finished their delay.
    pub fn delivered(&self) -> &RecordingNotifier {
        &self.inner
    }
}

impl NotificationEmitter for SlowNotifier {
    async fn emit(&self, notification: &StepNotification) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.emit(notification).await
    }
}

/// In-memory store whose writes fail for selected instances.
#[derive(Debug, Clone, Default)]
pub struct FailingStore {
    inner: InMemoryInstanceStore,
    failing: Arc<Mutex<HashSet<Uuid>>>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent save of `id` fail with a persistence error.
    pub fn fail_saves_for(&self, id: Uuid) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(id);
        }
    }

    /// Let saves of `id` through again.
    pub fn heal(&self, id: Uuid) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.remove(&id);
        }
    }

    fn is_failing(&self, id: Uuid) -> bool {
        self.failing
            .lock()
            .map(|f| f.contains(&id))
            .unwrap_or(false)
    }
}

impl InstanceStore for FailingStore {
    async fn save(&self, instance: &WorkflowInstance) -> Result<()> {
        if self.is_failing(instance.id) {
            return Err(CadenceError::Persistence(format!(
                "write of workflow instance {} refused",
                instance.id
            )));
        }
        self.inner.save(instance).await
    }

    async fn load(&self, id: Uuid) -> Result<WorkflowInstance> {
        self.inner.load(id).await
    }

    async fn list_all(&self) -> Result<Vec<WorkflowInstance>> {
        self.inner.list_all().await
    }

    async fn list_active(&self) -> Result<Vec<WorkflowInstance>> {
        self.inner.list_active().await
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use cadence_core::workflow::{InstanceStatus, InstanceStore, WorkflowInstance};
use cadence_core::{CadenceError, Result};

/// Process-local instance store.
///
/// Cheap to clone; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInstanceStore {
    instances: Arc<RwLock<HashMap<Uuid, WorkflowInstance>>>,
}

impl InMemoryInstanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored instances.
    pub async fn len(&self) -> usize {
        self.instances.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.instances.read().await.is_empty()
    }
}

impl InstanceStore for InMemoryInstanceStore {
    async fn save(&self, instance: &WorkflowInstance) -> Result<()> {
        let mut instances = self.instances.write().await;

        let stored_version = instances.get(&instance.id).map(|i| i.version).unwrap_or(0);
        if stored_version + 1 != instance.version {
            return Err(CadenceError::Conflict(format!(
                "workflow instance {} is at version {}, write expected {}",
                instance.id,
                stored_version,
                instance.version.saturating_sub(1)
            )));
        }

        instances.insert(instance.id, instance.clone());
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<WorkflowInstance> {
        self.instances
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| CadenceError::NotFound(format!("workflow instance {}", id)))
    }

    async fn list_all(&self) -> Result<Vec<WorkflowInstance>> {
        let mut all: Vec<WorkflowInstance> =
            self.instances.read().await.values().cloned().collect();
        all.sort_by_key(|i| i.created_at);
        Ok(all)
    }

    async fn list_active(&self) -> Result<Vec<WorkflowInstance>> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|i| i.status == InstanceStatus::Active)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::workflow::ProcessKind;
    use chrono::{NaiveDate, Utc};

    fn instance() -> WorkflowInstance {
        WorkflowInstance::from_template(
            "exam-1",
            "History",
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            ProcessKind::ExamResult,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = InMemoryInstanceStore::new();
        let mut inst = instance();
        inst.touch(Utc::now());
        store.save(&inst).await.unwrap();

        let loaded = store.load(inst.id).await.unwrap();
        assert_eq!(loaded, inst);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_load_unknown() {
        let store = InMemoryInstanceStore::new();
        let err = store.load(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, CadenceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stale_write_conflicts() {
        let store = InMemoryInstanceStore::new();
        let mut inst = instance();
        inst.touch(Utc::now());
        store.save(&inst).await.unwrap();

        let mut first = inst.clone();
        let mut second = inst.clone();
        first.touch(Utc::now());
        second.touch(Utc::now());

        store.save(&first).await.unwrap();
        let err = store.save(&second).await.unwrap_err();
        assert!(matches!(err, CadenceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_active_filters() {
        let store = InMemoryInstanceStore::new();
        let mut active = instance();
        active.touch(Utc::now());
        let mut paused = instance();
        paused.pause().unwrap();
        paused.touch(Utc::now());

        store.save(&active).await.unwrap();
        store.save(&paused).await.unwrap();

        assert_eq!(store.list_all().await.unwrap().len(), 2);
        let listed = store.list_active().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, active.id);
    }
}

//! Instance store implementations.

mod memory;
mod postgres;

pub use memory::InMemoryInstanceStore;
pub use postgres::PgInstanceStore;

use uuid::Uuid;

use cadence_core::workflow::{InstanceStore, WorkflowInstance};
use cadence_core::Result;

/// Store selected from configuration at startup.
#[derive(Clone)]
pub enum StoreBackend {
    Memory(InMemoryInstanceStore),
    Postgres(PgInstanceStore),
}

impl StoreBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }
}

impl InstanceStore for StoreBackend {
    async fn save(&self, instance: &WorkflowInstance) -> Result<()> {
        match self {
            Self::Memory(s) => s.save(instance).await,
            Self::Postgres(s) => s.save(instance).await,
        }
    }

    async fn load(&self, id: Uuid) -> Result<WorkflowInstance> {
        match self {
            Self::Memory(s) => s.load(id).await,
            Self::Postgres(s) => s.load(id).await,
        }
    }

    async fn list_all(&self) -> Result<Vec<WorkflowInstance>> {
        match self {
            Self::Memory(s) => s.list_all().await,
            Self::Postgres(s) => s.list_all().await,
        }
    }

    async fn list_active(&self) -> Result<Vec<WorkflowInstance>> {
        match self {
            Self::Memory(s) => s.list_active().await,
            Self::Postgres(s) => s.list_active().await,
        }
    }
}

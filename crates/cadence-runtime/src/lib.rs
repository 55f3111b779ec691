//! Async runtime of the cadence workflow engine: the engine itself, its
//! store and notifier adapters, the sweep scheduler and the HTTP gateway.

pub mod db;
pub mod engine;
pub mod gateway;
pub mod migrations;
pub mod notify;
pub mod observability;
pub mod scheduler;
pub mod store;
pub mod testing;

pub use db::Database;
pub use engine::WorkflowEngine;
pub use gateway::{ApiError, ApiResponse, GatewayServer};
pub use migrations::{Migration, MigrationRunner};
pub use notify::{LogNotifier, NotifierBackend, WebhookNotifier};
pub use observability::init_logging;
pub use scheduler::{SweepRunner, SweepRunnerConfig};
pub use store::{InMemoryInstanceStore, PgInstanceStore, StoreBackend};

/// Engine over the runtime-selected store and notifier.
pub type Engine = WorkflowEngine<StoreBackend, NotifierBackend>;

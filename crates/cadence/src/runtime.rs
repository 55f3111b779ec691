use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use cadence_core::config::{CadenceConfig, StoreBackendKind};
use cadence_core::{CadenceError, Result};
use cadence_runtime::{
    Database, Engine, GatewayServer, InMemoryInstanceStore, MigrationRunner, NotifierBackend,
    PgInstanceStore, StoreBackend, SweepRunner, SweepRunnerConfig, WorkflowEngine,
};

/// Assemble the engine described by `config`.
///
/// The postgres backend connects and applies pending migrations first.
pub async fn build_engine(config: &CadenceConfig) -> Result<Engine> {
    let store = match config.store.backend {
        StoreBackendKind::Memory => StoreBackend::Memory(InMemoryInstanceStore::new()),
        StoreBackendKind::Postgres => {
            let db = Database::from_config(&config.database).await?;
            db.health_check().await?;
            MigrationRunner::new(db.pool().clone()).run().await?;
            tracing::info!("Migrations completed");
            StoreBackend::Postgres(PgInstanceStore::new(db.pool().clone()))
        }
    };
    let notifier = NotifierBackend::from_config(&config.notifications)?;

    tracing::debug!(
        store = store.name(),
        notifier = notifier.name(),
        timezone = %config.engine.timezone,
        "Engine assembled"
    );

    Ok(WorkflowEngine::new(store, notifier)
        .with_timezone(config.engine.timezone()?)
        .with_overdue_policy(config.scheduler.overdue_policy))
}

/// The long-running cadence service: gateway plus sweep runner.
pub struct Cadence {
    config: CadenceConfig,
    shutdown: CancellationToken,
}

impl Cadence {
    pub fn builder() -> CadenceBuilder {
        CadenceBuilder::new()
    }

    pub fn config(&self) -> &CadenceConfig {
        &self.config
    }

    /// Request shutdown.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Serve until Ctrl-C or [`Cadence::shutdown`].
    pub async fn run(self) -> Result<()> {
        tracing::info!(project = %self.config.project.name, "cadence starting");

        let engine = Arc::new(build_engine(&self.config).await?);
        let mut handles = Vec::new();

        if self.config.scheduler.enabled {
            let runner_config =
                SweepRunnerConfig::from_config(&self.config.scheduler, engine.timezone())?;
            let runner = SweepRunner::new(engine.clone(), runner_config);
            let shutdown = self.shutdown.clone();
            handles.push(tokio::spawn(async move {
                runner.run(shutdown).await;
            }));
        } else {
            tracing::info!("Sweep runner disabled");
        }

        let gateway = GatewayServer::new(self.config.gateway.clone(), engine.clone())
            .with_request_logging(self.config.observability.log_requests);
        let gateway_shutdown = self.shutdown.clone();
        handles.push(tokio::spawn(async move {
            if let Err(e) = gateway.run(gateway_shutdown.clone()).await {
                tracing::error!("Gateway stopped: {}", e);
                gateway_shutdown.cancel();
            }
        }));

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal");
            }
            _ = self.shutdown.cancelled() => {
                tracing::info!("Received shutdown notification");
            }
        }

        tracing::info!("Starting graceful shutdown");
        self.shutdown.cancel();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("Task ended abnormally: {}", e);
            }
        }
        engine.drain_notifications().await;

        tracing::info!("cadence stopped");
        Ok(())
    }
}

/// Builder for the cadence service.
pub struct CadenceBuilder {
    config: Option<CadenceConfig>,
}

impl CadenceBuilder {
    pub fn new() -> Self {
        Self { config: None }
    }

    pub fn config(mut self, config: CadenceConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Validate the configuration and build the service.
    pub fn build(self) -> Result<Cadence> {
        let config = self
            .config
            .ok_or_else(|| CadenceError::Config("Configuration is required".into()))?;
        config.validate()?;

        Ok(Cadence {
            config,
            shutdown: CancellationToken::new(),
        })
    }
}

impl Default for CadenceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::config::{NotificationsConfig, NotifierKind};
    use cadence_core::workflow::OverduePolicy;

    #[test]
    fn test_builder_requires_config() {
        let result = CadenceBuilder::new().build();
        assert!(matches!(result, Err(CadenceError::Config(_))));
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let mut config = CadenceConfig::default();
        config.engine.timezone = "Mars/Olympus".into();
        let result = Cadence::builder().config(config).build();
        assert!(matches!(result, Err(CadenceError::Config(_))));
    }

    #[test]
    fn test_shutdown_cancels_token() {
        let cadence = Cadence::builder()
            .config(CadenceConfig::default())
            .build()
            .unwrap();
        let token = cadence.shutdown_token();
        cadence.shutdown();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_build_engine_defaults() {
        let mut config = CadenceConfig::default();
        config.engine.timezone = "Europe/Madrid".into();
        config.scheduler.overdue_policy = OverduePolicy::SameDayOnly;

        let engine = build_engine(&config).await.unwrap();
        assert_eq!(engine.store().name(), "memory");
        assert_eq!(engine.notifier().name(), "log");
        assert_eq!(engine.timezone(), chrono_tz::Europe::Madrid);
        assert_eq!(engine.overdue_policy(), OverduePolicy::SameDayOnly);
    }

    #[tokio::test]
    async fn test_build_engine_webhook_without_url_fails() {
        let config = CadenceConfig {
            notifications: NotificationsConfig {
                backend: NotifierKind::Webhook,
                webhook_url: None,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(build_engine(&config).await.is_err());
    }
}

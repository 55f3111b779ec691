use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use tokio_util::sync::CancellationToken;

use cadence_core::config::SchedulerConfig;
use cadence_core::cron::CronSchedule;
use cadence_core::workflow::{InstanceStore, NotificationEmitter};
use cadence_core::{CadenceError, Result};

use crate::engine::WorkflowEngine;

/// Configuration for the sweep runner.
#[derive(Debug, Clone)]
pub struct SweepRunnerConfig {
    pub schedule: CronSchedule,
    /// Wall-clock zone the schedule is evaluated in.
    pub timezone: Tz,
}

impl SweepRunnerConfig {
    pub fn from_config(config: &SchedulerConfig, timezone: Tz) -> Result<Self> {
        let schedule = CronSchedule::new(&config.cron)
            .map_err(|e| CadenceError::Config(format!("scheduler.cron: {}", e)))?;
        Ok(Self { schedule, timezone })
    }
}

/// Runs the engine's sweep on a cron schedule until shutdown.
pub struct SweepRunner<S, N> {
    engine: Arc<WorkflowEngine<S, N>>,
    config: SweepRunnerConfig,
}

impl<S, N> SweepRunner<S, N>
where
    S: InstanceStore,
    N: NotificationEmitter + Clone + 'static,
{
    pub fn new(engine: Arc<WorkflowEngine<S, N>>, config: SweepRunnerConfig) -> Self {
        Self { engine, config }
    }

    /// Time to wait before the next scheduled sweep, or `None` when the
    /// schedule has no future occurrence.
    pub fn next_delay(&self) -> Option<Duration> {
        let now = Utc::now();
        let next = self
            .config
            .schedule
            .next_after_in_tz(now, self.config.timezone)?;
        Some((next - now).to_std().unwrap_or(Duration::ZERO))
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// A sweep in progress observes the same token and stops before its
    /// next instance.
    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!(
            cron = %self.config.schedule.expression(),
            timezone = %self.config.timezone,
            "Sweep runner started"
        );

        loop {
            let Some(delay) = self.next_delay() else {
                tracing::warn!("Sweep schedule has no future occurrence, stopping");
                break;
            };
            tracing::debug!(delay_secs = delay.as_secs(), "Next sweep scheduled");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    self.sweep_once(&shutdown).await;
                }
                _ = shutdown.cancelled() => {
                    tracing::info!("Sweep runner shutting down");
                    break;
                }
            }
        }
    }

    /// Sweep for the engine's current date and log a summary.
    pub async fn sweep_once(&self, shutdown: &CancellationToken) {
        let today = self.engine.today();
        match self.engine.run_automatic_sweep(today, shutdown).await {
            Ok(results) => {
                let failed = results.iter().filter(|r| !r.is_success()).count();
                tracing::info!(
                    %today,
                    completed = results.len() - failed,
                    failed,
                    "Automatic sweep finished"
                );
            }
            Err(e) => {
                tracing::error!(%today, error = %e, "Automatic sweep failed");
            }
        }
    }
}

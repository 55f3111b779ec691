use anyhow::Result;
use clap::Parser;
use console::style;
use tokio_util::sync::CancellationToken;

use cadence_core::config::CadenceConfig;
use cadence_core::workflow::{parse_anchor_date, SweepOutcome};

use crate::runtime::build_engine;

/// Run one automatic sweep.
#[derive(Parser)]
pub struct SweepCommand {
    /// Sweep date (YYYY-MM-DD); today in the engine timezone by default.
    #[arg(short, long)]
    pub date: Option<String>,
}

impl SweepCommand {
    pub async fn execute(self, config: CadenceConfig) -> Result<()> {
        super::warn_if_ephemeral(&config);
        let engine = build_engine(&config).await?;
        let today = match self.date.as_deref() {
            Some(date) => parse_anchor_date(date)?,
            None => engine.today(),
        };

        let shutdown = CancellationToken::new();
        let ctrl_c = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctrl_c.cancel();
            }
        });

        let results = engine.run_automatic_sweep(today, &shutdown).await?;
        if results.is_empty() {
            println!("  Nothing due on {}", today);
            return Ok(());
        }

        for result in &results {
            match &result.outcome {
                SweepOutcome::Completed => println!(
                    "  {} {} {}",
                    style("✓").green(),
                    result.instance_id,
                    result.step_id
                ),
                SweepOutcome::Failed { reason } => println!(
                    "  {} {} {}: {}",
                    style("✗").red(),
                    result.instance_id,
                    result.step_id,
                    reason
                ),
            }
        }

        let failed = results.iter().filter(|r| !r.is_success()).count();
        if failed > 0 {
            anyhow::bail!("{} of {} automatic steps failed", failed, results.len());
        }
        Ok(())
    }
}

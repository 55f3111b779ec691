use anyhow::Result;
use clap::Parser;
use console::style;

use cadence_core::config::CadenceConfig;

use crate::runtime::Cadence;

/// Serve the gateway and the sweep runner until Ctrl-C.
#[derive(Parser)]
pub struct RunCommand {
    /// Port to listen on (overrides config).
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    pub host: Option<String>,

    /// Do not start the sweep runner.
    #[arg(long)]
    pub no_scheduler: bool,
}

impl RunCommand {
    pub async fn execute(self, mut config: CadenceConfig) -> Result<()> {
        self.apply_overrides(&mut config);

        println!();
        println!(
            "  {} v{}",
            style("cadence").bold().cyan(),
            env!("CARGO_PKG_VERSION")
        );
        println!();
        println!(
            "  Listening on {}",
            style(format!("http://{}:{}", config.gateway.host, config.gateway.port)).cyan()
        );
        if config.scheduler.enabled {
            println!(
                "  Sweeping on '{}' ({})",
                style(&config.scheduler.cron).cyan(),
                config.engine.timezone
            );
        }
        println!();

        let cadence = Cadence::builder().config(config).build()?;
        cadence.run().await?;

        println!("\n  {}", style("Stopped.").dim());
        Ok(())
    }

    fn apply_overrides(&self, config: &mut CadenceConfig) {
        if let Some(port) = self.port {
            config.gateway.port = port;
        }
        if let Some(host) = &self.host {
            config.gateway.host = host.clone();
        }
        if self.no_scheduler {
            config.scheduler.enabled = false;
        }
    }
}

mod instance;
mod run;
mod sweep;
mod template;

pub use instance::{CreateCommand, ListCommand, ShowCommand, TransitionCommand};
pub use run::RunCommand;
pub use sweep::SweepCommand;
pub use template::TemplateCommand;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;

use cadence_core::config::{CadenceConfig, StoreBackendKind};

/// cadence - academic workflow orchestration
#[derive(Parser)]
#[command(name = "cadence")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path; built-in defaults apply when it is missing.
    #[arg(short, long, global = true, default_value = "cadence.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP gateway and run scheduled sweeps.
    Run(RunCommand),

    /// Run one automatic sweep and exit.
    Sweep(SweepCommand),

    /// Print the step chain generated for an anchor date.
    Template(TemplateCommand),

    /// Create a workflow instance.
    Create(CreateCommand),

    /// Change the status of a step.
    Transition(TransitionCommand),

    /// List workflow instances.
    List(ListCommand),

    /// Show one workflow instance as JSON.
    Show(ShowCommand),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        let config = CadenceConfig::load_or_default(&self.config)
            .with_context(|| format!("Failed to load configuration from {}", self.config))?;
        cadence_runtime::init_logging(&config.observability);

        match self.command {
            Commands::Run(cmd) => cmd.execute(config).await,
            Commands::Sweep(cmd) => cmd.execute(config).await,
            Commands::Template(cmd) => cmd.execute(),
            Commands::Create(cmd) => cmd.execute(config).await,
            Commands::Transition(cmd) => cmd.execute(config).await,
            Commands::List(cmd) => cmd.execute(config).await,
            Commands::Show(cmd) => cmd.execute(config).await,
        }
    }
}

/// Warn that one-shot commands against the memory store do not persist.
fn warn_if_ephemeral(config: &CadenceConfig) {
    if config.store.backend == StoreBackendKind::Memory {
        eprintln!(
            "  {} store backend is 'memory'; changes are discarded when this command exits",
            style("!").yellow().bold()
        );
    }
}

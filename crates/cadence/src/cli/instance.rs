use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use uuid::Uuid;

use cadence_core::config::CadenceConfig;
use cadence_core::workflow::{parse_anchor_date, InstanceStatus, ProcessKind, StepStatus};

use crate::runtime::build_engine;

/// Create a workflow instance from a process template.
#[derive(Parser)]
pub struct CreateCommand {
    /// External process id, e.g. the exam code.
    #[arg(long)]
    pub process_id: String,

    /// Human readable process title.
    #[arg(long)]
    pub title: String,

    /// Anchor (exam) date, YYYY-MM-DD.
    #[arg(short, long)]
    pub date: String,

    /// Process kind: exam_result or resit_exam.
    #[arg(short, long, default_value = "exam_result")]
    pub kind: String,
}

impl CreateCommand {
    pub async fn execute(self, config: CadenceConfig) -> Result<()> {
        super::warn_if_ephemeral(&config);
        let anchor = parse_anchor_date(&self.date)?;
        let kind: ProcessKind = self.kind.parse()?;

        let engine = build_engine(&config).await?;
        let instance = engine
            .create_instance(&self.process_id, &self.title, anchor, kind)
            .await?;

        println!(
            "  {} Created {} ({})",
            style("✓").green(),
            style(instance.id).bold(),
            instance.process_title
        );
        Ok(())
    }
}

/// Change the status of one step.
#[derive(Parser)]
pub struct TransitionCommand {
    /// Workflow instance id.
    pub instance_id: Uuid,

    /// Step id, e.g. grade_entry.
    pub step_id: String,

    /// Target status: in_progress, completed, failed or skipped.
    pub status: String,

    /// Force the status, bypassing the transition rules.
    #[arg(long)]
    pub force: bool,
}

impl TransitionCommand {
    pub async fn execute(self, config: CadenceConfig) -> Result<()> {
        super::warn_if_ephemeral(&config);
        let status: StepStatus = self.status.parse()?;
        let engine = build_engine(&config).await?;

        let instance = if self.force {
            engine
                .override_step_status(self.instance_id, &self.step_id, status)
                .await?
        } else {
            engine
                .transition_step(self.instance_id, &self.step_id, status)
                .await?
        };

        println!(
            "  {} {} is {}; current step {} ({})",
            style("✓").green(),
            self.step_id,
            status,
            style(&instance.current_step).bold(),
            instance.status
        );
        Ok(())
    }
}

/// List workflow instances.
#[derive(Parser)]
pub struct ListCommand {
    /// Only show instances with this status.
    #[arg(short, long)]
    pub status: Option<String>,
}

impl ListCommand {
    pub async fn execute(self, config: CadenceConfig) -> Result<()> {
        let filter: Option<InstanceStatus> = self
            .status
            .as_deref()
            .map(str::parse::<InstanceStatus>)
            .transpose()?;
        let engine = build_engine(&config).await?;

        let instances: Vec<_> = engine
            .list_instances()
            .await?
            .into_iter()
            .filter(|i| filter.map_or(true, |s| i.status == s))
            .collect();

        if instances.is_empty() {
            println!("  No workflow instances");
            return Ok(());
        }

        for instance in instances {
            println!(
                "  {}  {:<10} {:<20} {}",
                instance.id,
                instance.status,
                instance.current_step,
                instance.process_title
            );
        }
        Ok(())
    }
}

/// Show one workflow instance as JSON.
#[derive(Parser)]
pub struct ShowCommand {
    /// Workflow instance id.
    pub instance_id: Uuid,
}

impl ShowCommand {
    pub async fn execute(self, config: CadenceConfig) -> Result<()> {
        let engine = build_engine(&config).await?;
        let instance = engine
            .get_instance(self.instance_id)
            .await
            .with_context(|| format!("Failed to load instance {}", self.instance_id))?;

        println!("{}", serde_json::to_string_pretty(&instance)?);
        Ok(())
    }
}

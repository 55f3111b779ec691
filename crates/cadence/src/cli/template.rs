use anyhow::Result;
use clap::Parser;
use console::style;

use cadence_core::workflow::{generate_template, parse_anchor_date, ProcessKind};

/// Print the chain generated for an anchor date.
#[derive(Parser)]
pub struct TemplateCommand {
    /// Anchor (exam) date, YYYY-MM-DD.
    #[arg(short, long)]
    pub date: String,

    /// Process kind: exam_result or resit_exam.
    #[arg(short, long, default_value = "exam_result")]
    pub kind: String,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

impl TemplateCommand {
    pub fn execute(self) -> Result<()> {
        let anchor = parse_anchor_date(&self.date)?;
        let kind: ProcessKind = self.kind.parse()?;
        let steps = generate_template(anchor, kind)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&steps)?);
            return Ok(());
        }

        println!("  {} chain for {}", style(kind).bold(), anchor);
        println!();
        for step in &steps {
            let window = match (step.start_date, step.end_date) {
                (Some(start), Some(end)) => format!("{} .. {}", start, end),
                (Some(start), None) => start.to_string(),
                _ => "-".to_string(),
            };
            let auto = if step.is_automatable() {
                style("auto").green().to_string()
            } else {
                style("manual").dim().to_string()
            };
            println!("  {:<22} {:<24} {}", step.id, window, auto);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_rejects_bad_kind() {
        let cmd = TemplateCommand {
            date: "2024-03-01".into(),
            kind: "thesis".into(),
            json: false,
        };
        assert!(cmd.execute().is_err());
    }

    #[test]
    fn test_template_prints_json() {
        let cmd = TemplateCommand {
            date: "2024-03-01".into(),
            kind: "resit_exam".into(),
            json: true,
        };
        assert!(cmd.execute().is_ok());
    }
}

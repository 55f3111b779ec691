use serde::{Deserialize, Serialize};

use crate::workflow::OverduePolicy;

/// Automatic sweep scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Whether `cadence run` starts the periodic sweep.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Cron expression (5 or 6 fields) evaluated in the engine timezone.
    #[serde(default = "default_cron")]
    pub cron: String,

    /// Treatment of automatable steps whose start date already passed.
    #[serde(default)]
    pub overdue_policy: OverduePolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            cron: default_cron(),
            overdue_policy: OverduePolicy::default(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_cron() -> String {
    // Every day at 06:00
    "0 6 * * *".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scheduler_config() {
        let config = SchedulerConfig::default();
        assert!(config.enabled);
        assert_eq!(config.cron, "0 6 * * *");
        assert_eq!(config.overdue_policy, OverduePolicy::CatchUp);
    }

    #[test]
    fn test_parse_scheduler_config() {
        let toml = r#"
            cron = "0 */4 * * *"
            overdue_policy = "same_day_only"
        "#;

        let config: SchedulerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.overdue_policy, OverduePolicy::SameDayOnly);
        assert!(config.enabled);
    }
}

use serde::{Deserialize, Serialize};

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level filter (`RUST_LOG` takes precedence when set).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output JSON format.
    #[serde(default)]
    pub json_format: bool,

    /// Whether to log each HTTP request.
    #[serde(default = "default_true")]
    pub log_requests: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            log_requests: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_observability_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.level, "info");
        assert!(!config.json_format);
        assert!(config.log_requests);
    }

    #[test]
    fn test_parse_observability_config() {
        let toml = r#"
            level = "cadence_runtime=debug,info"
            json_format = true
        "#;

        let config: ObservabilityConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.level, "cadence_runtime=debug,info");
        assert!(config.json_format);
    }
}

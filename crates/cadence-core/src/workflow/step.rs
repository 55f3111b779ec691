use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CadenceError;

/// Step execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step not yet started.
    Pending,
    /// Step currently being worked on.
    InProgress,
    /// Step completed successfully.
    Completed,
    /// Step failed; the instance stalls here.
    Failed,
    /// Step was skipped.
    Skipped,
}

impl StepStatus {
    /// Convert to string for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Check if the step no longer transitions on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }

    /// Check if the step lets the cursor move past it and unblocks
    /// dependents.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }

    /// Whether the state machine allows moving from `self` to `to`.
    ///
    /// Re-applying the current status is handled separately as a no-op.
    pub fn can_transition_to(&self, to: StepStatus) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::InProgress)
                | (Self::Pending, Self::Skipped)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Failed)
                | (Self::InProgress, Self::Skipped)
        )
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepStatus {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "skipped" => Ok(Self::Skipped),
            other => Err(CadenceError::InvalidArgument(format!(
                "unknown step status '{}'",
                other
            ))),
        }
    }
}

/// Free-form step metadata.
///
/// `automatable` and `description` are the only keys the engine reads;
/// everything else rides along in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMetadata {
    /// Whether the sweep may complete this step on its own.
    pub automatable: bool,
    /// Human description.
    pub description: String,
    /// Collaborator-specific keys, opaque to the engine.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StepMetadata {
    pub fn new(automatable: bool, description: impl Into<String>) -> Self {
        Self {
            automatable,
            description: description.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// One unit of process work inside an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Identifier, unique within the template.
    pub id: String,
    /// Human label.
    pub name: String,
    /// Live status.
    pub status: StepStatus,
    /// Planned start of the execution window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Planned end of the window, or the actual completion date once
    /// completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Informational actor reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    /// Ids of steps that must be done before this one starts.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Step metadata.
    pub metadata: StepMetadata,
}

impl Step {
    /// Create a pending step with no window and no dependencies.
    pub fn new(id: impl Into<String>, name: impl Into<String>, metadata: StepMetadata) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: StepStatus::Pending,
            start_date: None,
            end_date: None,
            assigned_to: None,
            dependencies: Vec::new(),
            metadata,
        }
    }

    /// Set the execution window.
    pub fn window(mut self, start: NaiveDate, end: Option<NaiveDate>) -> Self {
        self.start_date = Some(start);
        self.end_date = end;
        self
    }

    /// Add a dependency.
    pub fn depends_on(mut self, step_id: impl Into<String>) -> Self {
        self.dependencies.push(step_id.into());
        self
    }

    /// Shortcut for `metadata.automatable`.
    pub fn is_automatable(&self) -> bool {
        self.metadata.automatable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_status_conversion() {
        assert_eq!(StepStatus::Pending.as_str(), "pending");
        assert_eq!(StepStatus::InProgress.as_str(), "in_progress");
        assert_eq!(StepStatus::Completed.as_str(), "completed");
        assert_eq!(StepStatus::Failed.as_str(), "failed");
        assert_eq!(StepStatus::Skipped.as_str(), "skipped");

        assert_eq!(
            "in_progress".parse::<StepStatus>().unwrap(),
            StepStatus::InProgress
        );
        assert_eq!(
            "completed".parse::<StepStatus>().unwrap(),
            StepStatus::Completed
        );
        assert!("running".parse::<StepStatus>().is_err());
    }

    #[test]
    fn test_transition_table() {
        use StepStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(Pending.can_transition_to(Skipped));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Failed));
        assert!(InProgress.can_transition_to(Skipped));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Failed.can_transition_to(InProgress));
        assert!(!Skipped.can_transition_to(Pending));
    }

    #[test]
    fn test_step_wire_format() {
        let mut meta = StepMetadata::new(true, "Send convocations");
        meta.extra
            .insert("channel".into(), serde_json::json!("email"));
        let step = Step::new("convocation", "Convocation", meta)
            .window(NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(), None);

        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["startDate"], "2024-02-15");
        assert!(json.get("endDate").is_none());
        assert_eq!(json["metadata"]["automatable"], true);
        assert_eq!(json["metadata"]["channel"], "email");

        let back: Step = serde_json::from_value(json).unwrap();
        assert_eq!(back, step);
    }
}

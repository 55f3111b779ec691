use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::instance::{InstanceStatus, WorkflowInstance};
use super::step::{Step, StepStatus};

/// How the sweep treats automatable steps whose start date already passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverduePolicy {
    /// Fire any due step (`start_date <= today`), so missed days are
    /// picked up on the next run.
    #[default]
    CatchUp,
    /// Fire only on the scheduled day (`start_date == today`).
    SameDayOnly,
}

impl OverduePolicy {
    /// Whether a step scheduled for `start` is due on `today`.
    pub fn is_due(&self, start: NaiveDate, today: NaiveDate) -> bool {
        match self {
            Self::CatchUp => start <= today,
            Self::SameDayOnly => start == today,
        }
    }
}

/// Return the cursor step if the sweep should complete it today.
pub fn sweep_candidate(
    instance: &WorkflowInstance,
    today: NaiveDate,
    policy: OverduePolicy,
) -> Option<&Step> {
    if instance.status != InstanceStatus::Active {
        return None;
    }
    let step = instance.cursor()?;
    let due = step
        .start_date
        .map(|start| policy.is_due(start, today))
        .unwrap_or(false);

    (step.status == StepStatus::InProgress && step.is_automatable() && due).then_some(step)
}

/// Outcome of one automatic execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SweepOutcome {
    Completed,
    Failed { reason: String },
}

/// Per-step record of a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResult {
    pub instance_id: Uuid,
    pub step_id: String,
    #[serde(flatten)]
    pub outcome: SweepOutcome,
}

impl SweepResult {
    pub fn completed(instance_id: Uuid, step_id: impl Into<String>) -> Self {
        Self {
            instance_id,
            step_id: step_id.into(),
            outcome: SweepOutcome::Completed,
        }
    }

    pub fn failed(
        instance_id: Uuid,
        step_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            instance_id,
            step_id: step_id.into(),
            outcome: SweepOutcome::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == SweepOutcome::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::ProcessKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn started_exam() -> WorkflowInstance {
        let mut instance = WorkflowInstance::from_template(
            "exam-1",
            "Chemistry",
            date(2024, 3, 1),
            ProcessKind::ExamResult,
        )
        .unwrap();
        instance
            .apply_transition("convocation", StepStatus::InProgress, date(2024, 2, 10))
            .unwrap();
        instance
    }

    #[test]
    fn test_overdue_policy() {
        let start = date(2024, 2, 15);
        assert!(OverduePolicy::CatchUp.is_due(start, date(2024, 2, 15)));
        assert!(OverduePolicy::CatchUp.is_due(start, date(2024, 2, 20)));
        assert!(!OverduePolicy::CatchUp.is_due(start, date(2024, 2, 14)));

        assert!(OverduePolicy::SameDayOnly.is_due(start, date(2024, 2, 15)));
        assert!(!OverduePolicy::SameDayOnly.is_due(start, date(2024, 2, 16)));
    }

    #[test]
    fn test_candidate_requires_in_progress() {
        let fresh = WorkflowInstance::from_template(
            "exam-1",
            "Chemistry",
            date(2024, 3, 1),
            ProcessKind::ExamResult,
        )
        .unwrap();
        assert!(sweep_candidate(&fresh, date(2024, 2, 15), OverduePolicy::CatchUp).is_none());

        let started = started_exam();
        let step = sweep_candidate(&started, date(2024, 2, 15), OverduePolicy::CatchUp).unwrap();
        assert_eq!(step.id, "convocation");
    }

    #[test]
    fn test_candidate_respects_date() {
        let started = started_exam();
        assert!(sweep_candidate(&started, date(2024, 2, 14), OverduePolicy::CatchUp).is_none());
        assert!(sweep_candidate(&started, date(2024, 2, 16), OverduePolicy::SameDayOnly).is_none());
        assert!(sweep_candidate(&started, date(2024, 2, 16), OverduePolicy::CatchUp).is_some());
    }

    #[test]
    fn test_candidate_skips_manual_steps() {
        let mut instance = started_exam();
        instance
            .apply_transition("convocation", StepStatus::Completed, date(2024, 2, 15))
            .unwrap();
        // exam_session is in progress but needs a human
        assert!(sweep_candidate(&instance, date(2024, 3, 1), OverduePolicy::CatchUp).is_none());
    }

    #[test]
    fn test_candidate_ignores_paused() {
        let mut instance = started_exam();
        instance.pause().unwrap();
        assert!(sweep_candidate(&instance, date(2024, 2, 15), OverduePolicy::CatchUp).is_none());
    }

    #[test]
    fn test_sweep_result_serialization() {
        let id = Uuid::new_v4();
        let result = SweepResult::failed(id, "validation", "store down");
        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["reason"], "store down");
        assert_eq!(json["stepId"], "validation");
        assert!(SweepResult::completed(id, "validation").is_success());
    }
}

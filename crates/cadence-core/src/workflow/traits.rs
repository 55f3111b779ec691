use std::future::Future;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::instance::{StartTrigger, WorkflowInstance};
use super::step::Step;
use crate::Result;

/// Durable home of workflow instances.
///
/// Instances are written as whole documents. `save` must reject a write
/// whose stored version is not `instance.version - 1` with
/// [`CadenceError::Conflict`](crate::CadenceError::Conflict); a missing
/// record is accepted only at version 1.
pub trait InstanceStore: Send + Sync {
    /// Insert or replace an instance.
    fn save(&self, instance: &WorkflowInstance) -> impl Future<Output = Result<()>> + Send;

    /// Load an instance, failing with `NotFound` for unknown ids.
    fn load(&self, id: Uuid) -> impl Future<Output = Result<WorkflowInstance>> + Send;

    /// All instances, oldest first.
    fn list_all(&self) -> impl Future<Output = Result<Vec<WorkflowInstance>>> + Send;

    /// Instances whose status is `active`.
    fn list_active(&self) -> impl Future<Output = Result<Vec<WorkflowInstance>>> + Send;
}

/// Kind of step notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// The previous step completed and this one started.
    StepStarted,
    /// The previous step was skipped and this one started.
    StepStartedAfterSkip,
}

impl From<StartTrigger> for NotificationKind {
    fn from(trigger: StartTrigger) -> Self {
        match trigger {
            StartTrigger::Completion => Self::StepStarted,
            StartTrigger::Skip => Self::StepStartedAfterSkip,
        }
    }
}

/// Notification about a newly active step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepNotification {
    pub instance_id: Uuid,
    pub step_id: String,
    pub title: String,
    pub message: String,
    /// Intended delivery date; may lie in the future.
    pub scheduled_for: Option<NaiveDate>,
    pub automatable: bool,
    pub kind: NotificationKind,
}

impl StepNotification {
    /// Build the notification for `step`, just started inside `instance`.
    pub fn for_started_step(
        instance: &WorkflowInstance,
        step: &Step,
        kind: NotificationKind,
    ) -> Self {
        let message = match kind {
            NotificationKind::StepStarted => format!(
                "'{}' is now in progress for {}. {}",
                step.name, instance.process_title, step.metadata.description
            ),
            NotificationKind::StepStartedAfterSkip => format!(
                "'{}' is now in progress for {} (previous step skipped). {}",
                step.name, instance.process_title, step.metadata.description
            ),
        };

        Self {
            instance_id: instance.id,
            step_id: step.id.clone(),
            title: format!("{}: {}", instance.process_title, step.name),
            message,
            scheduled_for: step.start_date,
            automatable: step.metadata.automatable,
            kind,
        }
    }
}

/// Fire-and-forget sink for step notifications.
///
/// Errors are reported to the caller so they can be logged; the engine
/// never lets them affect a transition.
pub trait NotificationEmitter: Send + Sync {
    fn emit(&self, notification: &StepNotification) -> impl Future<Output = Result<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::ProcessKind;

    #[test]
    fn test_notification_for_started_step() {
        let instance = WorkflowInstance::from_template(
            "exam-7",
            "Physics II",
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            ProcessKind::ExamResult,
        )
        .unwrap();
        let step = instance.step("exam_session").unwrap();

        let n = StepNotification::for_started_step(&instance, step, NotificationKind::StepStarted);
        assert_eq!(n.step_id, "exam_session");
        assert_eq!(n.scheduled_for, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert!(!n.automatable);
        assert!(n.title.contains("Physics II"));

        let skipped =
            StepNotification::for_started_step(&instance, step, StartTrigger::Skip.into());
        assert_eq!(skipped.kind, NotificationKind::StepStartedAfterSkip);
        assert!(skipped.message.contains("skipped"));
    }
}

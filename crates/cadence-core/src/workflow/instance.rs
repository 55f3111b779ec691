use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::step::{Step, StepStatus};
use super::template::{generate_template, validate_chain, ProcessKind};
use crate::error::{CadenceError, Result};

/// Overall instance status, derived from step statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Some step is still open.
    Active,
    /// Every step is completed or skipped.
    Completed,
    /// A step failed and nothing after it completed.
    Failed,
    /// Explicitly halted by an external actor.
    Paused,
}

impl InstanceStatus {
    /// Convert to string for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Paused => "paused",
        }
    }

    /// Check if the instance is retained for history only.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceStatus {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "paused" => Ok(Self::Paused),
            other => Err(CadenceError::InvalidArgument(format!(
                "unknown instance status '{}'",
                other
            ))),
        }
    }
}

/// Why a step was started automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartTrigger {
    /// The previous step completed.
    Completion,
    /// The previous step was skipped.
    Skip,
}

/// A step the state machine started on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedStep {
    pub step_id: String,
    pub trigger: StartTrigger,
}

/// What a single transition changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub step_id: String,
    pub from: StepStatus,
    pub to: StepStatus,
    /// Next step auto-started by cursor advancement.
    pub started: Option<StartedStep>,
}

impl TransitionOutcome {
    /// Re-applying the current status changes nothing.
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

/// One running occurrence of a process chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInstance {
    pub id: Uuid,
    pub process_id: String,
    pub process_title: String,
    pub process_kind: ProcessKind,
    /// Earliest step that is neither completed nor skipped.
    pub current_step: String,
    pub status: InstanceStatus,
    pub steps: Vec<Step>,
    /// Bumped on every persisted mutation.
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowInstance {
    /// Create an instance over an already generated chain.
    pub fn new(
        process_id: impl Into<String>,
        process_title: impl Into<String>,
        process_kind: ProcessKind,
        steps: Vec<Step>,
    ) -> Result<Self> {
        validate_chain(&steps)?;
        let now = Utc::now();
        let current_step = steps[0].id.clone();

        let mut instance = Self {
            id: Uuid::new_v4(),
            process_id: process_id.into(),
            process_title: process_title.into(),
            process_kind,
            current_step,
            status: InstanceStatus::Active,
            steps,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        instance.refresh_cursor();
        instance.derive_status();
        Ok(instance)
    }

    /// Generate the chain for `kind` and wrap it in a fresh instance.
    pub fn from_template(
        process_id: impl Into<String>,
        process_title: impl Into<String>,
        anchor: NaiveDate,
        kind: ProcessKind,
    ) -> Result<Self> {
        let steps = generate_template(anchor, kind)?;
        Self::new(process_id, process_title, kind, steps)
    }

    /// Look up a step by id.
    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// The step the cursor points at.
    pub fn cursor(&self) -> Option<&Step> {
        self.step(&self.current_step)
    }

    /// Index of the cursor in list order.
    pub fn cursor_index(&self) -> usize {
        self.steps
            .iter()
            .position(|s| s.id == self.current_step)
            .unwrap_or(0)
    }

    /// Record a persisted mutation.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.version += 1;
    }

    /// Check that every dependency of `step_id` is completed or skipped.
    ///
    /// The error names the first blocking dependency.
    pub fn check_dependencies(&self, step_id: &str) -> Result<()> {
        let index = self.index_of(step_id)?;
        self.check_dependencies_at(index)
    }

    /// Apply a caller-requested status change.
    ///
    /// Completing (or skipping) the cursor step advances the cursor and
    /// starts the next step when its dependencies allow.
    pub fn apply_transition(
        &mut self,
        step_id: &str,
        to: StepStatus,
        today: NaiveDate,
    ) -> Result<TransitionOutcome> {
        let index = self.index_of(step_id)?;
        let from = self.steps[index].status;

        if self.status == InstanceStatus::Paused {
            return Err(CadenceError::InvalidTransition {
                step: step_id.to_string(),
                from: format!("{} (instance paused)", from),
                to: to.to_string(),
            });
        }

        let leaves_pending = from == StepStatus::Pending && to == StepStatus::Skipped;
        if to == StepStatus::InProgress || leaves_pending {
            self.check_dependencies_at(index)?;
        }

        let mut outcome = TransitionOutcome {
            step_id: step_id.to_string(),
            from,
            to,
            started: None,
        };

        if from == to {
            return Ok(outcome);
        }

        if !from.can_transition_to(to) {
            return Err(CadenceError::InvalidTransition {
                step: step_id.to_string(),
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        if to.is_done() {
            outcome.started = self.finish_at(index, to, today);
        } else {
            self.steps[index].status = to;
        }

        self.derive_status();
        Ok(outcome)
    }

    /// Mark a step completed or skipped and advance the cursor.
    ///
    /// Returns the step that was started as a consequence, if any.
    pub fn finish(
        &mut self,
        step_id: &str,
        outcome: StepStatus,
        today: NaiveDate,
    ) -> Result<Option<StartedStep>> {
        if !outcome.is_done() {
            return Err(CadenceError::InvalidArgument(format!(
                "'{}' does not finish a step",
                outcome
            )));
        }
        let index = self.index_of(step_id)?;
        let started = self.finish_at(index, outcome, today);
        self.derive_status();
        Ok(started)
    }

    /// Start a pending step if all its dependencies are done.
    pub fn try_start(&mut self, step_id: &str) -> Result<bool> {
        let index = self.index_of(step_id)?;
        Ok(self.try_start_at(index))
    }

    /// Administrative override: force a step to `to`.
    ///
    /// Bypasses the transition table (this is how a failed step gets
    /// re-opened) but still refuses to start a step whose dependencies are
    /// open. Never auto-starts anything.
    pub fn override_status(
        &mut self,
        step_id: &str,
        to: StepStatus,
        today: NaiveDate,
    ) -> Result<StepStatus> {
        let index = self.index_of(step_id)?;
        if to == StepStatus::InProgress {
            self.check_dependencies_at(index)?;
        }

        let step = &mut self.steps[index];
        let from = step.status;
        step.status = to;
        if to == StepStatus::Completed {
            step.end_date = Some(today);
        }

        self.refresh_cursor();
        self.derive_status();
        Ok(from)
    }

    /// Halt the instance; the sweep ignores paused instances.
    pub fn pause(&mut self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(CadenceError::InvalidArgument(format!(
                "instance {} is {} and cannot be paused",
                self.id, self.status
            )));
        }
        self.status = InstanceStatus::Paused;
        Ok(())
    }

    /// Lift a pause and re-derive the status.
    pub fn resume(&mut self) -> Result<()> {
        if self.status != InstanceStatus::Paused {
            return Err(CadenceError::InvalidArgument(format!(
                "instance {} is not paused",
                self.id
            )));
        }
        self.status = InstanceStatus::Active;
        self.derive_status();
        Ok(())
    }

    fn index_of(&self, step_id: &str) -> Result<usize> {
        self.steps
            .iter()
            .position(|s| s.id == step_id)
            .ok_or_else(|| {
                CadenceError::NotFound(format!(
                    "step '{}' in workflow instance {}",
                    step_id, self.id
                ))
            })
    }

    fn check_dependencies_at(&self, index: usize) -> Result<()> {
        let step = &self.steps[index];
        for dep in &step.dependencies {
            let status = self
                .step(dep)
                .map(|s| s.status)
                .ok_or_else(|| {
                    CadenceError::Internal(format!(
                        "step '{}' references unknown dependency '{}'",
                        step.id, dep
                    ))
                })?;
            if !status.is_done() {
                return Err(CadenceError::DependencyNotSatisfied {
                    step: step.id.clone(),
                    dependency: dep.clone(),
                    status,
                });
            }
        }
        Ok(())
    }

    fn finish_at(
        &mut self,
        index: usize,
        outcome: StepStatus,
        today: NaiveDate,
    ) -> Option<StartedStep> {
        let step = &mut self.steps[index];
        step.status = outcome;
        if outcome == StepStatus::Completed {
            step.end_date = Some(today);
        }

        let was_cursor = step.id == self.current_step;
        self.refresh_cursor();
        if !was_cursor {
            return None;
        }

        let next = self.cursor_index();
        if next > index && self.try_start_at(next) {
            let trigger = match outcome {
                StepStatus::Skipped => StartTrigger::Skip,
                _ => StartTrigger::Completion,
            };
            return Some(StartedStep {
                step_id: self.steps[next].id.clone(),
                trigger,
            });
        }
        None
    }

    fn try_start_at(&mut self, index: usize) -> bool {
        if self.steps[index].status != StepStatus::Pending {
            return false;
        }
        if self.check_dependencies_at(index).is_err() {
            return false;
        }
        self.steps[index].status = StepStatus::InProgress;
        true
    }

    /// Point the cursor at the earliest open step, or the last step once
    /// everything is done.
    fn refresh_cursor(&mut self) {
        let index = self
            .steps
            .iter()
            .position(|s| !s.status.is_done())
            .unwrap_or(self.steps.len() - 1);
        self.current_step = self.steps[index].id.clone();
    }

    fn derive_status(&mut self) {
        if self.status == InstanceStatus::Paused {
            return;
        }

        self.status = if self.steps.iter().all(|s| s.status.is_done()) {
            InstanceStatus::Completed
        } else if let Some(failed) = self
            .steps
            .iter()
            .rposition(|s| s.status == StepStatus::Failed)
        {
            let later_completed = self.steps[failed + 1..]
                .iter()
                .any(|s| s.status == StepStatus::Completed);
            if later_completed {
                InstanceStatus::Active
            } else {
                InstanceStatus::Failed
            }
        } else {
            InstanceStatus::Active
        };
    }
}

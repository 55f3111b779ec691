mod instance;
mod step;
mod sweep;
mod template;
mod traits;

pub use instance::{
    InstanceStatus, StartTrigger, StartedStep, TransitionOutcome, WorkflowInstance,
};
pub use step::{Step, StepMetadata, StepStatus};
pub use sweep::{sweep_candidate, OverduePolicy, SweepOutcome, SweepResult};
pub use template::{generate_template, parse_anchor_date, validate_chain, ProcessKind};
pub use traits::{InstanceStore, NotificationEmitter, NotificationKind, StepNotification};

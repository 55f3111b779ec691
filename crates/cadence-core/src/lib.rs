//! Domain model of the cadence workflow engine: process templates, the
//! step state machine and the collaborator traits the runtime plugs into.

pub mod config;
pub mod cron;
pub mod error;
pub mod workflow;

pub use config::CadenceConfig;
pub use error::{CadenceError, Result};
pub use workflow::{
    generate_template, InstanceStatus, InstanceStore, NotificationEmitter, NotificationKind,
    OverduePolicy, ProcessKind, Step, StepMetadata, StepNotification, StepStatus, SweepOutcome,
    SweepResult, TransitionOutcome, WorkflowInstance,
};

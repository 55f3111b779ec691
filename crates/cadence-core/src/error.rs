use thiserror::Error;

use crate::workflow::StepStatus;

/// Core error type for cadence operations.
#[derive(Error, Debug)]
pub enum CadenceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A step tried to leave `pending` while one of its dependencies is
    /// still open.
    #[error(
        "Dependency not satisfied: step '{step}' is blocked by '{dependency}' (currently {status})"
    )]
    DependencyNotSatisfied {
        step: String,
        dependency: String,
        status: StepStatus,
    },

    #[error("Invalid transition for step '{step}': {from} -> {to}")]
    InvalidTransition {
        step: String,
        from: String,
        to: String,
    },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CadenceError {
    /// Whether retrying the same request can succeed.
    ///
    /// Caller errors (bad input, gating violations) never become valid on
    /// their own; store failures and version conflicts may.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Conflict(_))
    }

    /// Stable machine-readable code, shared by the gateway and the CLI.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::DependencyNotSatisfied { .. } => "DEPENDENCY_NOT_SATISFIED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Notification(_) => "NOTIFICATION_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<serde_json::Error> for CadenceError {
    fn from(e: serde_json::Error) -> Self {
        CadenceError::Serialization(e.to_string())
    }
}

impl From<sqlx::Error> for CadenceError {
    fn from(e: sqlx::Error) -> Self {
        CadenceError::Persistence(e.to_string())
    }
}

/// Result type alias using CadenceError.
pub type Result<T> = std::result::Result<T, CadenceError>;

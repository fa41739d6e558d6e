//! Error types for scheduler operations.

use thiserror::Error;

/// Errors produced by scheduler components.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// Request fields could not be accepted.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Referenced workload, job definition, or validation run does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of record that was looked up.
        kind: &'static str,
        /// Identifier that was not found.
        id: String,
    },
    /// Operation is not allowed in the record's current state.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    /// More workloads are running than the concurrency cap allows.
    #[error("concurrency violation: {running} workloads running, cap is {cap}")]
    ConcurrencyViolation {
        /// Workloads observed in `running`.
        running: usize,
        /// Configured concurrency cap.
        cap: usize,
    },
    /// Configuration rejected during construction.
    #[error("config invalid: {0}")]
    InvalidConfig(String),
    /// The scheduler loop is no longer accepting triggers.
    #[error("scheduler shut down")]
    Shutdown,
}

impl SchedulerError {
    /// Build a [`SchedulerError::NotFound`].
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Stable error code for remote callers.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::NotFound { .. } => "not_found",
            Self::PreconditionFailed(_) => "precondition_failed",
            Self::ConcurrencyViolation { .. } => "concurrency_violation",
            Self::InvalidConfig(_) => "invalid_config",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

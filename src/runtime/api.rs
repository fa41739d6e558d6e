//! API-facing request/response models for the submission and approval
//! interfaces.

use serde::{Deserialize, Serialize};

use crate::core::{parse_gpu_count, parse_mem_gb, SchedulerError, Workload, DEFAULT_GPU_COUNT};
use crate::util::serde::{GpuType, JobDefinitionId, Priority, ResourceRequest, ValidationRunId};

/// A resource quantity as submitted: either a number or free text such as
/// `"A100 x 4"` or `"128GB"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    /// Numeric value.
    Count(i64),
    /// Text to parse.
    Text(String),
}

impl Quantity {
    /// Normalized GPU count. Negative or unparsable values become
    /// [`DEFAULT_GPU_COUNT`].
    pub fn gpu_count(&self) -> u32 {
        match self {
            Self::Count(n) if *n < 0 => DEFAULT_GPU_COUNT,
            Self::Count(n) => u32::try_from(*n).unwrap_or(u32::MAX),
            Self::Text(raw) => parse_gpu_count(raw),
        }
    }

    /// Normalized memory in GB. Negative or unparsable values become `0`.
    pub fn memory_gb(&self) -> u32 {
        match self {
            Self::Count(n) => u32::try_from((*n).max(0)).unwrap_or(u32::MAX),
            Self::Text(raw) => parse_mem_gb(raw),
        }
    }
}

impl From<u32> for Quantity {
    fn from(value: u32) -> Self {
        Self::Count(i64::from(value))
    }
}

impl From<&str> for Quantity {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Workload submission payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    /// Job definition to execute.
    pub job_definition_id: JobDefinitionId,
    /// Submitting user.
    pub requester_id: String,
    /// Display name; defaults to the job definition's name.
    #[serde(default)]
    pub name: Option<String>,
    /// Queue priority.
    #[serde(default)]
    pub priority: Priority,
    /// Requested GPU model.
    pub gpu_type: GpuType,
    /// Requested GPU count.
    pub gpu_count: Quantity,
    /// Requested memory.
    pub memory: Quantity,
    /// Optional prior validation run; annotation only.
    #[serde(default)]
    pub test_run_ref: Option<ValidationRunId>,
}

impl SubmissionRequest {
    /// Request with numeric quantities and default priority.
    pub fn new(
        job_definition_id: JobDefinitionId,
        requester_id: impl Into<String>,
        gpu_type: GpuType,
        gpu_count: u32,
        memory_gb: u32,
    ) -> Self {
        Self {
            job_definition_id,
            requester_id: requester_id.into(),
            name: None,
            priority: Priority::default(),
            gpu_type,
            gpu_count: gpu_count.into(),
            memory: memory_gb.into(),
            test_run_ref: None,
        }
    }

    /// Set the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Reference a prior validation run.
    #[must_use]
    pub fn with_test_run(mut self, run: ValidationRunId) -> Self {
        self.test_run_ref = Some(run);
        self
    }

    /// Normalized resource request.
    pub fn resource_request(&self) -> ResourceRequest {
        ResourceRequest::new(self.gpu_type, self.gpu_count.gpu_count(), self.memory.memory_gb())
    }
}

/// Error payload for remote exposure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl From<&SchedulerError> for ErrorBody {
    fn from(err: &SchedulerError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Workloads awaiting a decision, waiting to run, and running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// `pending`, in submission order.
    pub pending: Vec<Workload>,
    /// `queued`, in scheduling order.
    pub queued: Vec<Workload>,
    /// `running`.
    pub running: Vec<Workload>,
}

/// Health response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
    /// Number of workloads currently running.
    pub running: usize,
}

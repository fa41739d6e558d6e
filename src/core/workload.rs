//! Workload records, lifecycle states, and produced artifacts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::ValidationReport;
use crate::util::serde::{ArtifactId, JobDefinitionId, Priority, ResourceRequest, ValidationRunId, WorkloadId};

/// Lifecycle state of a workload.
///
/// ```text
/// submit (auto-admit)   -> Queued
/// submit (gated)        -> Pending
/// Pending  --approve--> Queued      (minimum execution test passed)
/// Pending  --reject---> Rejected
/// Queued   --select---> Running
/// Running  --finish---> Completed   (emits an artifact) | Failed
/// Queued/Running --cancel--> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadStatus {
    /// Waiting for approval.
    Pending,
    /// Eligible for scheduling.
    Queued,
    /// Holding the execution slot.
    Running,
    /// Finished and produced an artifact.
    Completed,
    /// Execution failed; no artifact. Requires resubmission.
    Failed,
    /// Rejected at the approval gate.
    Rejected,
    /// Cancelled while queued or running.
    Cancelled,
}

impl WorkloadStatus {
    /// Terminal states accept no further transitions.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Rejected | Self::Cancelled
        )
    }
}

impl std::fmt::Display for WorkloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// State of a workload's minimum execution test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    /// Not started.
    Waiting,
    /// In progress.
    Running,
    /// Passed; the workload may be approved.
    Passed,
    /// Failed; may be re-run.
    Failed,
}

/// Mandatory pre-approval test carried by gated workloads only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimumExecutionTest {
    /// Current state.
    pub status: TestStatus,
    /// Number of times the test was started.
    pub attempts: u32,
    /// Performance summary, once passed.
    pub report: Option<ValidationReport>,
    /// Log of the latest finished attempt.
    pub log: Option<String>,
    /// Failure reason of the latest attempt, if it failed.
    pub failure: Option<String>,
    /// Validation runs started for this test, oldest first. Each attempt
    /// keeps its own record in the validation runner.
    pub runs: Vec<ValidationRunId>,
}

impl MinimumExecutionTest {
    pub(crate) const fn waiting() -> Self {
        Self {
            status: TestStatus::Waiting,
            attempts: 0,
            report: None,
            log: None,
            failure: None,
            runs: Vec::new(),
        }
    }

    /// Run of the latest attempt.
    pub fn current_run(&self) -> Option<&ValidationRunId> {
        self.runs.last()
    }
}

/// A user-submitted request to execute a job definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    /// Identifier.
    pub id: WorkloadId,
    /// Job definition being executed.
    pub job_definition_id: JobDefinitionId,
    /// Display name (the job definition's name).
    pub name: String,
    /// Submitting user.
    pub requester_id: String,
    /// Requested resources, independent of the job's declared demand.
    pub request: ResourceRequest,
    /// Queue priority.
    pub priority: Priority,
    /// Lifecycle state.
    pub status: WorkloadStatus,
    /// Fixed at submission by the resource policy.
    pub needs_approval: bool,
    /// Prior validation run, annotation only.
    pub test_run_ref: Option<ValidationRunId>,
    /// Present iff `needs_approval`.
    pub min_test: Option<MinimumExecutionTest>,
    /// Monotonic submission sequence used for FIFO tie-breaks.
    pub sequence: u64,
    /// Submission time (ms since epoch).
    pub submitted_at_ms: u128,
    /// Approval time (ms since epoch).
    pub approved_at_ms: Option<u128>,
    /// Time the workload left `running` (ms since epoch).
    pub completed_at_ms: Option<u128>,
    /// Reason for a `failed` status.
    pub failure: Option<String>,
    /// Artifact produced on completion.
    pub artifact_id: Option<ArtifactId>,
}

impl Workload {
    /// Status of the minimum execution test, if the workload carries one.
    pub fn test_status(&self) -> Option<TestStatus> {
        self.min_test.as_ref().map(|t| t.status)
    }
}

/// Derived output record, created exactly once when a workload completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Identifier.
    pub id: ArtifactId,
    /// Producing workload.
    pub workload_id: WorkloadId,
    /// Artifact name.
    pub name: String,
    /// Creation time (ms since epoch).
    pub created_at_ms: u128,
    /// Human-readable size, e.g. `1.2 GB`.
    pub size: String,
    /// Metric name to formatted value.
    pub metrics: BTreeMap<String, String>,
}

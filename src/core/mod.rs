//! Core admission and scheduling: policy, validation, workload state, queue,
//! scheduler loop, and approval gate.

pub mod audit;
pub mod error;
pub mod executor;
pub mod gate;
pub mod job;
pub mod policy;
pub mod queue;
pub mod scheduler;
pub mod sink;
pub mod store;
pub mod usage;
pub mod validation;
pub mod workload;

pub use audit::{build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink};
pub use error::{AppResult, SchedulerError};
pub use executor::{
    artifact_name, simulated_artifact, ArtifactDraft, ExecutionOutcome, SimulatedExecutor, Spawn,
    WorkloadExecutor,
};
pub use gate::ApprovalGate;
pub use job::{ComponentSpec, JobCatalog, JobDefinition, ResourceDemand};
pub use policy::{parse_gpu_count, parse_mem_gb, AdmissionDecision, ResourcePolicy, DEFAULT_GPU_COUNT};
pub use queue::{next_eligible, scheduling_order, QueueKey};
pub use scheduler::{SchedulerHandle, SchedulerLoop, Trigger};
pub use sink::ArtifactSink;
pub use store::{Cancellation, MinTestStart, NewWorkload, PriorityStep, WorkloadStore};
pub use usage::{usage_report, UsageLine, UsageReport};
pub use validation::{
    passing_report, SimulatedProbe, ValidationError, ValidationOutcome, ValidationProbe,
    ValidationReport, ValidationRun, ValidationRunner, ValidationStatus, ValidationSubject,
};
pub use workload::{Artifact, MinimumExecutionTest, TestStatus, Workload, WorkloadStatus};

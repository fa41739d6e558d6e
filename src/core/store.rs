//! Workload store: the authoritative record of every workload and the only
//! component that mutates workload status.
//!
//! All reads-then-writes happen under one `parking_lot::Mutex`, so "count the
//! running workloads, pick the next queued one, mark it running" is a single
//! atomic step. Preconditions are enforced here regardless of what the caller
//! already checked.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::core::queue::{next_eligible, scheduling_order};
use crate::core::{
    build_audit_event, AdmissionDecision, Artifact, ArtifactDraft, AuditAction, AuditSink,
    MinimumExecutionTest, SchedulerError, TestStatus, ValidationOutcome, Workload, WorkloadStatus,
};
use crate::util::clock::now_ms;
use crate::util::serde::{ArtifactId, JobDefinitionId, Priority, ResourceRequest, ValidationRunId, WorkloadId};

/// Fields of a workload supplied at submission.
#[derive(Debug, Clone)]
pub struct NewWorkload {
    /// Job definition to execute.
    pub job_definition_id: JobDefinitionId,
    /// Display name.
    pub name: String,
    /// Submitting user.
    pub requester_id: String,
    /// Normalized resource request.
    pub request: ResourceRequest,
    /// Initial priority.
    pub priority: Priority,
    /// Optional prior validation run.
    pub test_run_ref: Option<ValidationRunId>,
}

/// Result of asking to start a minimum execution test.
#[derive(Debug, Clone, PartialEq)]
pub enum MinTestStart {
    /// The test moved to `running`; the caller must run the probe.
    Started(Workload),
    /// A test is already running; nothing was started.
    AlreadyRunning(Workload),
    /// The test already passed; nothing was started.
    AlreadyPassed(Workload),
}

/// Direction of a one-step priority change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityStep {
    /// Towards `high`.
    Up,
    /// Towards `low`.
    Down,
}

/// Result of cancelling a workload.
#[derive(Debug, Clone, PartialEq)]
pub struct Cancellation {
    /// The cancelled workload.
    pub workload: Workload,
    /// Whether it held the execution slot.
    pub was_running: bool,
}

#[derive(Default)]
struct StoreState {
    workloads: HashMap<WorkloadId, Workload>,
    next_sequence: u64,
}

impl StoreState {
    fn running_count(&self) -> usize {
        self.workloads
            .values()
            .filter(|w| w.status == WorkloadStatus::Running)
            .count()
    }

    fn workload_mut(&mut self, id: &WorkloadId) -> Result<&mut Workload, SchedulerError> {
        self.workloads
            .get_mut(id)
            .ok_or_else(|| SchedulerError::not_found("workload", id))
    }
}

/// Mutex-guarded workload state shared by the scheduler loop, the approval
/// gate, and the submission interface.
pub struct WorkloadStore {
    state: Mutex<StoreState>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl Default for WorkloadStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkloadStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            audit: None,
        }
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Record a new workload. Auto-admitted workloads start `queued`; gated
    /// ones start `pending` with a `waiting` minimum execution test.
    pub fn submit(&self, new: NewWorkload, decision: AdmissionDecision) -> Workload {
        let needs_approval = decision.needs_approval();
        let workload = {
            let mut state = self.state.lock();
            let sequence = state.next_sequence;
            state.next_sequence += 1;
            let workload = Workload {
                id: WorkloadId::generate(),
                job_definition_id: new.job_definition_id,
                name: new.name,
                requester_id: new.requester_id,
                request: new.request,
                priority: new.priority,
                status: if needs_approval {
                    WorkloadStatus::Pending
                } else {
                    WorkloadStatus::Queued
                },
                needs_approval,
                test_run_ref: new.test_run_ref,
                min_test: needs_approval.then(MinimumExecutionTest::waiting),
                sequence,
                submitted_at_ms: now_ms(),
                approved_at_ms: None,
                completed_at_ms: None,
                failure: None,
                artifact_id: None,
            };
            state.workloads.insert(workload.id.clone(), workload.clone());
            workload
        };
        info!(
            workload_id = %workload.id,
            requester = %workload.requester_id,
            gpus = %workload.request.gpu_label(),
            memory_gb = workload.request.memory_gb,
            priority = %workload.priority,
            status = %workload.status,
            "workload submitted"
        );
        let action = if needs_approval {
            AuditAction::Park
        } else {
            AuditAction::Admit
        };
        self.audit(&workload, action, None);
        workload
    }

    /// Fetch a workload.
    pub fn get(&self, id: &WorkloadId) -> Result<Workload, SchedulerError> {
        self.state
            .lock()
            .workloads
            .get(id)
            .cloned()
            .ok_or_else(|| SchedulerError::not_found("workload", id))
    }

    /// All workloads in submission order.
    pub fn list(&self) -> Vec<Workload> {
        let mut all: Vec<Workload> = self.state.lock().workloads.values().cloned().collect();
        all.sort_by_key(|w| w.sequence);
        all
    }

    /// Workloads in one status, in submission order.
    pub fn list_by_status(&self, status: WorkloadStatus) -> Vec<Workload> {
        let mut matching: Vec<Workload> = self
            .state
            .lock()
            .workloads
            .values()
            .filter(|w| w.status == status)
            .cloned()
            .collect();
        matching.sort_by_key(|w| w.sequence);
        matching
    }

    /// Queued workloads in the order the scheduler would pick them.
    pub fn queued_in_order(&self) -> Vec<Workload> {
        let state = self.state.lock();
        scheduling_order(state.workloads.values())
            .into_iter()
            .cloned()
            .collect()
    }

    /// Number of workloads in `running`.
    pub fn running_count(&self) -> usize {
        self.state.lock().running_count()
    }

    /// `pending -> queued`. Fails with `PreconditionFailed` unless the workload
    /// is pending and, when gated, its minimum execution test has passed.
    pub fn approve(&self, id: &WorkloadId) -> Result<Workload, SchedulerError> {
        let workload = {
            let mut state = self.state.lock();
            let workload = state.workload_mut(id)?;
            if workload.status != WorkloadStatus::Pending {
                return Err(SchedulerError::PreconditionFailed(format!(
                    "workload {id} is {}, not pending",
                    workload.status
                )));
            }
            if workload.needs_approval && workload.test_status() != Some(TestStatus::Passed) {
                return Err(SchedulerError::PreconditionFailed(format!(
                    "workload {id} cannot be approved before its minimum execution test passes"
                )));
            }
            workload.status = WorkloadStatus::Queued;
            workload.approved_at_ms = Some(now_ms());
            workload.clone()
        };
        info!(workload_id = %id, "workload approved");
        self.audit(&workload, AuditAction::Approve, None);
        Ok(workload)
    }

    /// `pending -> rejected`, regardless of test status.
    pub fn reject(&self, id: &WorkloadId) -> Result<Workload, SchedulerError> {
        let workload = {
            let mut state = self.state.lock();
            let workload = state.workload_mut(id)?;
            if workload.status != WorkloadStatus::Pending {
                return Err(SchedulerError::PreconditionFailed(format!(
                    "workload {id} is {}, only pending workloads can be rejected",
                    workload.status
                )));
            }
            workload.status = WorkloadStatus::Rejected;
            workload.clone()
        };
        info!(workload_id = %id, "workload rejected");
        self.audit(&workload, AuditAction::Reject, None);
        Ok(workload)
    }

    /// Change the priority of a queued workload.
    pub fn set_priority(&self, id: &WorkloadId, priority: Priority) -> Result<Workload, SchedulerError> {
        self.reprioritize(id, |_| priority)
    }

    /// Move a queued workload one priority step, saturating at the ends.
    pub fn bump_priority(&self, id: &WorkloadId, step: PriorityStep) -> Result<Workload, SchedulerError> {
        self.reprioritize(id, |current| match step {
            PriorityStep::Up => current.raised(),
            PriorityStep::Down => current.lowered(),
        })
    }

    fn reprioritize<F>(&self, id: &WorkloadId, next: F) -> Result<Workload, SchedulerError>
    where
        F: FnOnce(Priority) -> Priority,
    {
        let (workload, previous) = {
            let mut state = self.state.lock();
            let workload = state.workload_mut(id)?;
            if workload.status != WorkloadStatus::Queued {
                return Err(SchedulerError::PreconditionFailed(format!(
                    "priority of workload {id} is fixed while {}",
                    workload.status
                )));
            }
            let previous = workload.priority;
            workload.priority = next(previous);
            (workload.clone(), previous)
        };
        info!(workload_id = %id, from = %previous, to = %workload.priority, "priority changed");
        self.audit(
            &workload,
            AuditAction::Reprioritize,
            Some(format!("{previous} -> {}", workload.priority)),
        );
        Ok(workload)
    }

    /// Move a pending workload's minimum execution test to `running`.
    ///
    /// Idempotent while a test is running or after it passed. A failed test
    /// may be started again. Every start allocates a fresh validation run id,
    /// appended to the test's run list.
    pub fn begin_min_test(&self, id: &WorkloadId) -> Result<MinTestStart, SchedulerError> {
        let start = {
            let mut state = self.state.lock();
            let workload = state.workload_mut(id)?;
            if workload.status != WorkloadStatus::Pending {
                return Err(SchedulerError::PreconditionFailed(format!(
                    "workload {id} is {}, minimum execution test requires pending",
                    workload.status
                )));
            }
            let Some(test) = workload.min_test.as_mut() else {
                return Err(SchedulerError::PreconditionFailed(format!(
                    "workload {id} does not require a minimum execution test"
                )));
            };
            match test.status {
                TestStatus::Running => MinTestStart::AlreadyRunning(workload.clone()),
                TestStatus::Passed => MinTestStart::AlreadyPassed(workload.clone()),
                TestStatus::Waiting | TestStatus::Failed => {
                    test.status = TestStatus::Running;
                    test.attempts += 1;
                    test.failure = None;
                    test.runs.push(ValidationRunId::generate());
                    MinTestStart::Started(workload.clone())
                }
            }
        };
        match &start {
            MinTestStart::Started(w) => {
                info!(workload_id = %id, "minimum execution test started");
                self.audit(w, AuditAction::TestStart, None);
            }
            MinTestStart::AlreadyRunning(_) => {
                debug!(workload_id = %id, "minimum execution test already running");
            }
            MinTestStart::AlreadyPassed(_) => {
                debug!(workload_id = %id, "minimum execution test already passed");
            }
        }
        Ok(start)
    }

    /// Record the outcome of a running minimum execution test. Discarded with
    /// `PreconditionFailed` if the workload left `pending` in the meantime.
    pub fn finish_min_test(
        &self,
        id: &WorkloadId,
        outcome: ValidationOutcome,
    ) -> Result<Workload, SchedulerError> {
        let workload = {
            let mut state = self.state.lock();
            let workload = state.workload_mut(id)?;
            if workload.status != WorkloadStatus::Pending {
                return Err(SchedulerError::PreconditionFailed(format!(
                    "workload {id} is {}, test result discarded",
                    workload.status
                )));
            }
            let test = workload
                .min_test
                .as_mut()
                .filter(|t| t.status == TestStatus::Running)
                .ok_or_else(|| {
                    SchedulerError::PreconditionFailed(format!(
                        "workload {id} has no running minimum execution test"
                    ))
                })?;
            match outcome {
                ValidationOutcome::Passed(report) => {
                    test.status = TestStatus::Passed;
                    test.log = Some(report.log.clone());
                    test.report = Some(report);
                }
                ValidationOutcome::Failed { reason, log, .. } => {
                    test.status = TestStatus::Failed;
                    test.log = Some(log);
                    test.failure = Some(reason);
                }
            }
            workload.clone()
        };
        let status = workload.test_status();
        info!(workload_id = %id, ?status, "minimum execution test finished");
        self.audit(&workload, AuditAction::TestFinish, status.map(|s| format!("{s:?}")));
        Ok(workload)
    }

    /// Atomically check the running count against `cap` and, if a slot is
    /// free, move the next eligible queued workload to `running`.
    ///
    /// Returns `ConcurrencyViolation` if more than `cap` workloads are already
    /// running; that indicates a scheduling bug.
    pub fn start_next(&self, cap: usize) -> Result<Option<Workload>, SchedulerError> {
        let workload = {
            let mut state = self.state.lock();
            let running = state.running_count();
            if running > cap {
                error!(running, cap, "more workloads running than the concurrency cap");
                return Err(SchedulerError::ConcurrencyViolation { running, cap });
            }
            if running == cap {
                return Ok(None);
            }
            let Some(id) = next_eligible(state.workloads.values()).map(|w| w.id.clone()) else {
                return Ok(None);
            };
            let workload = state.workload_mut(&id)?;
            workload.status = WorkloadStatus::Running;
            workload.clone()
        };
        info!(workload_id = %workload.id, priority = %workload.priority, "workload started");
        self.audit(&workload, AuditAction::Start, None);
        Ok(Some(workload))
    }

    /// `running -> completed`, creating the workload's one artifact.
    pub fn complete(
        &self,
        id: &WorkloadId,
        draft: ArtifactDraft,
    ) -> Result<(Workload, Artifact), SchedulerError> {
        let (workload, artifact) = {
            let mut state = self.state.lock();
            let workload = state.workload_mut(id)?;
            if workload.status != WorkloadStatus::Running {
                return Err(SchedulerError::PreconditionFailed(format!(
                    "workload {id} is {}, only running workloads complete",
                    workload.status
                )));
            }
            let now = now_ms();
            let artifact = Artifact {
                id: ArtifactId::generate(),
                workload_id: id.clone(),
                name: draft.name,
                created_at_ms: now,
                size: draft.size,
                metrics: draft.metrics,
            };
            workload.status = WorkloadStatus::Completed;
            workload.completed_at_ms = Some(now);
            workload.artifact_id = Some(artifact.id.clone());
            (workload.clone(), artifact)
        };
        info!(workload_id = %id, artifact_id = %artifact.id, "workload completed");
        self.audit(&workload, AuditAction::Complete, Some(artifact.id.to_string()));
        Ok((workload, artifact))
    }

    /// `running -> failed`. No artifact is created.
    pub fn fail(&self, id: &WorkloadId, reason: impl Into<String>) -> Result<Workload, SchedulerError> {
        let reason = reason.into();
        let workload = {
            let mut state = self.state.lock();
            let workload = state.workload_mut(id)?;
            if workload.status != WorkloadStatus::Running {
                return Err(SchedulerError::PreconditionFailed(format!(
                    "workload {id} is {}, only running workloads fail",
                    workload.status
                )));
            }
            workload.status = WorkloadStatus::Failed;
            workload.completed_at_ms = Some(now_ms());
            workload.failure = Some(reason.clone());
            workload.clone()
        };
        warn!(workload_id = %id, %reason, "workload failed");
        self.audit(&workload, AuditAction::Fail, Some(reason));
        Ok(workload)
    }

    /// `queued | running -> cancelled`. Frees the execution slot immediately.
    pub fn cancel(&self, id: &WorkloadId) -> Result<Cancellation, SchedulerError> {
        let cancellation = {
            let mut state = self.state.lock();
            let workload = state.workload_mut(id)?;
            let was_running = match workload.status {
                WorkloadStatus::Running => true,
                WorkloadStatus::Queued => false,
                other => {
                    return Err(SchedulerError::PreconditionFailed(format!(
                        "workload {id} is {other}, only queued or running workloads can be cancelled"
                    )))
                }
            };
            workload.status = WorkloadStatus::Cancelled;
            if was_running {
                workload.completed_at_ms = Some(now_ms());
            }
            Cancellation {
                workload: workload.clone(),
                was_running,
            }
        };
        info!(workload_id = %id, was_running = cancellation.was_running, "workload cancelled");
        self.audit(&cancellation.workload, AuditAction::Cancel, None);
        Ok(cancellation)
    }

    /// Verify the store-wide invariants: at most `cap` running workloads, and
    /// every gated workload past `pending` has a passed minimum execution test.
    pub fn check_invariants(&self, cap: usize) -> Result<(), SchedulerError> {
        let state = self.state.lock();
        let running = state.running_count();
        if running > cap {
            return Err(SchedulerError::ConcurrencyViolation { running, cap });
        }
        let ungated = state.workloads.values().find(|w| {
            w.needs_approval
                && matches!(
                    w.status,
                    WorkloadStatus::Queued | WorkloadStatus::Running | WorkloadStatus::Completed
                )
                && w.test_status() != Some(TestStatus::Passed)
        });
        if let Some(w) = ungated {
            return Err(SchedulerError::PreconditionFailed(format!(
                "workload {} is {} without a passed minimum execution test",
                w.id, w.status
            )));
        }
        Ok(())
    }

    fn audit(&self, workload: &Workload, action: AuditAction, detail: Option<String>) {
        if let Some(sink) = &self.audit {
            sink.record(build_audit_event(
                &workload.id,
                workload.requester_id.clone(),
                action,
                detail,
            ));
        }
    }
}

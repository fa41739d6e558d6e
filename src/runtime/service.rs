//! `AdmissionService`: the single entry point for submission, validation,
//! approval and queue management.
//!
//! The service owns no state of its own. It evaluates the resource policy,
//! delegates every mutation to the shared [`WorkloadStore`], and wakes the
//! scheduler loop when a workload becomes `queued` or leaves `running`.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::SchedulerConfig;
use crate::core::{
    usage_report, ApprovalGate, InMemoryAuditSink, JobCatalog, JobDefinition, NewWorkload, PriorityStep,
    ResourcePolicy, SchedulerError, SchedulerHandle, Spawn, Trigger, UsageReport, ValidationError,
    ValidationProbe, ValidationRun, ValidationRunner, Workload, WorkloadStatus, WorkloadStore,
};
use crate::infra::InMemoryArtifactSink;
use crate::runtime::api::{Health, QueueSnapshot, SubmissionRequest};
use crate::util::serde::{JobDefinitionId, Priority, ValidationRunId, WorkloadId};

/// Facade over the scheduler components. Build with
/// [`crate::builders::ServiceBuilder`].
pub struct AdmissionService<V, S> {
    config: SchedulerConfig,
    policy: ResourcePolicy,
    catalog: Arc<JobCatalog>,
    store: Arc<WorkloadStore>,
    runner: Arc<ValidationRunner<V, S>>,
    gate: ApprovalGate<V, S>,
    scheduler: SchedulerHandle,
    sinks: BuiltinSinks,
}

/// In-memory sinks created by the builder when the caller supplied none.
#[derive(Default)]
pub(crate) struct BuiltinSinks {
    pub(crate) audit: Option<Arc<InMemoryAuditSink>>,
    pub(crate) artifacts: Option<Arc<InMemoryArtifactSink>>,
}

impl<V, S> AdmissionService<V, S>
where
    V: ValidationProbe,
    S: Spawn,
{
    pub(crate) fn new(
        config: SchedulerConfig,
        catalog: Arc<JobCatalog>,
        store: Arc<WorkloadStore>,
        runner: Arc<ValidationRunner<V, S>>,
        scheduler: SchedulerHandle,
        sinks: BuiltinSinks,
    ) -> Self {
        let gate = ApprovalGate::new(
            Arc::clone(&store),
            Arc::clone(&catalog),
            Arc::clone(&runner),
            scheduler.clone(),
        );
        Self {
            policy: ResourcePolicy::from_config(&config),
            config,
            catalog,
            store,
            runner,
            gate,
            scheduler,
            sinks,
        }
    }

    /// Active configuration.
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Admission policy in effect.
    pub const fn policy(&self) -> &ResourcePolicy {
        &self.policy
    }

    /// Shared workload store.
    pub fn store(&self) -> &Arc<WorkloadStore> {
        &self.store
    }

    /// Built-in audit trail. `None` when a custom audit sink was supplied.
    pub const fn audit_log(&self) -> Option<&Arc<InMemoryAuditSink>> {
        self.sinks.audit.as_ref()
    }

    /// Built-in artifact store. `None` when a custom artifact sink was
    /// supplied.
    pub const fn artifacts(&self) -> Option<&Arc<InMemoryArtifactSink>> {
        self.sinks.artifacts.as_ref()
    }

    /// Register a job definition supplied by the external builder.
    pub fn register_job(&self, definition: JobDefinition) -> Arc<JobDefinition> {
        self.catalog.register(definition)
    }

    /// Registered job definitions, ordered by id.
    pub fn jobs(&self) -> Vec<Arc<JobDefinition>> {
        self.catalog.list()
    }

    /// Start a standalone validation of a job definition.
    pub fn start_validation(&self, id: &JobDefinitionId) -> Result<ValidationRun, ValidationError> {
        let job = self.catalog.get(id)?;
        self.runner.start(job)
    }

    /// Look up a validation run.
    pub fn validation_run(&self, id: &ValidationRunId) -> Result<ValidationRun, SchedulerError> {
        self.runner.get(id)
    }

    /// All validation runs, standalone and minimum execution tests, oldest
    /// first.
    pub fn validation_runs(&self) -> Vec<ValidationRun> {
        self.runner.list()
    }

    /// Minimum execution test runs of one workload, oldest first.
    pub fn min_test_runs(&self, id: &WorkloadId) -> Vec<ValidationRun> {
        self.runner.list_for_workload(id)
    }

    /// Submit a workload. The returned record already carries the status the
    /// resource policy decided: `queued` or `pending`.
    pub async fn submit(&self, req: SubmissionRequest) -> Result<Workload, SchedulerError> {
        if req.requester_id.trim().is_empty() {
            return Err(SchedulerError::InvalidRequest("requester_id is empty".into()));
        }
        let job = self.catalog.get(&req.job_definition_id)?;
        if let Some(run) = &req.test_run_ref {
            self.runner.get(run)?;
        }

        let request = req.resource_request();
        let decision = self.policy.evaluate(&request);
        let workload = self.store.submit(
            NewWorkload {
                job_definition_id: job.id.clone(),
                name: req.name.unwrap_or_else(|| job.name.clone()),
                requester_id: req.requester_id,
                request,
                priority: req.priority,
                test_run_ref: req.test_run_ref,
            },
            decision,
        );

        if workload.status == WorkloadStatus::Queued {
            self.scheduler
                .notify(Trigger::WorkloadQueued(workload.id.clone()))
                .await?;
        }
        Ok(workload)
    }

    /// Start the minimum execution test of a pending workload.
    pub fn run_minimum_execution_test(&self, id: &WorkloadId) -> Result<Workload, SchedulerError> {
        self.gate.run_minimum_execution_test(id)
    }

    /// Approve a pending workload whose minimum execution test passed.
    pub async fn approve(&self, id: &WorkloadId) -> Result<Workload, SchedulerError> {
        self.gate.approve(id).await
    }

    /// Reject a pending workload.
    pub fn reject(&self, id: &WorkloadId) -> Result<Workload, SchedulerError> {
        self.gate.reject(id)
    }

    /// Set the priority of a queued workload.
    pub fn set_priority(&self, id: &WorkloadId, priority: Priority) -> Result<Workload, SchedulerError> {
        self.store.set_priority(id, priority)
    }

    /// Move a queued workload one priority step.
    pub fn bump_priority(&self, id: &WorkloadId, step: PriorityStep) -> Result<Workload, SchedulerError> {
        self.store.bump_priority(id, step)
    }

    /// Cancel a queued or running workload. A running workload's execution is
    /// interrupted and its slot goes to the next queued workload.
    pub async fn cancel(&self, id: &WorkloadId) -> Result<Workload, SchedulerError> {
        let cancellation = self.store.cancel(id)?;
        if cancellation.was_running {
            if !self.scheduler.abort_execution(id) {
                debug!(workload_id = %id, "cancelled before its execution was launched");
            }
            self.scheduler
                .notify(Trigger::WorkloadFinished(id.clone()))
                .await?;
        }
        Ok(cancellation.workload)
    }

    /// Fetch a workload.
    pub fn workload(&self, id: &WorkloadId) -> Result<Workload, SchedulerError> {
        self.store.get(id)
    }

    /// All workloads, or those in one status, in submission order.
    pub fn workloads(&self, status: Option<WorkloadStatus>) -> Vec<Workload> {
        match status {
            Some(status) => self.store.list_by_status(status),
            None => self.store.list(),
        }
    }

    /// Pending, queued (in scheduling order) and running workloads.
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            pending: self.store.list_by_status(WorkloadStatus::Pending),
            queued: self.store.queued_in_order(),
            running: self.store.list_by_status(WorkloadStatus::Running),
        }
    }

    /// GPU and memory held by queued and running workloads.
    pub fn usage(&self) -> UsageReport {
        usage_report(&self.store.list(), &self.config.cluster)
    }

    /// Liveness of the scheduler loop.
    pub fn health(&self) -> Health {
        Health {
            ok: !self.scheduler.is_closed(),
            running: self.store.running_count(),
        }
    }

    /// Stop accepting validations and stop the scheduler loop.
    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        self.runner.close();
        self.scheduler.shutdown().await?;
        info!("admission service shut down");
        Ok(())
    }
}

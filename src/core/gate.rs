//! Approval gate: the human-facing decision point for workloads parked in
//! `pending`.
//!
//! The gate forwards every decision to [`WorkloadStore`], which enforces the
//! preconditions itself. A refused approval is reported and logged, never
//! silently accepted.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::{
    JobCatalog, MinTestStart, SchedulerError, SchedulerHandle, Spawn, Trigger, ValidationProbe,
    ValidationRunner, ValidationSubject, Workload, WorkloadStore,
};
use crate::util::serde::WorkloadId;

/// Runs minimum execution tests and records approve/reject decisions.
pub struct ApprovalGate<V, S> {
    store: Arc<WorkloadStore>,
    catalog: Arc<JobCatalog>,
    runner: Arc<ValidationRunner<V, S>>,
    scheduler: SchedulerHandle,
}

impl<V, S> ApprovalGate<V, S>
where
    V: ValidationProbe,
    S: Spawn,
{
    /// Create a gate over shared components.
    pub const fn new(
        store: Arc<WorkloadStore>,
        catalog: Arc<JobCatalog>,
        runner: Arc<ValidationRunner<V, S>>,
        scheduler: SchedulerHandle,
    ) -> Self {
        Self {
            store,
            catalog,
            runner,
            scheduler,
        }
    }

    /// Start the minimum execution test of a pending workload and return it
    /// with test status `running`.
    ///
    /// Each attempt is recorded as a validation run. Calling again while the
    /// test runs, or after it passed, returns the current workload without
    /// starting another test.
    pub fn run_minimum_execution_test(&self, id: &WorkloadId) -> Result<Workload, SchedulerError> {
        let job_definition_id = self.store.get(id)?.job_definition_id;
        let job = self.catalog.get(&job_definition_id)?;

        let workload = match self.store.begin_min_test(id)? {
            MinTestStart::Started(workload) => workload,
            MinTestStart::AlreadyRunning(workload) | MinTestStart::AlreadyPassed(workload) => {
                return Ok(workload)
            }
        };

        let Some(run_id) = workload.min_test.as_ref().and_then(|t| t.current_run()).cloned() else {
            return Err(SchedulerError::PreconditionFailed(format!(
                "workload {id} started a minimum execution test without a run"
            )));
        };
        let store = Arc::clone(&self.store);
        let workload_id = workload.id.clone();
        let subject = ValidationSubject::Workload {
            workload_id: workload.id.clone(),
            job,
            request: workload.request,
        };
        self.runner.start_min_test(run_id, subject, move |outcome| {
            if let Err(err) = store.finish_min_test(&workload_id, outcome) {
                debug!(workload_id = %workload_id, %err, "minimum execution test result discarded");
            }
        });
        Ok(workload)
    }

    /// Approve a pending workload and wake the scheduler.
    pub async fn approve(&self, id: &WorkloadId) -> Result<Workload, SchedulerError> {
        let workload = self.store.approve(id).inspect_err(|err| {
            warn!(workload_id = %id, %err, "approval refused");
        })?;
        self.scheduler
            .notify(Trigger::WorkloadQueued(workload.id.clone()))
            .await?;
        Ok(workload)
    }

    /// Reject a pending workload. Always allowed while `pending`.
    pub fn reject(&self, id: &WorkloadId) -> Result<Workload, SchedulerError> {
        self.store.reject(id)
    }
}

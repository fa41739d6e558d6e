//! Validation runner: short-lived correctness checks against a job definition
//! or a pending workload.
//!
//! Both use sites share one state machine (`running -> passed | failed`) and
//! both leave a [`ValidationRun`] in the runner's ledger. A standalone run
//! against a job definition may be referenced by a later submission; a
//! minimum execution test against a pending workload gates its approval.
//! Re-running creates a new record; finished records are never overwritten.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{JobDefinition, SchedulerError, Spawn};
use crate::util::clock::now_ms;
use crate::util::seed::stable_seed;
use crate::util::serde::{JobDefinitionId, ResourceRequest, ValidationRunId, WorkloadId};

/// Errors returned when starting a validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The runner was closed and accepts no new runs.
    #[error("validation runner closed")]
    RunnerClosed,
    /// Lookup or state error from the scheduler.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// State of a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// In progress.
    Running,
    /// Finished successfully.
    Passed,
    /// Finished unsuccessfully.
    Failed,
}

/// Performance summary of a passed validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Fraction of checks that succeeded, `0.0..=1.0`.
    pub success_rate: f64,
    /// Whether the short training loop converged.
    pub converged: bool,
    /// Measured duration in milliseconds.
    pub duration_ms: u64,
    /// Human-readable log.
    pub log: String,
}

/// Tagged result of a validation probe.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// All checks passed.
    Passed(ValidationReport),
    /// A check failed.
    Failed {
        /// Why the validation failed.
        reason: String,
        /// Log up to the failure.
        log: String,
        /// Measured duration in milliseconds.
        duration_ms: u64,
    },
}

impl ValidationOutcome {
    /// Terminal status corresponding to this outcome.
    pub const fn status(&self) -> ValidationStatus {
        match self {
            Self::Passed(_) => ValidationStatus::Passed,
            Self::Failed { .. } => ValidationStatus::Failed,
        }
    }
}

/// What a probe validates.
#[derive(Debug, Clone)]
pub enum ValidationSubject {
    /// Standalone validation of a job definition at its default resources.
    Job(Arc<JobDefinition>),
    /// Minimum execution test of a pending workload at its requested resources.
    Workload {
        /// Workload under test.
        workload_id: WorkloadId,
        /// Job definition the workload executes.
        job: Arc<JobDefinition>,
        /// Resources the workload requested.
        request: ResourceRequest,
    },
}

impl ValidationSubject {
    /// Job definition under test.
    pub fn job(&self) -> &Arc<JobDefinition> {
        match self {
            Self::Job(job) | Self::Workload { job, .. } => job,
        }
    }

    /// Resources the check runs with.
    pub fn request(&self) -> ResourceRequest {
        match self {
            Self::Job(job) => job.default_request(),
            Self::Workload { request, .. } => *request,
        }
    }

    /// Workload under test, for minimum execution tests.
    pub const fn workload_id(&self) -> Option<&WorkloadId> {
        match self {
            Self::Job(_) => None,
            Self::Workload { workload_id, .. } => Some(workload_id),
        }
    }

    fn seed_key(&self) -> &str {
        match self {
            Self::Job(job) => job.id.as_str(),
            Self::Workload { workload_id, .. } => workload_id.as_str(),
        }
    }
}

/// Performs the actual correctness check.
#[async_trait]
pub trait ValidationProbe: Send + Sync + Clone + 'static {
    /// Run the check to completion.
    async fn probe(&self, subject: ValidationSubject) -> ValidationOutcome;
}

/// Probe that always passes after a fixed delay. Standalone runs and minimum
/// execution tests use separate delays.
#[derive(Debug, Clone)]
pub struct SimulatedProbe {
    job_delay: Duration,
    workload_delay: Duration,
}

impl SimulatedProbe {
    /// Create a probe with the given delays.
    pub const fn new(job_delay: Duration, workload_delay: Duration) -> Self {
        Self {
            job_delay,
            workload_delay,
        }
    }
}

#[async_trait]
impl ValidationProbe for SimulatedProbe {
    async fn probe(&self, subject: ValidationSubject) -> ValidationOutcome {
        let delay = match subject {
            ValidationSubject::Job(_) => self.job_delay,
            ValidationSubject::Workload { .. } => self.workload_delay,
        };
        let started = tokio::time::Instant::now();
        tokio::time::sleep(delay).await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        ValidationOutcome::Passed(passing_report(&subject, duration_ms))
    }
}

/// Report for a passing check; the success rate is seeded by the subject id.
pub fn passing_report(subject: &ValidationSubject, duration_ms: u64) -> ValidationReport {
    let mut rng = StdRng::seed_from_u64(stable_seed(subject.seed_key()));
    let success_rate: f64 = rng.random_range(0.9..1.0);
    let job = subject.job();
    let log = format!(
        "[OK] image loaded ({gpu})\n\
         [OK] environment verified\n\
         [OK] components initialised ({count})\n\
         [OK] run finished ({duration_ms} ms)\n\
         Result: PASS",
        gpu = subject.request().gpu_label(),
        count = job.components.len(),
    );
    ValidationReport {
        success_rate,
        converged: true,
        duration_ms,
        log,
    }
}

/// Record of one validation run. Immutable once passed or failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRun {
    /// Identifier.
    pub id: ValidationRunId,
    /// Validated job definition.
    pub job_definition_id: JobDefinitionId,
    /// Job name at the time of the run.
    pub job_name: String,
    /// Workload under test, set for minimum execution tests.
    pub workload_id: Option<WorkloadId>,
    /// Current state.
    pub status: ValidationStatus,
    /// Start time (ms since epoch).
    pub started_at_ms: u128,
    /// Duration, once finished.
    pub duration_ms: Option<u64>,
    /// Log, once finished.
    pub log: String,
    /// Performance summary, once passed.
    pub report: Option<ValidationReport>,
    /// Failure reason, once failed.
    pub failure: Option<String>,
}

impl ValidationRun {
    fn finish(&mut self, outcome: ValidationOutcome) {
        self.status = outcome.status();
        match outcome {
            ValidationOutcome::Passed(report) => {
                self.duration_ms = Some(report.duration_ms);
                self.log.clone_from(&report.log);
                self.report = Some(report);
            }
            ValidationOutcome::Failed {
                reason,
                log,
                duration_ms,
            } => {
                self.duration_ms = Some(duration_ms);
                self.log = log;
                self.failure = Some(reason);
            }
        }
    }
}

#[derive(Debug, Default)]
struct RunLedger {
    runs: HashMap<ValidationRunId, ValidationRun>,
    order: Vec<ValidationRunId>,
}

/// Starts validations asynchronously and keeps every run record.
pub struct ValidationRunner<V, S> {
    probe: V,
    spawner: S,
    ledger: Arc<Mutex<RunLedger>>,
    closed: AtomicBool,
}

impl<V, S> ValidationRunner<V, S>
where
    V: ValidationProbe,
    S: Spawn,
{
    /// Create a runner.
    pub fn new(probe: V, spawner: S) -> Self {
        Self {
            probe,
            spawner,
            ledger: Arc::new(Mutex::new(RunLedger::default())),
            closed: AtomicBool::new(false),
        }
    }

    /// Start a standalone validation of `job`. Returns the `running` record
    /// immediately; its status changes when the probe finishes.
    pub fn start(&self, job: Arc<JobDefinition>) -> Result<ValidationRun, ValidationError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ValidationError::RunnerClosed);
        }
        Ok(self.launch(ValidationRunId::generate(), ValidationSubject::Job(job), |_| {}))
    }

    /// Start a minimum execution test under `run_id`. The run is recorded like
    /// a standalone one; `on_done` receives the outcome after the record is
    /// updated. Not affected by [`ValidationRunner::close`], so a test started
    /// before shutdown can still be retried.
    pub fn start_min_test<F>(
        &self,
        run_id: ValidationRunId,
        subject: ValidationSubject,
        on_done: F,
    ) -> ValidationRun
    where
        F: FnOnce(ValidationOutcome) + Send + 'static,
    {
        self.launch(run_id, subject, on_done)
    }

    fn launch<F>(&self, run_id: ValidationRunId, subject: ValidationSubject, on_done: F) -> ValidationRun
    where
        F: FnOnce(ValidationOutcome) + Send + 'static,
    {
        let job = subject.job();
        let run = ValidationRun {
            id: run_id,
            job_definition_id: job.id.clone(),
            job_name: job.name.clone(),
            workload_id: subject.workload_id().cloned(),
            status: ValidationStatus::Running,
            started_at_ms: now_ms(),
            duration_ms: None,
            log: String::new(),
            report: None,
            failure: None,
        };
        {
            let mut ledger = self.ledger.lock();
            ledger.order.push(run.id.clone());
            ledger.runs.insert(run.id.clone(), run.clone());
        }
        tracing::info!(run_id = %run.id, job_id = %run.job_definition_id, workload_id = ?run.workload_id, "validation started");

        let probe = self.probe.clone();
        let ledger = Arc::clone(&self.ledger);
        let run_id = run.id.clone();
        self.spawner.spawn(async move {
            let outcome = probe.probe(subject).await;
            let status = outcome.status();
            if let Some(record) = ledger.lock().runs.get_mut(&run_id) {
                record.finish(outcome.clone());
            }
            tracing::info!(run_id = %run_id, ?status, "validation finished");
            on_done(outcome);
        });
        run
    }

    /// Look up a run.
    pub fn get(&self, id: &ValidationRunId) -> Result<ValidationRun, SchedulerError> {
        self.ledger
            .lock()
            .runs
            .get(id)
            .cloned()
            .ok_or_else(|| SchedulerError::not_found("validation run", id))
    }

    /// All runs, oldest first.
    pub fn list(&self) -> Vec<ValidationRun> {
        let ledger = self.ledger.lock();
        ledger
            .order
            .iter()
            .filter_map(|id| ledger.runs.get(id).cloned())
            .collect()
    }

    /// Minimum execution test runs of one workload, oldest first.
    pub fn list_for_workload(&self, workload_id: &WorkloadId) -> Vec<ValidationRun> {
        self.list()
            .into_iter()
            .filter(|run| run.workload_id.as_ref() == Some(workload_id))
            .collect()
    }

    /// Stop accepting standalone runs. Runs in flight still finish.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

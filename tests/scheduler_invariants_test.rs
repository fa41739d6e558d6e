//! Invariant and failure-path tests for the scheduler.
//!
//! These tests validate:
//! - Never more running workloads than the concurrency cap, under random load
//! - Gated workloads never run without a passed minimum execution test
//! - Execution and validation failures end in terminal states, not lost tasks
//! - Cancellation frees the slot immediately

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gpu_admission::builders::ServiceBuilder;
use gpu_admission::config::SchedulerConfig;
use gpu_admission::core::{
    passing_report, ComponentSpec, ExecutionOutcome, JobDefinition, PriorityStep,
    SimulatedExecutor, SimulatedProbe, TestStatus, ValidationOutcome, ValidationProbe,
    ValidationStatus, ValidationSubject, Workload, WorkloadExecutor, WorkloadStatus,
};
use gpu_admission::infra::InMemoryArtifactSink;
use gpu_admission::runtime::{AdmissionService, SubmissionRequest, TokioSpawner};
use gpu_admission::util::serde::{GpuType, JobDefinitionId, Priority};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ============================================================================
// TEST COMPONENTS
// ============================================================================

/// Fails every workload whose name contains "broken".
#[derive(Clone)]
struct FlakyExecutor {
    inner: SimulatedExecutor,
}

#[async_trait]
impl WorkloadExecutor for FlakyExecutor {
    async fn execute(&self, workload: Workload) -> ExecutionOutcome {
        if workload.name.contains("broken") {
            tokio::time::sleep(Duration::from_secs(1)).await;
            return ExecutionOutcome::Failed("CUDA error: out of memory".into());
        }
        self.inner.execute(workload).await
    }
}

/// Fails the first `failures` probes, then passes.
#[derive(Clone)]
struct FailingFirstProbe {
    failures: usize,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ValidationProbe for FailingFirstProbe {
    async fn probe(&self, subject: ValidationSubject) -> ValidationOutcome {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            ValidationOutcome::Failed {
                reason: "environment check failed".into(),
                log: "[OK] image loaded\n[FAIL] environment verified\nResult: FAIL".into(),
                duration_ms: 500,
            }
        } else {
            ValidationOutcome::Passed(passing_report(&subject, 500))
        }
    }
}

fn job() -> JobDefinition {
    JobDefinition::new(
        JobDefinitionId::new("SP-010"),
        "ResNet-Exp-42",
        vec![ComponentSpec {
            name: "trainer".into(),
            gpu_type: GpuType::V100,
            gpu_count: 2,
            memory_gb: 64,
        }],
    )
    .unwrap()
}

fn request(gpus: u32, mem: u32, priority: Priority) -> SubmissionRequest {
    SubmissionRequest::new(JobDefinitionId::new("SP-010"), "tester", GpuType::V100, gpus, mem)
        .with_priority(priority)
}

fn simulated(config: SchedulerConfig) -> (AdmissionService<SimulatedProbe, TokioSpawner>, Arc<InMemoryArtifactSink>) {
    let artifacts = Arc::new(InMemoryArtifactSink::new());
    let service = ServiceBuilder::simulated(config, TokioSpawner::current().unwrap())
        .with_artifact_sink(artifacts.clone())
        .build()
        .unwrap();
    service.register_job(job());
    (service, artifacts)
}

// ============================================================================
// INVARIANTS
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_random_load_respects_invariants() {
    for cap in [1_usize, 2] {
        let config = SchedulerConfig {
            max_concurrent: cap,
            execution_duration_ms: 3_000,
            min_test_duration_ms: 700,
            ..SchedulerConfig::default()
        };
        let (service, artifacts) = simulated(config);
        let mut rng = StdRng::seed_from_u64(0x5eed + cap as u64);
        let priorities = [Priority::Low, Priority::Medium, Priority::High];

        for _ in 0..200 {
            match rng.random_range(0..10) {
                0..=3 => {
                    let gpus = rng.random_range(0..7);
                    let mem = rng.random_range(0..200);
                    let priority = priorities[rng.random_range(0..3)];
                    service.submit(request(gpus, mem, priority)).await.unwrap();
                }
                4 | 5 => {
                    if let Some(w) = service.workloads(Some(WorkloadStatus::Pending)).first() {
                        let _ = service.run_minimum_execution_test(&w.id);
                        let _ = service.approve(&w.id).await;
                    }
                }
                6 => {
                    if let Some(w) = service.workloads(Some(WorkloadStatus::Pending)).last() {
                        let _ = service.reject(&w.id);
                    }
                }
                7 => {
                    if let Some(w) = service.snapshot().queued.last() {
                        let _ = service.bump_priority(&w.id, PriorityStep::Up);
                    }
                }
                8 => {
                    if rng.random_bool(0.3) {
                        if let Some(w) = service.snapshot().running.first() {
                            service.cancel(&w.id).await.unwrap();
                        }
                    }
                }
                _ => {}
            }
            tokio::time::sleep(Duration::from_millis(rng.random_range(0..1_500))).await;

            service.store().check_invariants(cap).unwrap();
            assert!(service.snapshot().running.len() <= cap);
        }

        // drain
        tokio::time::sleep(Duration::from_secs(3_000)).await;
        service.store().check_invariants(cap).unwrap();
        let completed = service.workloads(Some(WorkloadStatus::Completed));
        assert_eq!(artifacts.len(), completed.len());
        for w in &completed {
            assert_eq!(artifacts.by_workload(&w.id).len(), 1);
        }
        for w in service.workloads(None) {
            if w.status != WorkloadStatus::Completed {
                assert!(artifacts.by_workload(&w.id).is_empty());
            }
        }
        service.shutdown().await.unwrap();
    }
}

// ============================================================================
// FAILURE PATHS
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_execution_failure_is_terminal_without_artifact() {
    let artifacts = Arc::new(InMemoryArtifactSink::new());
    let config = SchedulerConfig::default();
    let service = ServiceBuilder::new(
        config.clone(),
        SimulatedProbe::new(config.validation_duration(), config.min_test_duration()),
        FlakyExecutor {
            inner: SimulatedExecutor::new(config.execution_duration()),
        },
        TokioSpawner::current().unwrap(),
    )
    .with_artifact_sink(artifacts.clone())
    .build()
    .unwrap();
    service.register_job(job());

    let mut broken = request(1, 8, Priority::High);
    broken.name = Some("broken-run".into());
    let broken = service.submit(broken).await.unwrap();
    let healthy = service.submit(request(1, 8, Priority::Low)).await.unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    let failed = service.workload(&broken.id).unwrap();
    assert_eq!(failed.status, WorkloadStatus::Failed);
    assert_eq!(failed.failure.as_deref(), Some("CUDA error: out of memory"));
    assert!(failed.artifact_id.is_none());
    assert_eq!(service.workload(&healthy.id).unwrap().status, WorkloadStatus::Running);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(service.workload(&healthy.id).unwrap().status, WorkloadStatus::Completed);
    assert_eq!(artifacts.len(), 1);
    assert!(artifacts.by_workload(&broken.id).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_minimum_execution_test_can_be_retried() {
    let probe = FailingFirstProbe {
        failures: 1,
        calls: Arc::new(AtomicUsize::new(0)),
    };
    let service = ServiceBuilder::new(
        SchedulerConfig::default(),
        probe.clone(),
        SimulatedExecutor::new(Duration::from_secs(10)),
        TokioSpawner::current().unwrap(),
    )
    .build()
    .unwrap();
    service.register_job(job());

    let w = service.submit(request(4, 64, Priority::Medium)).await.unwrap();
    service.run_minimum_execution_test(&w.id).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let failed = service.workload(&w.id).unwrap();
    let test = failed.min_test.unwrap();
    assert_eq!(test.status, TestStatus::Failed);
    assert_eq!(test.failure.as_deref(), Some("environment check failed"));
    assert_eq!(failed.status, WorkloadStatus::Pending);
    assert_eq!(service.approve(&w.id).await.unwrap_err().code(), "precondition_failed");

    let retry = service.run_minimum_execution_test(&w.id).unwrap();
    assert_eq!(retry.min_test.as_ref().unwrap().attempts, 2);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(service.workload(&w.id).unwrap().test_status(), Some(TestStatus::Passed));
    assert_eq!(probe.calls.load(Ordering::SeqCst), 2);

    let runs = service.min_test_runs(&w.id);
    assert_eq!(runs.len(), 2);
    assert_eq!(service.validation_runs().len(), 2);
    assert_eq!(runs[0].status, ValidationStatus::Failed);
    assert_eq!(runs[0].failure.as_deref(), Some("environment check failed"));
    assert!(runs[0].log.contains("[FAIL] environment verified"));
    assert_eq!(runs[1].status, ValidationStatus::Passed);
    let test = service.workload(&w.id).unwrap().min_test.unwrap();
    assert_eq!(test.runs, vec![runs[0].id.clone(), runs[1].id.clone()]);

    assert_eq!(service.approve(&w.id).await.unwrap().status, WorkloadStatus::Queued);
}

#[tokio::test(start_paused = true)]
async fn test_rejecting_during_test_discards_result() {
    let (service, _) = simulated(SchedulerConfig::default());
    let w = service.submit(request(6, 64, Priority::High)).await.unwrap();
    service.run_minimum_execution_test(&w.id).unwrap();
    service.reject(&w.id).unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;
    let rejected = service.workload(&w.id).unwrap();
    assert_eq!(rejected.status, WorkloadStatus::Rejected);
    assert_eq!(rejected.test_status(), Some(TestStatus::Running));
}

// ============================================================================
// CANCELLATION
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_cancel_running_frees_slot_immediately() {
    let (service, artifacts) = simulated(SchedulerConfig::default());
    let first = service.submit(request(1, 8, Priority::High)).await.unwrap();
    let second = service.submit(request(1, 8, Priority::Low)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(service.workload(&first.id).unwrap().status, WorkloadStatus::Running);

    let cancelled = service.cancel(&first.id).await.unwrap();
    assert_eq!(cancelled.status, WorkloadStatus::Cancelled);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(service.workload(&second.id).unwrap().status, WorkloadStatus::Running);

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(service.workload(&first.id).unwrap().status, WorkloadStatus::Cancelled);
    assert!(artifacts.by_workload(&first.id).is_empty());
    assert_eq!(artifacts.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_queued_and_invalid_targets() {
    let (service, _) = simulated(SchedulerConfig::default());
    let running = service.submit(request(1, 8, Priority::High)).await.unwrap();
    let queued = service.submit(request(1, 8, Priority::Low)).await.unwrap();
    let pending = service.submit(request(4, 8, Priority::Low)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let cancelled = service.cancel(&queued.id).await.unwrap();
    assert_eq!(cancelled.status, WorkloadStatus::Cancelled);
    assert_eq!(service.cancel(&queued.id).await.unwrap_err().code(), "precondition_failed");
    assert_eq!(service.cancel(&pending.id).await.unwrap_err().code(), "precondition_failed");

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(service.workload(&running.id).unwrap().status, WorkloadStatus::Completed);
    assert_eq!(service.workload(&queued.id).unwrap().status, WorkloadStatus::Cancelled);
    assert!(service.snapshot().running.is_empty());
}

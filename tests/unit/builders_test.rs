//! Tests for builder modules

use std::sync::Arc;

use gpu_admission::builders::ServiceBuilder;
use gpu_admission::config::SchedulerConfig;
use gpu_admission::core::{AuditAction, InMemoryAuditSink};
use gpu_admission::runtime::{SubmissionRequest, TokioSpawner};
use gpu_admission::util::serde::{GpuType, JobDefinitionId};

fn spawner() -> TokioSpawner {
    TokioSpawner::new(tokio::runtime::Handle::current())
}

#[tokio::test]
async fn test_builder_rejects_invalid_config() {
    let config = SchedulerConfig {
        max_concurrent: 0,
        ..SchedulerConfig::default()
    };
    let err = ServiceBuilder::simulated(config, spawner()).build().err().unwrap();
    assert_eq!(err.code(), "invalid_config");
}

#[tokio::test]
async fn test_builder_applies_config() {
    let config = SchedulerConfig {
        gpu_threshold: 8,
        mem_threshold_gb: 256,
        ..SchedulerConfig::default()
    };
    let service = ServiceBuilder::simulated(config, spawner()).build().unwrap();
    assert_eq!(service.policy().gpu_threshold(), 8);
    assert_eq!(service.policy().mem_threshold_gb(), 256);
    assert!(service.health().ok);
    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_builder_wires_audit_sink() {
    let audit = Arc::new(InMemoryAuditSink::new(16));
    let service = ServiceBuilder::simulated(SchedulerConfig::default(), spawner())
        .with_audit(audit.clone())
        .build()
        .unwrap();
    let missing = SubmissionRequest::new(JobDefinitionId::new("SP-404"), "alice", GpuType::A100, 1, 8);
    assert_eq!(service.submit(missing).await.unwrap_err().code(), "not_found");
    assert!(audit.events().is_empty());

    let job = service.register_job(
        gpu_admission::core::JobDefinition::new(
            JobDefinitionId::new("SP-001"),
            "BERT-Classifier",
            vec![gpu_admission::core::ComponentSpec {
                name: "trainer".into(),
                gpu_type: GpuType::V100,
                gpu_count: 1,
                memory_gb: 16,
            }],
        )
        .unwrap(),
    );
    let workload = service
        .submit(SubmissionRequest::new(job.id.clone(), "alice", GpuType::V100, 8, 16))
        .await
        .unwrap();
    let events = audit.events_for(&workload.id);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AuditAction::Park);
    service.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_builder_exposes_default_sinks() {
    let service = ServiceBuilder::simulated(SchedulerConfig::default(), spawner())
        .build()
        .unwrap();
    let job = service.register_job(
        gpu_admission::core::JobDefinition::new(
            JobDefinitionId::new("SP-002"),
            "ResNet-Exp-42",
            vec![gpu_admission::core::ComponentSpec {
                name: "trainer".into(),
                gpu_type: GpuType::V100,
                gpu_count: 1,
                memory_gb: 16,
            }],
        )
        .unwrap(),
    );
    let workload = service
        .submit(SubmissionRequest::new(job.id.clone(), "alice", GpuType::V100, 1, 16))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_secs(60)).await;

    let artifacts = service.artifacts().unwrap();
    assert_eq!(artifacts.by_workload(&workload.id).len(), 1);
    let actions: Vec<AuditAction> = service
        .audit_log()
        .unwrap()
        .events_for(&workload.id)
        .iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(actions.first(), Some(&AuditAction::Admit));
    assert_eq!(actions.last(), Some(&AuditAction::Complete));
    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_custom_sinks_replace_builtin_ones() {
    let service = ServiceBuilder::simulated(SchedulerConfig::default(), spawner())
        .with_audit(Arc::new(InMemoryAuditSink::new(16)))
        .build()
        .unwrap();
    assert!(service.audit_log().is_none());
    assert!(service.artifacts().is_some());
    service.shutdown().await.unwrap();
}

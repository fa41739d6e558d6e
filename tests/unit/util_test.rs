//! Tests for utility functions

use gpu_admission::util::{
    now_ms, stable_seed, ArtifactId, GpuType, JobDefinitionId, Priority, ResourceRequest,
    ValidationRunId, WorkloadId,
};

#[test]
fn test_priority_ordering() {
    assert!(Priority::High > Priority::Medium);
    assert!(Priority::Medium > Priority::Low);
    assert!(Priority::High.rank() < Priority::Low.rank());
    assert_eq!(Priority::default(), Priority::Medium);
}

#[test]
fn test_priority_serde_lowercase() {
    assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
    let p: Priority = serde_json::from_str("\"low\"").unwrap();
    assert_eq!(p, Priority::Low);
}

#[test]
fn test_gpu_type_parse() {
    assert_eq!("a100".parse::<GpuType>().unwrap(), GpuType::A100);
    assert_eq!(" V100 ".parse::<GpuType>().unwrap(), GpuType::V100);
    assert!("H100".parse::<GpuType>().is_err());
    assert_eq!(serde_json::to_string(&GpuType::V100).unwrap(), "\"V100\"");
}

#[test]
fn test_resource_request_label() {
    let req = ResourceRequest::new(GpuType::A100, 4, 128);
    assert_eq!(req.gpu_label(), "A100 x 4");
}

#[test]
fn test_generated_ids_carry_prefix() {
    assert!(WorkloadId::generate().as_str().starts_with("WL-"));
    assert!(ValidationRunId::generate().as_str().starts_with("TR-"));
    assert!(ArtifactId::generate().as_str().starts_with("MD-"));
    assert!(JobDefinitionId::generate().as_str().starts_with("SP-"));
    assert_eq!(WorkloadId::generate().as_str().len(), 13);
    assert_ne!(WorkloadId::generate(), WorkloadId::generate());
}

#[test]
fn test_ids_serialize_transparently() {
    let id = WorkloadId::new("WL-ABC");
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"WL-ABC\"");
    assert_eq!(id.to_string(), "WL-ABC");
}

#[test]
fn test_stable_seed_and_clock() {
    assert_eq!(stable_seed("WL-1"), stable_seed("WL-1"));
    assert_ne!(stable_seed("WL-1"), stable_seed("WL-2"));
    assert!(now_ms() > 0);
}

#[test]
fn test_init_tracing_is_idempotent() {
    gpu_admission::util::init_tracing();
    gpu_admission::util::init_tracing();
    assert_eq!(gpu_admission::util::DEFAULT_LOG_FILTER, "gpu_admission=info");
}

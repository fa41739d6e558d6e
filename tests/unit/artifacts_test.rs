//! Tests for the in-memory artifact sink

use std::collections::BTreeMap;

use gpu_admission::core::{Artifact, ArtifactSink};
use gpu_admission::infra::InMemoryArtifactSink;
use gpu_admission::util::serde::{ArtifactId, WorkloadId};

fn artifact(id: &str, workload: &str) -> Artifact {
    Artifact {
        id: ArtifactId::new(id),
        workload_id: WorkloadId::new(workload),
        name: "resnet-exp-42-final".into(),
        created_at_ms: 1,
        size: "380 MB".into(),
        metrics: BTreeMap::from([("accuracy".to_string(), "91.2%".to_string())]),
    }
}

#[test]
fn test_sink_keeps_emission_order() {
    let sink = InMemoryArtifactSink::new();
    assert!(sink.is_empty());

    sink.emit(artifact("MD-1", "WL-1")).unwrap();
    sink.emit(artifact("MD-2", "WL-2")).unwrap();

    let ids: Vec<String> = sink.list().iter().map(|a| a.id.to_string()).collect();
    assert_eq!(ids, vec!["MD-1", "MD-2"]);
    assert_eq!(sink.len(), 2);
}

#[test]
fn test_sink_filters_by_workload() {
    let sink = InMemoryArtifactSink::new();
    sink.emit(artifact("MD-1", "WL-1")).unwrap();
    sink.emit(artifact("MD-2", "WL-2")).unwrap();

    let found = sink.by_workload(&WorkloadId::new("WL-2"));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id.as_str(), "MD-2");
    assert!(sink.by_workload(&WorkloadId::new("WL-3")).is_empty());
}

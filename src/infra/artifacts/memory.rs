//! In-memory artifact sink.

use parking_lot::RwLock;

use crate::core::{Artifact, ArtifactSink, SchedulerError};
use crate::util::serde::WorkloadId;

/// Keeps every emitted artifact in memory, in emission order.
#[derive(Default)]
pub struct InMemoryArtifactSink {
    artifacts: RwLock<Vec<Artifact>>,
}

impl InMemoryArtifactSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All artifacts, oldest first.
    pub fn list(&self) -> Vec<Artifact> {
        self.artifacts.read().clone()
    }

    /// Artifacts produced by one workload.
    pub fn by_workload(&self, workload_id: &WorkloadId) -> Vec<Artifact> {
        self.artifacts
            .read()
            .iter()
            .filter(|a| &a.workload_id == workload_id)
            .cloned()
            .collect()
    }

    /// Number of artifacts received.
    pub fn len(&self) -> usize {
        self.artifacts.read().len()
    }

    /// Whether nothing has been emitted yet.
    pub fn is_empty(&self) -> bool {
        self.artifacts.read().is_empty()
    }
}

impl ArtifactSink for InMemoryArtifactSink {
    fn emit(&self, artifact: Artifact) -> Result<(), SchedulerError> {
        tracing::debug!(artifact_id = %artifact.id, workload_id = %artifact.workload_id, "artifact stored");
        self.artifacts.write().push(artifact);
        Ok(())
    }
}

//! Artifact sink: receives every artifact the scheduler creates.

use crate::core::{Artifact, SchedulerError};

/// Destination for artifacts emitted on workload completion. The scheduler
/// only emits; it never reads artifacts back.
pub trait ArtifactSink: Send + Sync {
    /// Deliver an artifact.
    fn emit(&self, artifact: Artifact) -> Result<(), SchedulerError>;
}

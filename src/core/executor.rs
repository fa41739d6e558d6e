//! Execution traits: runtime spawning and workload execution.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::core::Workload;
use crate::util::seed::stable_seed;

/// Artifact sizes reported by the simulated executor.
pub const ARTIFACT_SIZES: [&str; 5] = ["380 MB", "1.2 GB", "2.4 GB", "5.8 GB", "14.2 GB"];

/// Abstraction for spawning background work on a runtime.
pub trait Spawn {
    /// Spawn a future that runs to completion in the background.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Everything needed to create an artifact except its identity and timestamp,
/// which the workload store assigns at completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDraft {
    /// Artifact name.
    pub name: String,
    /// Human-readable size.
    pub size: String,
    /// Metric name to formatted value.
    pub metrics: BTreeMap<String, String>,
}

/// Terminal result of executing a workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Execution finished; an artifact is created from the draft.
    Completed(ArtifactDraft),
    /// Execution failed; no artifact is created.
    Failed(String),
}

/// Runs a workload that holds the execution slot.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use gpu_admission::core::{ExecutionOutcome, Workload, WorkloadExecutor};
///
/// #[derive(Clone)]
/// struct AlwaysFails;
///
/// #[async_trait]
/// impl WorkloadExecutor for AlwaysFails {
///     async fn execute(&self, _workload: Workload) -> ExecutionOutcome {
///         ExecutionOutcome::Failed("out of memory".into())
///     }
/// }
/// ```
#[async_trait]
pub trait WorkloadExecutor: Send + Sync + Clone + 'static {
    /// Execute the workload and report how it ended.
    async fn execute(&self, workload: Workload) -> ExecutionOutcome;
}

/// Executor that completes every workload after a fixed duration, with
/// metrics derived from the workload id.
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    duration: Duration,
}

impl SimulatedExecutor {
    /// Create an executor with a fixed execution time.
    pub const fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

#[async_trait]
impl WorkloadExecutor for SimulatedExecutor {
    async fn execute(&self, workload: Workload) -> ExecutionOutcome {
        tracing::debug!(workload_id = %workload.id, duration_ms = self.duration.as_millis(), "simulated execution started");
        tokio::time::sleep(self.duration).await;
        ExecutionOutcome::Completed(simulated_artifact(&workload))
    }
}

/// Artifact draft for a workload: slugified name, size and metrics seeded by its id.
pub fn simulated_artifact(workload: &Workload) -> ArtifactDraft {
    let mut rng = StdRng::seed_from_u64(stable_seed(workload.id.as_str()));
    let accuracy: f64 = rng.random_range(85.0..95.0);
    let loss: f64 = rng.random_range(0.02..0.12);
    let size = ARTIFACT_SIZES[rng.random_range(0..ARTIFACT_SIZES.len())];

    let mut metrics = BTreeMap::new();
    metrics.insert("accuracy".to_string(), format!("{accuracy:.1}%"));
    metrics.insert("loss".to_string(), format!("{loss:.3}"));

    ArtifactDraft {
        name: artifact_name(&workload.name),
        size: size.to_string(),
        metrics,
    }
}

/// `"BERT Classifier v2"` becomes `"bert-classifier-v2-final"`. Each run of
/// non-alphanumeric characters collapses to one `-`; leading and trailing
/// runs are kept, so `"Foo!"` becomes `"foo--final"`.
pub fn artifact_name(job_name: &str) -> String {
    let mut slug = String::with_capacity(job_name.len() + 6);
    for c in job_name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.push_str("-final");
    slug
}

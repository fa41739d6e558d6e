//! Build an [`AdmissionService`] and start its scheduler loop.

use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::core::{
    ArtifactSink, AuditSink, InMemoryAuditSink, JobCatalog, SchedulerError, SchedulerLoop,
    SimulatedExecutor, SimulatedProbe, Spawn, ValidationProbe, ValidationRunner, WorkloadExecutor,
    WorkloadStore,
};
use crate::infra::InMemoryArtifactSink;
use crate::runtime::service::BuiltinSinks;
use crate::runtime::AdmissionService;

/// Assembles the service from a config, a validation probe, an executor and
/// a spawner. Artifact and audit sinks default to in-memory backends, which
/// the built service exposes through `audit_log()` and `artifacts()`.
pub struct ServiceBuilder<V, E, S> {
    config: SchedulerConfig,
    probe: V,
    executor: E,
    spawner: S,
    artifact_sink: Option<Arc<dyn ArtifactSink>>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl<S> ServiceBuilder<SimulatedProbe, SimulatedExecutor, S> {
    /// Builder with the simulated probe and executor, timed by `config`.
    pub fn simulated(config: SchedulerConfig, spawner: S) -> Self {
        let probe = SimulatedProbe::new(config.validation_duration(), config.min_test_duration());
        let executor = SimulatedExecutor::new(config.execution_duration());
        Self::new(config, probe, executor, spawner)
    }
}

impl<V, E, S> ServiceBuilder<V, E, S> {
    /// Builder with explicit components.
    pub fn new(config: SchedulerConfig, probe: V, executor: E, spawner: S) -> Self {
        Self {
            config,
            probe,
            executor,
            spawner,
            artifact_sink: None,
            audit: None,
        }
    }

    /// Deliver artifacts to `sink`.
    #[must_use]
    pub fn with_artifact_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.artifact_sink = Some(sink);
        self
    }

    /// Record workload transitions to `audit`.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }
}

impl<V, E, S> ServiceBuilder<V, E, S>
where
    V: ValidationProbe,
    E: WorkloadExecutor,
    S: Spawn + Clone + Send + Sync + 'static,
{
    /// Validate the config, wire the components and spawn the scheduler loop.
    pub fn build(self) -> Result<AdmissionService<V, S>, SchedulerError> {
        self.config.validate().map_err(SchedulerError::InvalidConfig)?;

        let mut builtin = BuiltinSinks::default();
        let audit: Arc<dyn AuditSink> = match self.audit {
            Some(audit) => audit,
            None => {
                let audit = Arc::new(InMemoryAuditSink::new(self.config.audit_capacity));
                builtin.audit = Some(Arc::clone(&audit));
                audit
            }
        };
        let sink: Arc<dyn ArtifactSink> = match self.artifact_sink {
            Some(sink) => sink,
            None => {
                let sink = Arc::new(InMemoryArtifactSink::new());
                builtin.artifacts = Some(Arc::clone(&sink));
                sink
            }
        };

        let store = Arc::new(WorkloadStore::new().with_audit(audit));
        let catalog = Arc::new(JobCatalog::new());
        let runner = Arc::new(ValidationRunner::new(self.probe, self.spawner.clone()));

        let (scheduler, handle) = SchedulerLoop::new(
            Arc::clone(&store),
            self.executor,
            self.spawner.clone(),
            sink,
            self.config.max_concurrent,
            self.config.trigger_buffer,
        );
        self.spawner.spawn(scheduler.run());
        tracing::info!(
            gpu_threshold = self.config.gpu_threshold,
            mem_threshold_gb = self.config.mem_threshold_gb,
            max_concurrent = self.config.max_concurrent,
            "admission service started"
        );

        Ok(AdmissionService::new(
            self.config,
            catalog,
            store,
            runner,
            handle,
            builtin,
        ))
    }
}

//! Job definitions supplied by the external builder, and the in-memory catalog.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::core::SchedulerError;
use crate::util::serde::{GpuType, JobDefinitionId, ResourceRequest};

/// One component of a job and the resources it declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSpec {
    /// Component name.
    pub name: String,
    /// GPU model.
    pub gpu_type: GpuType,
    /// GPUs required.
    pub gpu_count: u32,
    /// Memory required in GB.
    pub memory_gb: u32,
}

/// GPU and memory totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDemand {
    /// GPUs.
    pub gpu_count: u32,
    /// Memory in GB.
    pub memory_gb: u32,
}

/// Externally authored template describing the components of a class of workload.
/// Never mutated by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefinition {
    /// Identifier.
    pub id: JobDefinitionId,
    /// Display name, also used to name produced artifacts.
    pub name: String,
    /// Ordered components (at least one).
    pub components: Vec<ComponentSpec>,
}

impl JobDefinition {
    /// Create a definition. Fails with `InvalidRequest` if `components` is empty.
    pub fn new(
        id: JobDefinitionId,
        name: impl Into<String>,
        components: Vec<ComponentSpec>,
    ) -> Result<Self, SchedulerError> {
        if components.is_empty() {
            return Err(SchedulerError::InvalidRequest(format!(
                "job definition {id} declares no components"
            )));
        }
        Ok(Self {
            id,
            name: name.into(),
            components,
        })
    }

    /// Per-component maximum of GPU count and memory (not a sum).
    pub fn peak_demand(&self) -> ResourceDemand {
        self.components
            .iter()
            .fold(ResourceDemand::default(), |peak, c| ResourceDemand {
                gpu_count: peak.gpu_count.max(c.gpu_count),
                memory_gb: peak.memory_gb.max(c.memory_gb),
            })
    }

    /// Per-GPU-type sum across all components.
    pub fn aggregate_demand(&self) -> BTreeMap<GpuType, ResourceDemand> {
        let mut totals: BTreeMap<GpuType, ResourceDemand> = BTreeMap::new();
        for c in &self.components {
            let entry = totals.entry(c.gpu_type).or_default();
            entry.gpu_count = entry.gpu_count.saturating_add(c.gpu_count);
            entry.memory_gb = entry.memory_gb.saturating_add(c.memory_gb);
        }
        totals
    }

    /// Default request for this job: the first component's GPU type at peak demand.
    pub fn default_request(&self) -> ResourceRequest {
        let peak = self.peak_demand();
        let gpu_type = self
            .components
            .first()
            .map_or(GpuType::A100, |c| c.gpu_type);
        ResourceRequest::new(gpu_type, peak.gpu_count, peak.memory_gb)
    }
}

/// Read-mostly registry of job definitions.
#[derive(Debug, Default)]
pub struct JobCatalog {
    definitions: RwLock<HashMap<JobDefinitionId, Arc<JobDefinition>>>,
}

impl JobCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a definition.
    pub fn register(&self, definition: JobDefinition) -> Arc<JobDefinition> {
        let definition = Arc::new(definition);
        self.definitions
            .write()
            .insert(definition.id.clone(), Arc::clone(&definition));
        tracing::debug!(job_id = %definition.id, name = %definition.name, "job definition registered");
        definition
    }

    /// Look up a definition.
    pub fn get(&self, id: &JobDefinitionId) -> Result<Arc<JobDefinition>, SchedulerError> {
        self.definitions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| SchedulerError::not_found("job definition", id))
    }

    /// All registered definitions, ordered by id.
    pub fn list(&self) -> Vec<Arc<JobDefinition>> {
        let mut defs: Vec<_> = self.definitions.read().values().cloned().collect();
        defs.sort_by(|a, b| a.id.cmp(&b.id));
        defs
    }
}

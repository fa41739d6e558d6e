//! Cluster usage report over active workloads.

use serde::{Deserialize, Serialize};

use crate::config::ClusterCapacity;
use crate::core::{Workload, WorkloadStatus};
use crate::util::serde::GpuType;

/// Usage of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLine {
    /// Resource label, e.g. `"A100 GPUs"`.
    pub resource: String,
    /// Units held by queued and running workloads.
    pub used: u64,
    /// Cluster capacity.
    pub total: u64,
    /// `total - used`, floored at zero.
    pub idle: u64,
}

impl UsageLine {
    fn new(resource: &str, used: u64, total: u64) -> Self {
        Self {
            resource: resource.to_string(),
            used,
            total,
            idle: total.saturating_sub(used),
        }
    }

    /// Used share of capacity in percent, `0` when capacity is zero.
    pub fn utilisation_pct(&self) -> u64 {
        if self.total == 0 {
            0
        } else {
            self.used.saturating_mul(100) / self.total
        }
    }
}

/// Per-resource usage against cluster capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageReport {
    /// A100 GPUs, V100 GPUs, then memory.
    pub lines: Vec<UsageLine>,
}

/// Sum what `queued` and `running` workloads request.
pub fn usage_report(workloads: &[Workload], capacity: &ClusterCapacity) -> UsageReport {
    let mut a100 = 0_u64;
    let mut v100 = 0_u64;
    let mut memory = 0_u64;
    for w in workloads
        .iter()
        .filter(|w| matches!(w.status, WorkloadStatus::Queued | WorkloadStatus::Running))
    {
        let gpus = u64::from(w.request.gpu_count);
        match w.request.gpu_type {
            GpuType::A100 => a100 += gpus,
            GpuType::V100 => v100 += gpus,
        }
        memory += u64::from(w.request.memory_gb);
    }
    UsageReport {
        lines: vec![
            UsageLine::new("A100 GPUs", a100, u64::from(capacity.a100_gpus)),
            UsageLine::new("V100 GPUs", v100, u64::from(capacity.v100_gpus)),
            UsageLine::new("Memory (GB)", memory, u64::from(capacity.memory_gb)),
        ],
    }
}

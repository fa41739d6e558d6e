//! Resource policy: decides whether a request is admitted directly or needs approval.
//!
//! The policy is a pure, total function. Malformed quantities are normalized
//! instead of rejected, so a submission is never blocked on an unparsable
//! resource string: an unreadable GPU count becomes [`DEFAULT_GPU_COUNT`] and
//! an unreadable memory size becomes 0.

use serde::{Deserialize, Serialize};

use crate::config::SchedulerConfig;
use crate::util::serde::ResourceRequest;

/// GPU count used when the requested count cannot be read.
pub const DEFAULT_GPU_COUNT: u32 = 1;

/// Outcome of evaluating a resource request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionDecision {
    /// Request is below both thresholds; the workload is queued immediately.
    AutoAdmit,
    /// Request meets a threshold; the workload waits for approval.
    RequiresApproval,
}

impl AdmissionDecision {
    /// True when the workload must pass the approval gate.
    pub const fn needs_approval(self) -> bool {
        matches!(self, Self::RequiresApproval)
    }
}

/// Threshold policy over GPU count and memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourcePolicy {
    gpu_threshold: u32,
    mem_threshold_gb: u32,
}

impl Default for ResourcePolicy {
    fn default() -> Self {
        Self::new(4, 128)
    }
}

impl ResourcePolicy {
    /// Create a policy with explicit thresholds.
    pub const fn new(gpu_threshold: u32, mem_threshold_gb: u32) -> Self {
        Self {
            gpu_threshold,
            mem_threshold_gb,
        }
    }

    /// Create a policy from scheduler configuration.
    pub const fn from_config(cfg: &SchedulerConfig) -> Self {
        Self::new(cfg.gpu_threshold, cfg.mem_threshold_gb)
    }

    /// GPU threshold.
    pub const fn gpu_threshold(&self) -> u32 {
        self.gpu_threshold
    }

    /// Memory threshold in GB.
    pub const fn mem_threshold_gb(&self) -> u32 {
        self.mem_threshold_gb
    }

    /// `RequiresApproval` iff `gpu_count >= gpu_threshold` or `memory_gb >= mem_threshold_gb`.
    pub const fn evaluate(&self, request: &ResourceRequest) -> AdmissionDecision {
        if request.gpu_count >= self.gpu_threshold || request.memory_gb >= self.mem_threshold_gb {
            AdmissionDecision::RequiresApproval
        } else {
            AdmissionDecision::AutoAdmit
        }
    }
}

/// Read a GPU count from `"4"` or `"A100 x 4"`. Falls back to [`DEFAULT_GPU_COUNT`].
pub fn parse_gpu_count(raw: &str) -> u32 {
    let trimmed = raw.trim();
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return leading_number(trimmed).unwrap_or(DEFAULT_GPU_COUNT);
    }
    trimmed
        .match_indices(['x', 'X'])
        .find_map(|(idx, _)| leading_number(trimmed[idx + 1..].trim_start()))
        .unwrap_or(DEFAULT_GPU_COUNT)
}

/// Read a memory size in GB from its leading integer, e.g. `"128GB"`. Falls back to 0.
pub fn parse_mem_gb(raw: &str) -> u32 {
    leading_number(raw.trim_start()).unwrap_or(0)
}

/// Parse the leading run of ASCII digits, saturating at `u32::MAX`.
fn leading_number(s: &str) -> Option<u32> {
    let mut digits = s.chars().map_while(|c| c.to_digit(10)).peekable();
    digits.peek()?;
    Some(digits.fold(0u32, |acc, d| acc.saturating_mul(10).saturating_add(d)))
}

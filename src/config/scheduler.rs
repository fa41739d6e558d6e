//! Scheduler configuration structures.

use std::time::Duration;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Environment variable overriding [`SchedulerConfig::gpu_threshold`].
pub const ENV_GPU_THRESHOLD: &str = "ADMISSION_GPU_THRESHOLD";
/// Environment variable overriding [`SchedulerConfig::mem_threshold_gb`].
pub const ENV_MEM_THRESHOLD_GB: &str = "ADMISSION_MEM_THRESHOLD_GB";
/// Environment variable overriding [`SchedulerConfig::max_concurrent`].
pub const ENV_MAX_CONCURRENT: &str = "ADMISSION_MAX_CONCURRENT";
/// Environment variable overriding [`SchedulerConfig::execution_duration_ms`].
pub const ENV_EXECUTION_MS: &str = "ADMISSION_EXECUTION_MS";
/// Environment variable overriding [`SchedulerConfig::validation_duration_ms`].
pub const ENV_VALIDATION_MS: &str = "ADMISSION_VALIDATION_MS";
/// Environment variable overriding [`SchedulerConfig::min_test_duration_ms`].
pub const ENV_MIN_TEST_MS: &str = "ADMISSION_MIN_TEST_MS";

/// Total capacity of the cluster, used for the resource usage report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterCapacity {
    /// Installed A100 GPUs.
    pub a100_gpus: u32,
    /// Installed V100 GPUs.
    pub v100_gpus: u32,
    /// Schedulable memory in GB.
    pub memory_gb: u32,
}

impl Default for ClusterCapacity {
    fn default() -> Self {
        Self {
            a100_gpus: 16,
            v100_gpus: 8,
            memory_gb: 2048,
        }
    }
}

/// Root scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// GPU count at or above which a request requires approval.
    pub gpu_threshold: u32,
    /// Memory (GB) at or above which a request requires approval.
    pub mem_threshold_gb: u32,
    /// Maximum number of workloads in `running` at once.
    pub max_concurrent: usize,
    /// Fixed execution time of a workload, in milliseconds.
    pub execution_duration_ms: u64,
    /// Duration of a standalone validation run, in milliseconds.
    pub validation_duration_ms: u64,
    /// Duration of a minimum execution test, in milliseconds.
    pub min_test_duration_ms: u64,
    /// Capacity of the scheduler trigger channel.
    pub trigger_buffer: usize,
    /// Number of audit events retained by the in-memory sink.
    pub audit_capacity: usize,
    /// Cluster capacity.
    pub cluster: ClusterCapacity,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            gpu_threshold: 4,
            mem_threshold_gb: 128,
            max_concurrent: 1,
            execution_duration_ms: 10_000,
            validation_duration_ms: 2_500,
            min_test_duration_ms: 2_500,
            trigger_buffer: 64,
            audit_capacity: 1_024,
            cluster: ClusterCapacity::default(),
        }
    }
}

impl SchedulerConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.gpu_threshold == 0 {
            return Err("gpu_threshold must be greater than 0".into());
        }
        if self.mem_threshold_gb == 0 {
            return Err("mem_threshold_gb must be greater than 0".into());
        }
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be greater than 0".into());
        }
        if self.trigger_buffer == 0 {
            return Err("trigger_buffer must be greater than 0".into());
        }
        if self.audit_capacity == 0 {
            return Err("audit_capacity must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    /// Missing fields take their default values.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load defaults, read a `.env` file if one exists, then apply
    /// `ADMISSION_*` environment overrides and validate.
    pub fn from_env() -> AppResult<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env file");
        }
        let mut cfg = Self::default();
        cfg.apply_overrides(|key| std::env::var(key).ok())
            .map_err(|e| anyhow!("invalid environment override: {e}"))?;
        cfg.validate().map_err(|e| anyhow!("config invalid: {e}"))?;
        Ok(cfg)
    }

    /// Apply overrides from a key lookup (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_override(&lookup, ENV_GPU_THRESHOLD)? {
            self.gpu_threshold = v;
        }
        if let Some(v) = parse_override(&lookup, ENV_MEM_THRESHOLD_GB)? {
            self.mem_threshold_gb = v;
        }
        if let Some(v) = parse_override(&lookup, ENV_MAX_CONCURRENT)? {
            self.max_concurrent = v;
        }
        if let Some(v) = parse_override(&lookup, ENV_EXECUTION_MS)? {
            self.execution_duration_ms = v;
        }
        if let Some(v) = parse_override(&lookup, ENV_VALIDATION_MS)? {
            self.validation_duration_ms = v;
        }
        if let Some(v) = parse_override(&lookup, ENV_MIN_TEST_MS)? {
            self.min_test_duration_ms = v;
        }
        Ok(())
    }

    /// Execution time as a [`Duration`].
    pub const fn execution_duration(&self) -> Duration {
        Duration::from_millis(self.execution_duration_ms)
    }

    /// Standalone validation time as a [`Duration`].
    pub const fn validation_duration(&self) -> Duration {
        Duration::from_millis(self.validation_duration_ms)
    }

    /// Minimum execution test time as a [`Duration`].
    pub const fn min_test_duration(&self) -> Duration {
        Duration::from_millis(self.min_test_duration_ms)
    }
}

fn parse_override<F, T>(lookup: &F, key: &str) -> Result<Option<T>, String>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| format!("{key}=`{raw}`: {e}"))
        })
        .transpose()
}

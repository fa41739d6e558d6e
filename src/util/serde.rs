//! Serializable models shared across the scheduler: priorities, GPU types,
//! resource requests and prefixed identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Queue priority of a workload.
///
/// `Ord` follows importance (`Low < Medium < High`); scheduling uses
/// [`Priority::rank`], where a lower rank is picked first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Runs after everything else.
    Low,
    /// Default priority for submissions.
    #[default]
    Medium,
    /// Runs first.
    High,
}

impl Priority {
    /// Scheduling rank: `high = 0`, `medium = 1`, `low = 2`.
    pub const fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    /// One step more important, saturating at `High`.
    pub const fn raised(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium | Self::High => Self::High,
        }
    }

    /// One step less important, saturating at `Low`.
    pub const fn lowered(self) -> Self {
        match self {
            Self::High => Self::Medium,
            Self::Medium | Self::Low => Self::Low,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(label)
    }
}

/// GPU model requested by a workload or declared by a job component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GpuType {
    /// NVIDIA A100.
    A100,
    /// NVIDIA V100.
    V100,
}

impl fmt::Display for GpuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A100 => f.write_str("A100"),
            Self::V100 => f.write_str("V100"),
        }
    }
}

impl FromStr for GpuType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A100" => Ok(Self::A100),
            "V100" => Ok(Self::V100),
            other => Err(format!("unknown gpu type `{other}`")),
        }
    }
}

/// Normalized resource request: GPU type, GPU count and memory in GB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRequest {
    /// GPU model.
    pub gpu_type: GpuType,
    /// Number of GPUs.
    pub gpu_count: u32,
    /// Memory in gigabytes.
    pub memory_gb: u32,
}

impl ResourceRequest {
    /// Build a request from already-normalized values.
    pub const fn new(gpu_type: GpuType, gpu_count: u32, memory_gb: u32) -> Self {
        Self {
            gpu_type,
            gpu_count,
            memory_gb,
        }
    }

    /// Human-readable GPU label, e.g. `A100 x 4`.
    pub fn gpu_label(&self) -> String {
        format!("{} x {}", self.gpu_type, self.gpu_count)
    }
}

macro_rules! prefixed_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Prefix carried by generated identifiers.
            pub const PREFIX: &'static str = $prefix;

            /// Generate a fresh identifier.
            pub fn generate() -> Self {
                let raw = uuid::Uuid::new_v4().simple().to_string();
                Self(format!("{}{}", $prefix, raw[..10].to_ascii_uppercase()))
            }

            /// Wrap an existing identifier.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

prefixed_id!(
    /// Identifier of a submitted workload (`WL-…`).
    WorkloadId,
    "WL-"
);
prefixed_id!(
    /// Identifier of a validation run (`TR-…`).
    ValidationRunId,
    "TR-"
);
prefixed_id!(
    /// Identifier of a produced artifact (`MD-…`).
    ArtifactId,
    "MD-"
);
prefixed_id!(
    /// Identifier of a job definition (`SP-…`).
    JobDefinitionId,
    "SP-"
);

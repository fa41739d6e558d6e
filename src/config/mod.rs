//! Configuration models for admission thresholds, scheduling, and cluster capacity.

pub mod scheduler;

pub use scheduler::{ClusterCapacity, SchedulerConfig};

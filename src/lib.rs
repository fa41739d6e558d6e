//! # GPU Admission
//!
//! Admission and execution scheduling for GPU workloads.
//!
//! A submitted workload either runs straight away or waits for a human
//! decision, depending on how much it asks for. Large requests are parked in
//! `pending` and must pass a short minimum execution test before anyone can
//! approve them. Approved and auto-admitted workloads wait in a priority
//! queue, and a scheduler loop runs them one at a time (the cap is
//! configurable), emitting one artifact per completed workload.
//!
//! ## Core Problem Solved
//!
//! - **Expensive mistakes**: a misconfigured 8-GPU job wastes far more than a
//!   1-GPU one, so big requests are validated and approved first
//! - **Scarce hardware**: the concurrency cap is enforced atomically, so two
//!   triggers firing together never start two workloads for one slot
//! - **Urgent work**: higher priorities jump the queue on the very next
//!   scheduling decision
//!
//! ## Lifecycle
//!
//! ```text
//! submit ── below threshold ─────────────────────────────► queued
//! submit ── at/above threshold ─► pending
//! pending ── min test passes ── approve ─────────────────► queued
//! pending ── reject ─────────────────────────────────────► rejected
//! queued ── scheduler selects ───────────────────────────► running
//! running ── execution finishes ─► completed (artifact) | failed
//! queued | running ── cancel ────────────────────────────► cancelled
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gpu_admission::builders::ServiceBuilder;
//! use gpu_admission::config::SchedulerConfig;
//! use gpu_admission::core::{ComponentSpec, JobDefinition};
//! use gpu_admission::runtime::{SubmissionRequest, TokioSpawner};
//! use gpu_admission::util::serde::{GpuType, JobDefinitionId};
//!
//! let service = ServiceBuilder::simulated(SchedulerConfig::from_env()?, TokioSpawner::current()?)
//!     .build()?;
//! let job = service.register_job(JobDefinition::new(
//!     JobDefinitionId::new("SP-001"),
//!     "LLM-FineTune-v3",
//!     vec![ComponentSpec { name: "trainer".into(), gpu_type: GpuType::A100, gpu_count: 8, memory_gb: 256 }],
//! )?);
//!
//! let workload = service
//!     .submit(SubmissionRequest::new(job.id.clone(), "alice", GpuType::A100, 8, 256))
//!     .await?;
//! service.run_minimum_execution_test(&workload.id)?;
//! // ... once the test has passed:
//! service.approve(&workload.id).await?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core admission and scheduling components.
pub mod core;
/// Configuration models for thresholds, timing and cluster capacity.
pub mod config;
/// Builders to construct the service from configuration.
pub mod builders;
/// Infrastructure adapters for artifact delivery.
pub mod infra;
/// Runtime adapters and API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;

//! Runtime adapters and API surface.

pub mod api;
pub mod service;
pub mod tokio_spawner;

pub use api::{ErrorBody, Health, Quantity, QueueSnapshot, SubmissionRequest};
pub use service::AdmissionService;
pub use tokio_spawner::TokioSpawner;

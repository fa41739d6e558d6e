//! Builders to construct scheduler components from configuration.

pub mod service_builder;

pub use service_builder::ServiceBuilder;

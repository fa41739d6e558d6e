//! Infrastructure adapters for artifact delivery.

pub mod artifacts;
pub use artifacts::InMemoryArtifactSink;

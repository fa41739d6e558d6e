//! Artifact sink backends.

pub mod memory;

pub use memory::InMemoryArtifactSink;

//! Shared utilities.

pub mod clock;
pub mod seed;
pub mod serde;
pub mod telemetry;

pub use self::clock::*;
pub use self::seed::*;
pub use self::serde::*;
pub use self::telemetry::*;

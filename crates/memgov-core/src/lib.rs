#![forbid(unsafe_code)]
//! memgov-core: shared leaf types for the memory-governance layer.
//!
//! Nothing in here touches a counter. The trackers live in `memgov-mem` and
//! the frontier queues in `memgov-queue`; both depend on this crate for
//! configuration, byte sizes, snapshot types and the `Step` contract.

pub mod config;
pub mod error;
pub mod size;
pub mod stats;
pub mod step;

pub use config::MemoryConfig;
pub use error::{Error, Result};
pub use size::ByteSize;
pub use stats::{UsageSnapshot, ViolationStats};
pub use step::Step;

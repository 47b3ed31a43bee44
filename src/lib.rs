#![forbid(unsafe_code)]
//! memgov: memory governance for query execution.
//!
//! Facade over the workspace crates:
//! - `memgov-core`: configuration, byte sizes, snapshots, the `Step` contract.
//! - `memgov-mem`: global/local trackers, scoped guards, tracked buffers.
//! - `memgov-queue`: FIFO/LIFO/weighted frontiers and the tracer decorator.
//!
//! Typical wiring: one [`GlobalTracker`] per process, one [`LocalTracker`]
//! per query, and every query-owned buffer or queue charged through the
//! latter.

pub use memgov_core::{ByteSize, MemoryConfig, Step, UsageSnapshot, ViolationStats};
pub use memgov_mem::{
    Error, GlobalTracker, LimitOrigin, LocalTracker, Result, ScopedUsage, TrackedString,
    TrackedVec, TrackingAllocator,
};
pub use memgov_queue::{FifoQueue, LifoQueue, Queue, Tracer, WeightedQueue};

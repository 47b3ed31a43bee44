#![forbid(unsafe_code)]
//! memgov-queue: frontier queues for graph search under a memory bound.
//!
//! Three interchangeable disciplines share the [`Queue`] contract:
//! - [`FifoQueue`] for breadth-first enumeration,
//! - [`LifoQueue`] for depth-first enumeration,
//! - [`WeightedQueue`] for shortest-path style enumeration.
//!
//! Every queued step is charged to the query's [`LocalTracker`] while it sits
//! in the queue. [`Tracer`] wraps any queue and records per-method timings.
//!
//! [`LocalTracker`]: memgov_mem::LocalTracker

pub mod fifo;
pub mod lifo;
pub mod tracer;
pub mod traits;
pub mod weighted;

pub use fifo::FifoQueue;
pub use lifo::LifoQueue;
pub use memgov_core::Step;
pub use tracer::{TraceReport, TraceStats, Tracer};
pub use traits::Queue;
pub use weighted::WeightedQueue;

#[cfg(test)]
mod test_step;

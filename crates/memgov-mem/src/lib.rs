#![forbid(unsafe_code)]
//! memgov-mem: two-tier memory accounting for query execution.
//!
//! A single [`GlobalTracker`] bounds the whole process; each query owns a
//! [`LocalTracker`] bound to it. Local trackers only touch the global counter
//! when their usage crosses a chunk boundary, so many queries can account in
//! parallel without hammering one shared atomic.
//!
//! All working memory of a query should be charged through its local tracker,
//! either directly, through a [`ScopedUsage`] guard, or through a
//! [`TrackingAllocator`]-backed buffer.

pub mod alloc;
pub mod error;
pub mod global;
pub mod local;
pub mod scope;

pub use alloc::{TrackedString, TrackedVec, TrackingAllocator};
pub use error::{Error, LimitOrigin, Result};
pub use global::GlobalTracker;
pub use local::LocalTracker;
pub use memgov_core::config::DEFAULT_CHUNK_SIZE;
pub use scope::ScopedUsage;

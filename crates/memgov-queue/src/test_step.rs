//! Step fixture shared by the queue unit tests.

use std::mem::size_of;
use std::sync::Arc;

use memgov_core::Step;
use memgov_mem::{GlobalTracker, LocalTracker};

#[derive(Debug, Clone, PartialEq)]
pub struct TestStep {
    pub id: u32,
    pub weight: f64,
    pub vertex: bool,
    pub edges: bool,
}

impl TestStep {
    pub const SIZE: u64 = size_of::<TestStep>() as u64;

    pub fn ready(id: u32) -> Self {
        Self {
            id,
            weight: 0.0,
            vertex: true,
            edges: true,
        }
    }

    pub fn loose(id: u32) -> Self {
        Self {
            id,
            weight: 0.0,
            vertex: false,
            edges: false,
        }
    }

    pub fn weighted(id: u32, weight: f64) -> Self {
        Self {
            weight,
            ..Self::ready(id)
        }
    }
}

impl Step for TestStep {
    fn is_processable(&self) -> bool {
        self.vertex && self.edges
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn vertex_fetched(&self) -> bool {
        self.vertex
    }

    fn edges_fetched(&self) -> bool {
        self.edges
    }
}

pub fn tracker(limit: u64) -> Arc<LocalTracker> {
    Arc::new(LocalTracker::with_limit(
        Arc::new(GlobalTracker::with_chunk_size(0, 64)),
        limit,
    ))
}

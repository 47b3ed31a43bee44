//! First-in, first-out frontier for breadth-first enumeration.

use std::collections::VecDeque;
use std::mem::size_of;
use std::sync::Arc;

use memgov_core::Step;
use memgov_mem::{LocalTracker, Result, ScopedUsage};

use crate::traits::Queue;

pub struct FifoQueue<S: Step> {
    tracker: Arc<LocalTracker>,
    queue: VecDeque<S>,
}

impl<S: Step> FifoQueue<S> {
    pub fn new(tracker: Arc<LocalTracker>) -> Self {
        Self {
            tracker,
            queue: VecDeque::new(),
        }
    }

    pub fn tracker(&self) -> &Arc<LocalTracker> {
        &self.tracker
    }

    /// Whether the head step already has its vertex data.
    pub fn first_is_vertex_fetched(&self) -> bool {
        self.queue.front().is_some_and(|s| s.vertex_fetched())
    }

    pub fn get_steps_without_fetched_vertex(&mut self) -> Vec<&mut S> {
        self.queue
            .iter_mut()
            .filter(|s| !s.vertex_fetched())
            .collect()
    }

    /// Appends to `out` every queued step whose edges are not yet fetched.
    pub fn get_steps_without_fetched_edges<'a>(&'a mut self, out: &mut Vec<&'a mut S>) {
        out.extend(self.queue.iter_mut().filter(|s| !s.edges_fetched()));
    }

    fn step_size() -> u64 {
        size_of::<S>() as u64
    }
}

impl<S: Step> Queue for FifoQueue<S> {
    type Step = S;

    fn append(&mut self, step: S) -> Result<()> {
        let mut guard = ScopedUsage::with_bytes(&self.tracker, Self::step_size())?;
        self.queue.push_back(step);
        guard.steal();
        Ok(())
    }

    fn set_start_content(&mut self, steps: Vec<S>) -> Result<()> {
        let bytes = Self::step_size() * steps.len() as u64;
        let mut guard = ScopedUsage::with_bytes(&self.tracker, bytes)?;
        self.queue.extend(steps);
        guard.steal();
        Ok(())
    }

    fn pop(&mut self) -> S {
        let Some(step) = self.queue.pop_front() else {
            panic!("pop called on an empty FIFO queue");
        };
        self.tracker.decrease(Self::step_size());
        step
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn size(&self) -> usize {
        self.queue.len()
    }

    fn has_processable_element(&self) -> bool {
        self.queue.front().is_some_and(|s| s.is_processable())
    }

    fn get_loose_ends(&mut self) -> Vec<&mut S> {
        debug_assert!(!self.has_processable_element());
        self.queue
            .iter_mut()
            .filter(|s| !s.is_processable())
            .collect()
    }

    fn clear(&mut self) {
        let bytes = Self::step_size() * self.queue.len() as u64;
        self.queue.clear();
        self.tracker.decrease(bytes);
    }
}

impl<S: Step> Drop for FifoQueue<S> {
    fn drop(&mut self) {
        self.clear();
    }
}

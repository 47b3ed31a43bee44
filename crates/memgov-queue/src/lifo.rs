//! Last-in, first-out frontier for depth-first enumeration.

use std::collections::VecDeque;
use std::mem::size_of;
use std::sync::Arc;

use memgov_core::Step;
use memgov_mem::{LocalTracker, Result, ScopedUsage};

use crate::traits::Queue;

/// Inserts and removes at the head, so the newest step is expanded first.
pub struct LifoQueue<S: Step> {
    tracker: Arc<LocalTracker>,
    queue: VecDeque<S>,
}

impl<S: Step> LifoQueue<S> {
    pub fn new(tracker: Arc<LocalTracker>) -> Self {
        Self {
            tracker,
            queue: VecDeque::new(),
        }
    }

    pub fn tracker(&self) -> &Arc<LocalTracker> {
        &self.tracker
    }

    fn step_size() -> u64 {
        size_of::<S>() as u64
    }
}

impl<S: Step> Queue for LifoQueue<S> {
    type Step = S;

    fn append(&mut self, step: S) -> Result<()> {
        let mut guard = ScopedUsage::with_bytes(&self.tracker, Self::step_size())?;
        self.queue.push_front(step);
        guard.steal();
        Ok(())
    }

    fn set_start_content(&mut self, steps: Vec<S>) -> Result<()> {
        let bytes = Self::step_size() * steps.len() as u64;
        let mut guard = ScopedUsage::with_bytes(&self.tracker, bytes)?;
        for step in steps {
            self.queue.push_front(step);
        }
        guard.steal();
        Ok(())
    }

    fn pop(&mut self) -> S {
        let Some(step) = self.queue.pop_front() else {
            panic!("pop called on an empty LIFO queue");
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

impl<S: Step> Drop for LifoQueue<S> {
    fn drop(&mut self) {
        self.clear();
    }
}

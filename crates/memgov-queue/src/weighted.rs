//! Weighted frontier for shortest-path enumeration.
//!
//! A binary min-heap over `(weight, processable)`: lower weight first, and
//! among equal weights a processable step before one that is still a loose
//! end. Handing out loose ends lets the provider flip their processability,
//! which can break the tie-break order, so the heap is rebuilt before the
//! next structural change and read by linear scan until then.

use std::cmp::Ordering;
use std::mem::size_of;
use std::sync::Arc;

use memgov_core::Step;
use memgov_mem::{LocalTracker, Result, ScopedUsage};

use crate::traits::Queue;

pub struct WeightedQueue<S: Step> {
    tracker: Arc<LocalTracker>,
    heap: Vec<S>,
    /// Set once loose ends were handed out mutably.
    stale: bool,
}

/// Whether `a` must be popped before `b`.
fn precedes<S: Step>(a: &S, b: &S) -> bool {
    match a.weight().total_cmp(&b.weight()) {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => a.is_processable() && !b.is_processable(),
    }
}

impl<S: Step> WeightedQueue<S> {
    pub fn new(tracker: Arc<LocalTracker>) -> Self {
        Self {
            tracker,
            heap: Vec::new(),
            stale: false,
        }
    }

    pub fn tracker(&self) -> &Arc<LocalTracker> {
        &self.tracker
    }

    /// The step `pop` would return, without removing it.
    pub fn peek(&self) -> Option<&S> {
        if self.stale {
            self.heap
                .iter()
                .reduce(|best, s| if precedes(s, best) { s } else { best })
        } else {
            self.heap.first()
        }
    }

    fn step_size() -> u64 {
        size_of::<S>() as u64
    }

    fn push(&mut self, step: S) {
        self.heap.push(step);
        self.sift_up(self.heap.len() - 1);
    }

    fn restore(&mut self) {
        if self.stale {
            for i in (0..self.heap.len() / 2).rev() {
                self.sift_down(i);
            }
            self.stale = false;
        }
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if !precedes(&self.heap[i], &self.heap[parent]) {
                break;
            }
            self.heap.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let n = self.heap.len();
        loop {
            let left = 2 * i + 1;
            if left >= n {
                break;
            }
            let right = left + 1;
            let child = if right < n && precedes(&self.heap[right], &self.heap[left]) {
                right
            } else {
                left
            };
            if !precedes(&self.heap[child], &self.heap[i]) {
                break;
            }
            self.heap.swap(i, child);
            i = child;
        }
    }
}

impl<S: Step> Queue for WeightedQueue<S> {
    type Step = S;

    fn append(&mut self, step: S) -> Result<()> {
        let tracker = Arc::clone(&self.tracker);
        let mut guard = ScopedUsage::with_bytes(&tracker, Self::step_size())?;
        self.restore();
        self.push(step);
        guard.steal();
        Ok(())
    }

    fn set_start_content(&mut self, steps: Vec<S>) -> Result<()> {
        let bytes = Self::step_size() * steps.len() as u64;
        let tracker = Arc::clone(&self.tracker);
        let mut guard = ScopedUsage::with_bytes(&tracker, bytes)?;
        self.restore();
        self.heap.reserve(steps.len());
        for step in steps {
            self.push(step);
        }
        guard.steal();
        Ok(())
    }

    fn pop(&mut self) -> S {
        assert!(!self.heap.is_empty(), "pop called on an empty weighted queue");
        self.restore();
        // Moves the last leaf to the root, then restores heap order.
        let step = self.heap.swap_remove(0);
        self.sift_down(0);
        self.tracker.decrease(Self::step_size());
        step
    }

    fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn size(&self) -> usize {
        self.heap.len()
    }

    fn has_processable_element(&self) -> bool {
        self.peek().is_some_and(|s| s.is_processable())
    }

    fn get_loose_ends(&mut self) -> Vec<&mut S> {
        debug_assert!(!self.has_processable_element());
        self.stale = true;
        self.heap
            .iter_mut()
            .filter(|s| !s.is_processable())
            .collect()
    }

    fn clear(&mut self) {
        let bytes = Self::step_size() * self.heap.len() as u64;
        self.heap.clear();
        self.stale = false;
        self.tracker.decrease(bytes);
    }
}

impl<S: Step> Drop for WeightedQueue<S> {
    fn drop(&mut self) {
        self.clear();
    }
}

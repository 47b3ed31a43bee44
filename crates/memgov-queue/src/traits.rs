//! Queue contract shared by all frontier disciplines.

use memgov_core::Step;
use memgov_mem::Result;

/// A search frontier whose elements are charged to a local tracker.
///
/// Queues are single-owner; callers serialize access themselves.
pub trait Queue {
    type Step: Step;

    /// Charge and insert one step. On failure the queue and the tracker are
    /// unchanged.
    fn append(&mut self, step: Self::Step) -> Result<()>;

    /// Seed the frontier from several start points. The whole batch is
    /// charged up front; on failure nothing is inserted.
    fn set_start_content(&mut self, steps: Vec<Self::Step>) -> Result<()>;

    /// Remove the next step per the discipline and release its charge.
    ///
    /// # Panics
    /// If the queue is empty.
    fn pop(&mut self) -> Self::Step;

    fn is_empty(&self) -> bool;

    fn size(&self) -> usize;

    /// Whether the step `pop` would return next is ready to expand.
    fn has_processable_element(&self) -> bool;

    /// All queued steps that still wait for data. Only meaningful when the
    /// front is not processable.
    fn get_loose_ends(&mut self) -> Vec<&mut Self::Step>;

    /// Drop every step and release the whole charge at once.
    fn clear(&mut self);
}

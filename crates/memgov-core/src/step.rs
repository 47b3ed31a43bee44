//! Contract for graph-search frontier elements.
//!
//! A step is opaque to the queues apart from these few probes. The graph
//! provider owns the concrete type and fills in vertex/edge data for loose
//! ends before they become processable.

pub trait Step {
    /// Whether the step can be expanded right now. A step that still waits
    /// for vertex or edge data is a "loose end".
    fn is_processable(&self) -> bool;

    /// Ordering key for the weighted queue; lower sorts first.
    fn weight(&self) -> f64 {
        0.0
    }

    fn vertex_fetched(&self) -> bool {
        true
    }

    fn edges_fetched(&self) -> bool {
        true
    }
}

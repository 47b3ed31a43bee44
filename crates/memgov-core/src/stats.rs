//! Point-in-time snapshots exposed to the engine's telemetry layer.

use serde::{Deserialize, Serialize};

/// Lifetime violation counters of a global tracker. Never reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationStats {
    pub global_limit_reached: u64,
    pub local_limit_reached: u64,
}

/// Usage of one local tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub current: u64,
    pub peak: u64,
    /// Zero when no local ceiling is set.
    pub limit: u64,
}

impl UsageSnapshot {
    /// Bytes left before the local ceiling, `None` when unlimited.
    pub fn headroom(&self) -> Option<u64> {
        (self.limit > 0).then(|| self.limit.saturating_sub(self.current))
    }
}

//! Process-wide memory tracker.
//!
//! One instance is shared (via `Arc`) by every [`LocalTracker`] of the
//! process. It only ever sees whole chunks; the per-query trackers absorb all
//! sub-chunk traffic.
//!
//! [`LocalTracker`]: crate::LocalTracker

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use memgov_core::config::{MemoryConfig, DEFAULT_CHUNK_SIZE};
use memgov_core::stats::ViolationStats;
use once_cell::sync::Lazy;

use crate::error::Result;

static PROCESS: Lazy<Arc<GlobalTracker>> = Lazy::new(|| {
    let cfg = MemoryConfig::from_env();
    Arc::new(GlobalTracker::with_chunk_size(
        cfg.global_limit.as_bytes(),
        cfg.chunk_size.as_bytes(),
    ))
});

#[derive(Debug)]
pub struct GlobalTracker {
    /// Signed so that a rollback correction can never wrap.
    current: AtomicI64,
    /// Zero means unlimited.
    limit: AtomicU64,
    chunk_size: u64,
    global_violations: AtomicU64,
    local_violations: AtomicU64,
}

impl Default for GlobalTracker {
    fn default() -> Self {
        Self::new(0)
    }
}

impl GlobalTracker {
    pub fn new(limit: u64) -> Self {
        Self::with_chunk_size(limit, DEFAULT_CHUNK_SIZE)
    }

    /// # Panics
    /// If `chunk_size` is zero.
    pub fn with_chunk_size(limit: u64, chunk_size: u64) -> Self {
        assert!(chunk_size > 0, "chunk size must be non-zero");
        Self {
            current: AtomicI64::new(0),
            limit: AtomicU64::new(limit),
            chunk_size,
            global_violations: AtomicU64::new(0),
            local_violations: AtomicU64::new(0),
        }
    }

    pub fn from_config(cfg: &MemoryConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self::with_chunk_size(
            cfg.global_limit.as_bytes(),
            cfg.chunk_size.as_bytes(),
        ))
    }

    /// Lazily-initialised process-wide instance, configured from the
    /// environment on first use.
    pub fn shared() -> Arc<GlobalTracker> {
        Arc::clone(&PROCESS)
    }

    pub fn set_limit(&self, limit: u64) {
        self.limit.store(limit, Ordering::Relaxed);
    }

    pub fn limit(&self) -> u64 {
        self.limit.load(Ordering::Relaxed)
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Combined usage of all local trackers, at chunk granularity.
    pub fn current(&self) -> i64 {
        self.current.load(Ordering::Relaxed)
    }

    /// Try to add `bytes`. Returns false, leaving the counter untouched, if
    /// that would exceed the limit or cannot be represented at all. The
    /// caller records the violation.
    pub fn increase(&self, bytes: u64) -> bool {
        let Ok(bytes) = i64::try_from(bytes) else {
            return false;
        };
        // Unlimited still has to stay below i64::MAX.
        let limit = match self.limit() {
            0 => i64::MAX,
            limit => to_signed(limit),
        };

        let mut cur = self.current.load(Ordering::Relaxed);
        loop {
            let Some(next) = cur.checked_add(bytes) else {
                return false;
            };
            if next > limit {
                return false;
            }
            match self
                .current
                .compare_exchange_weak(cur, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return true,
                Err(observed) => cur = observed,
            }
        }
    }

    pub fn decrease(&self, bytes: u64) {
        self.current.fetch_sub(to_signed(bytes), Ordering::AcqRel);
    }

    /// Unconditional signed correction. Only the local rollback path uses
    /// this; it bypasses the limit on purpose.
    pub fn force_adjust(&self, delta: i64) {
        self.current.fetch_add(delta, Ordering::AcqRel);
    }

    pub fn track_global_violation(&self) {
        self.global_violations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn track_local_violation(&self) {
        self.local_violations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> ViolationStats {
        ViolationStats {
            global_limit_reached: self.global_violations.load(Ordering::Relaxed),
            local_limit_reached: self.local_violations.load(Ordering::Relaxed),
        }
    }
}

fn to_signed(bytes: u64) -> i64 {
    i64::try_from(bytes).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn unlimited_always_admits() {
        let g = GlobalTracker::new(0);
        assert!(g.increase(u32::MAX as u64));
        assert_eq!(g.current(), u32::MAX as i64);
        g.decrease(u32::MAX as u64);
        assert_eq!(g.current(), 0);
    }

    #[test]
    fn unrepresentable_increase_is_refused() {
        let g = GlobalTracker::new(0);
        assert!(!g.increase(u64::MAX));
        assert!(!g.increase(i64::MAX as u64 + 1));
        assert_eq!(g.current(), 0);

        assert!(g.increase(i64::MAX as u64));
        assert!(!g.increase(1));
        assert_eq!(g.current(), i64::MAX);
        g.decrease(i64::MAX as u64);
        assert_eq!(g.current(), 0);

        let limited = GlobalTracker::new(1000);
        assert!(!limited.increase(u64::MAX));
        assert_eq!(limited.current(), 0);
    }

    #[test]
    fn limit_rejects_without_mutating() {
        let g = GlobalTracker::new(1000);
        assert!(g.increase(1000));
        assert!(!g.increase(1));
        assert_eq!(g.current(), 1000);
        g.decrease(400);
        assert!(g.increase(400));
        assert!(!g.increase(1));
    }

    #[test]
    fn force_adjust_goes_negative_and_back() {
        let g = GlobalTracker::new(10);
        g.force_adjust(-5);
        assert_eq!(g.current(), -5);
        g.force_adjust(20);
        assert_eq!(g.current(), 15);
        g.force_adjust(-15);
        assert_eq!(g.current(), 0);
    }

    #[test]
    fn violation_counters() {
        let g = GlobalTracker::default();
        g.track_global_violation();
        g.track_local_violation();
        g.track_local_violation();
        let s = g.stats();
        assert_eq!(s.global_limit_reached, 1);
        assert_eq!(s.local_limit_reached, 2);
    }

    #[test]
    fn set_limit_applies_to_later_calls() {
        let g = GlobalTracker::new(0);
        assert!(g.increase(500));
        g.set_limit(600);
        assert_eq!(g.limit(), 600);
        assert!(!g.increase(200));
        assert!(g.increase(100));
    }

    #[test]
    fn shared_is_one_instance() {
        let a = GlobalTracker::shared();
        let b = GlobalTracker::shared();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.chunk_size() > 0);
    }

    #[test]
    fn from_config_rejects_zero_chunk() {
        let cfg = MemoryConfig {
            chunk_size: memgov_core::ByteSize::from_bytes(0),
            ..MemoryConfig::default()
        };
        assert!(GlobalTracker::from_config(&cfg).is_err());
    }

    #[test]
    fn concurrent_admission_never_exceeds_limit() {
        let g = Arc::new(GlobalTracker::new(10_000));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let g = Arc::clone(&g);
                thread::spawn(move || {
                    let mut granted = 0u64;
                    for _ in 0..1_000 {
                        if g.increase(7) {
                            granted += 7;
                        }
                    }
                    granted
                })
            })
            .collect();

        let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert!(total <= 10_000);
        assert_eq!(g.current(), total as i64);
    }
}

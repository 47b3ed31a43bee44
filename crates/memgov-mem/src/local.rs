//! Per-query memory tracker with chunked propagation to the global tracker.
//!
//! The local counter is exact. The global tracker is only told about whole
//! chunks: it holds `floor(current / chunk_size) * chunk_size` on behalf of
//! each local tracker, so small increases and decreases that stay within the
//! current chunk never touch shared state.
//!
//! Failed increases must give back exactly what they took. Between the
//! optimistic reservation and the rollback another thread may have moved the
//! counter (a tracker shared across threads), so the rollback recomputes the
//! chunk delta from the values it actually swapped and force-adjusts the
//! global counter by whatever the two deltas disagree on. In the common
//! single-owner case they cancel out and the global counter is not touched.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use memgov_core::config::MemoryConfig;
use memgov_core::stats::UsageSnapshot;

use crate::error::{Error, LimitOrigin, Result};
use crate::global::GlobalTracker;

#[derive(Debug)]
pub struct LocalTracker {
    global: Arc<GlobalTracker>,
    current: AtomicU64,
    peak: AtomicU64,
    /// Zero means only the global ceiling applies.
    limit: AtomicU64,
}

impl LocalTracker {
    pub fn new(global: Arc<GlobalTracker>) -> Self {
        Self::with_limit(global, 0)
    }

    pub fn with_limit(global: Arc<GlobalTracker>, limit: u64) -> Self {
        Self {
            global,
            current: AtomicU64::new(0),
            peak: AtomicU64::new(0),
            limit: AtomicU64::new(limit),
        }
    }

    /// Local tracker using the per-query ceiling from `cfg`.
    pub fn from_config(global: Arc<GlobalTracker>, cfg: &MemoryConfig) -> Self {
        Self::with_limit(global, cfg.query_limit.as_bytes())
    }

    pub fn global(&self) -> &Arc<GlobalTracker> {
        &self.global
    }

    pub fn set_limit(&self, limit: u64) {
        self.limit.store(limit, Ordering::Relaxed);
    }

    pub fn limit(&self) -> u64 {
        self.limit.load(Ordering::Relaxed)
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Relaxed)
    }

    pub fn peak(&self) -> u64 {
        self.peak.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            current: self.current(),
            peak: self.peak(),
            limit: self.limit(),
        }
    }

    /// Zero both counters without releasing anything globally. Only valid
    /// once the caller has released the global share some other way.
    pub fn reset(&self) {
        self.current.store(0, Ordering::Relaxed);
        self.peak.store(0, Ordering::Relaxed);
    }

    /// Charge `bytes` to this query. On failure nothing stays charged,
    /// locally or globally.
    pub fn increase(&self, bytes: u64) -> Result<()> {
        if bytes == 0 {
            return Ok(());
        }

        let limit = self.limit();
        let update = self
            .current
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
                cur.checked_add(bytes)
            });
        let previous = match update {
            Ok(previous) => previous,
            // No counter can hold the request; deny it without touching state.
            Err(cur) if limit > 0 => {
                self.global.track_local_violation();
                return Err(self.limit_error(LimitOrigin::Local, bytes, limit, cur));
            }
            Err(cur) => {
                self.global.track_global_violation();
                let global_limit = self.global.limit();
                return Err(self.limit_error(LimitOrigin::Global, bytes, global_limit, cur));
            }
        };
        let next = previous + bytes;

        if limit > 0 && next > limit {
            self.rollback(previous, next, bytes);
            self.global.track_local_violation();
            return Err(self.limit_error(LimitOrigin::Local, bytes, limit, previous));
        }

        let chunk_size = self.global.chunk_size();
        let diff = self.chunks(next) - self.chunks(previous);
        if diff != 0 && !self.global.increase(diff * chunk_size) {
            self.rollback(previous, next, bytes);
            self.global.track_global_violation();
            let global_limit = self.global.limit();
            return Err(self.limit_error(LimitOrigin::Global, bytes, global_limit, previous));
        }

        self.raise_peak(next);
        Ok(())
    }

    /// Release `bytes`. Never fails.
    ///
    /// # Panics
    /// If more is released than is currently charged.
    pub fn decrease(&self, bytes: u64) {
        if bytes == 0 {
            return;
        }

        let update = self
            .current
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
                cur.checked_sub(bytes)
            });
        let previous = match update {
            Ok(previous) => previous,
            Err(cur) => panic!("releasing {bytes} bytes from a tracker holding only {cur}"),
        };
        let next = previous - bytes;

        let diff = self.chunks(previous) - self.chunks(next);
        if diff != 0 {
            self.global.decrease(diff * self.global.chunk_size());
        }
    }

    fn chunks(&self, bytes: u64) -> u64 {
        bytes / self.global.chunk_size()
    }

    /// Undo a reservation of `bytes` that moved the counter `previous -> next`
    /// and whose chunk delta never reached the global tracker.
    fn rollback(&self, previous: u64, next: u64, bytes: u64) {
        let mut before = self.current.load(Ordering::Relaxed);
        let mut after;
        loop {
            after = before.wrapping_sub(bytes);
            match self.current.compare_exchange_weak(
                before,
                after,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => before = observed,
            }
        }

        // Chunk counts near u64::MAX do not fit i64; widen before subtracting.
        let unapplied = i128::from(self.chunks(next)) - i128::from(self.chunks(previous));
        let released = i128::from(self.chunks(before)) - i128::from(self.chunks(after));
        let adjust = (unapplied - released) * i128::from(self.global.chunk_size());
        if adjust != 0 {
            let delta = i64::try_from(adjust)
                .unwrap_or(if adjust < 0 { i64::MIN } else { i64::MAX });
            self.global.force_adjust(delta);
        }
    }

    fn raise_peak(&self, used: u64) {
        let mut cur = self.peak.load(Ordering::Relaxed);
        while used > cur {
            match self
                .peak
                .compare_exchange(cur, used, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(used, previous_peak = cur, "local memory peak");
                    break;
                }
                Err(observed) => cur = observed,
            }
        }
    }

    fn limit_error(&self, origin: LimitOrigin, requested: u64, limit: u64, current: u64) -> Error {
        #[cfg(feature = "tracing")]
        tracing::debug!(%origin, requested, limit, current, "memory limit reached");
        Error::ResourceLimit {
            origin,
            requested,
            limit,
            current,
        }
    }
}

impl Drop for LocalTracker {
    fn drop(&mut self) {
        let current = *self.current.get_mut();
        if current == 0 {
            return;
        }
        // Hand the global share back so a leak cannot drift the process total.
        let held = self.chunks(current) * self.global.chunk_size();
        if held > 0 {
            self.global.decrease(held);
        }
        debug_assert!(
            std::thread::panicking(),
            "local tracker dropped with {current} bytes still charged"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn global(limit: u64, chunk: u64) -> Arc<GlobalTracker> {
        Arc::new(GlobalTracker::with_chunk_size(limit, chunk))
    }

    #[test]
    fn small_increases_stay_local() {
        let g = global(0, 1024);
        let local = LocalTracker::new(Arc::clone(&g));

        for _ in 0..100 {
            local.increase(10).unwrap();
        }
        assert_eq!(local.current(), 1000);
        assert_eq!(g.current(), 0);

        local.increase(24).unwrap();
        assert_eq!(g.current(), 1024);

        local.decrease(1);
        assert_eq!(g.current(), 0);
        local.decrease(1023);
        assert_eq!(local.current(), 0);
        assert_eq!(g.current(), 0);
    }

    #[test]
    fn large_increase_spans_several_chunks() {
        let g = global(0, 100);
        let local = LocalTracker::new(Arc::clone(&g));

        local.increase(350).unwrap();
        assert_eq!(g.current(), 300);
        local.increase(60).unwrap();
        assert_eq!(g.current(), 400);
        local.decrease(410);
        assert_eq!(g.current(), 0);
    }

    #[test]
    fn local_limit_rejects_and_restores() {
        let g = global(0, 1);
        let local = LocalTracker::with_limit(Arc::clone(&g), 100);

        local.increase(80).unwrap();
        let err = local.increase(21).unwrap_err();
        assert_eq!(err.origin(), Some(LimitOrigin::Local));
        assert_eq!(local.current(), 80);
        assert_eq!(g.current(), 80);
        assert_eq!(g.stats().local_limit_reached, 1);
        assert_eq!(g.stats().global_limit_reached, 0);

        local.increase(20).unwrap();
        assert_eq!(local.current(), 100);
        local.decrease(100);
    }

    #[test]
    fn local_limit_checked_below_chunk_granularity() {
        let g = global(0, 32 * 1024);
        let local = LocalTracker::with_limit(Arc::clone(&g), 100);

        local.increase(100).unwrap();
        assert!(local.increase(1).is_err());
        assert_eq!(local.current(), 100);
        assert_eq!(g.current(), 0);
        local.decrease(100);
    }

    #[test]
    fn global_limit_rejects_and_restores() {
        let g = global(1000, 100);
        let local = LocalTracker::new(Arc::clone(&g));

        local.increase(950).unwrap();
        assert_eq!(g.current(), 900);
        let err = local.increase(150).unwrap_err();
        assert_eq!(err.origin(), Some(LimitOrigin::Global));
        assert!(err.is_resource_limit());
        assert_eq!(local.current(), 950);
        assert_eq!(g.current(), 900);
        assert_eq!(g.stats().global_limit_reached, 1);

        local.decrease(950);
        assert_eq!(g.current(), 0);
    }

    #[test]
    fn overflowing_request_denied_as_local_limit() {
        let g = global(0, 64);
        let local = LocalTracker::with_limit(Arc::clone(&g), 100);
        local.increase(10).unwrap();

        let err = local.increase(u64::MAX - 5).unwrap_err();
        assert_eq!(err.origin(), Some(LimitOrigin::Local));
        assert_eq!(local.current(), 10);
        assert_eq!(local.peak(), 10);
        assert_eq!(g.current(), 0);
        assert_eq!(g.stats().local_limit_reached, 1);

        local.decrease(10);
    }

    #[test]
    fn overflowing_request_denied_without_limits() {
        let g = global(0, 1);
        let local = LocalTracker::new(Arc::clone(&g));
        local.increase(10).unwrap();

        let err = local.increase(u64::MAX).unwrap_err();
        assert_eq!(err.origin(), Some(LimitOrigin::Global));
        assert_eq!(local.current(), 10);
        assert_eq!(g.current(), 10);
        assert_eq!(g.stats().global_limit_reached, 1);

        // Fits the local counter but not the global one.
        let err = local.increase(u64::MAX - 100).unwrap_err();
        assert_eq!(err.origin(), Some(LimitOrigin::Global));
        assert_eq!(local.current(), 10);
        assert_eq!(g.current(), 10);

        local.decrease(10);
        assert_eq!(g.current(), 0);
    }

    #[test]
    fn peak_is_monotonic_and_covers_current() {
        let g = global(0, 64);
        let local = LocalTracker::new(g);

        local.increase(30).unwrap();
        assert_eq!(local.peak(), 30);
        local.increase(50).unwrap();
        assert_eq!(local.peak(), 80);
        local.decrease(70);
        assert_eq!(local.peak(), 80);
        local.increase(20).unwrap();
        assert_eq!(local.peak(), 80);
        assert!(local.peak() >= local.current());
        local.decrease(30);
    }

    #[test]
    fn failed_increase_does_not_raise_peak() {
        let g = global(0, 1);
        let local = LocalTracker::with_limit(g, 50);
        local.increase(40).unwrap();
        assert!(local.increase(40).is_err());
        assert_eq!(local.peak(), 40);
        local.decrease(40);
    }

    #[test]
    fn reset_leaves_global_untouched() {
        let g = global(0, 10);
        let local = LocalTracker::new(Arc::clone(&g));
        local.increase(25).unwrap();
        assert_eq!(g.current(), 20);

        g.decrease(20);
        local.reset();
        assert_eq!(local.current(), 0);
        assert_eq!(local.peak(), 0);
        assert_eq!(g.current(), 0);
    }

    #[test]
    fn snapshot_reports_limit() {
        let local = LocalTracker::with_limit(global(0, 8), 512);
        local.increase(12).unwrap();
        let snap = local.snapshot();
        assert_eq!(snap.current, 12);
        assert_eq!(snap.peak, 12);
        assert_eq!(snap.limit, 512);
        local.decrease(12);
    }

    #[test]
    #[should_panic(expected = "releasing")]
    fn over_release_panics() {
        let local = LocalTracker::new(global(0, 8));
        local.increase(4).unwrap();
        local.decrease(5);
    }

    #[test]
    fn shared_tracker_conserves_under_contention() {
        // The local ceiling sits just above the last admissible chunk, so
        // both the local and the global rollback run concurrently.
        let g = global(1024, 64);
        let local = Arc::new(LocalTracker::with_limit(Arc::clone(&g), 1100));

        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let local = Arc::clone(&local);
                thread::spawn(move || {
                    let mut held = Vec::new();
                    for i in 0..2_000u64 {
                        let bytes = 1 + (i * 7 + t * 13) % 97;
                        if local.increase(bytes).is_ok() {
                            held.push(bytes);
                        }
                        if i % 3 == 0 {
                            if let Some(b) = held.pop() {
                                local.decrease(b);
                            }
                        }
                    }
                    for b in held {
                        local.decrease(b);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().expect("worker panicked");
        }

        assert_eq!(local.current(), 0);
        assert_eq!(g.current(), 0);
        assert!(local.peak() <= 1100);
        let stats = g.stats();
        assert!(stats.local_limit_reached > 0);
        assert!(stats.global_limit_reached > 0);
    }
}

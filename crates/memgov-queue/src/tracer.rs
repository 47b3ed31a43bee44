//! Timing decorator for frontier components.
//!
//! `Tracer<T>` forwards every call to the wrapped component unchanged and
//! records call count and total wall time per method name. It implements the
//! same contract as what it wraps, so a traced queue drops in wherever a
//! plain one is expected. The recording happens in a drop guard, so calls
//! that panic are still counted.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use memgov_mem::Result;
use serde::Serialize;

use crate::traits::Queue;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TraceStats {
    pub calls: u64,
    pub total: Duration,
}

impl TraceStats {
    fn record(&mut self, elapsed: Duration) {
        self.calls += 1;
        self.total += elapsed;
    }

    pub fn mean(&self) -> Duration {
        if self.calls == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total.as_nanos() / u128::from(self.calls);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// Serializable summary of one tracer.
#[derive(Debug, Clone, Serialize)]
pub struct TraceReport {
    pub component: &'static str,
    pub methods: BTreeMap<&'static str, TraceStats>,
}

type StatsMap = RefCell<BTreeMap<&'static str, TraceStats>>;

/// Records the elapsed time of one call when dropped.
struct Span<'a> {
    stats: &'a StatsMap,
    method: &'static str,
    start: Instant,
}

impl<'a> Span<'a> {
    fn enter(stats: &'a StatsMap, method: &'static str) -> Self {
        Self {
            stats,
            method,
            start: Instant::now(),
        }
    }
}

impl Drop for Span<'_> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        if let Ok(mut stats) = self.stats.try_borrow_mut() {
            stats.entry(self.method).or_default().record(elapsed);
        }
    }
}

pub struct Tracer<T> {
    inner: T,
    component: &'static str,
    stats: StatsMap,
}

impl<T> Tracer<T> {
    pub fn new(inner: T) -> Self {
        Self::named(inner, std::any::type_name::<T>())
    }

    pub fn named(inner: T, component: &'static str) -> Self {
        Self {
            inner,
            component,
            stats: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Direct access to the wrapped component. Calls made through it are
    /// not recorded.
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn stats(&self) -> BTreeMap<&'static str, TraceStats> {
        self.stats.borrow().clone()
    }

    pub fn report(&self) -> TraceReport {
        TraceReport {
            component: self.component,
            methods: self.stats(),
        }
    }
}

impl<Q: Queue> Queue for Tracer<Q> {
    type Step = Q::Step;

    fn append(&mut self, step: Q::Step) -> Result<()> {
        let _span = Span::enter(&self.stats, "append");
        self.inner.append(step)
    }

    fn set_start_content(&mut self, steps: Vec<Q::Step>) -> Result<()> {
        let _span = Span::enter(&self.stats, "set_start_content");
        self.inner.set_start_content(steps)
    }

    fn pop(&mut self) -> Q::Step {
        let _span = Span::enter(&self.stats, "pop");
        self.inner.pop()
    }

    fn is_empty(&self) -> bool {
        let _span = Span::enter(&self.stats, "is_empty");
        self.inner.is_empty()
    }

    fn size(&self) -> usize {
        let _span = Span::enter(&self.stats, "size");
        self.inner.size()
    }

    fn has_processable_element(&self) -> bool {
        let _span = Span::enter(&self.stats, "has_processable_element");
        self.inner.has_processable_element()
    }

    fn get_loose_ends(&mut self) -> Vec<&mut Q::Step> {
        let _span = Span::enter(&self.stats, "get_loose_ends");
        self.inner.get_loose_ends()
    }

    fn clear(&mut self) {
        let _span = Span::enter(&self.stats, "clear");
        self.inner.clear()
    }
}

impl<T> Drop for Tracer<T> {
    fn drop(&mut self) {
        #[cfg(feature = "tracing")]
        for (method, stats) in self.stats.get_mut().iter() {
            tracing::debug!(
                component = self.component,
                method,
                calls = stats.calls,
                total_us = stats.total.as_micros() as u64,
                "tracer stats"
            );
        }
    }
}

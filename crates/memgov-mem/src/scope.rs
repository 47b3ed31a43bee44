//! RAII guard over a local tracker.
//!
//! Whatever the guard has borrowed is released when it goes out of scope,
//! including on early `?` returns and panics. Call [`ScopedUsage::steal`] once
//! the memory has a new owner that will release it later.

use crate::error::Result;
use crate::local::LocalTracker;

#[must_use = "dropping the guard immediately releases what it borrowed"]
pub struct ScopedUsage<'a> {
    tracker: &'a LocalTracker,
    borrowed: u64,
}

impl<'a> ScopedUsage<'a> {
    pub fn new(tracker: &'a LocalTracker) -> Self {
        Self {
            tracker,
            borrowed: 0,
        }
    }

    /// Guard that has already charged `bytes`.
    pub fn with_bytes(tracker: &'a LocalTracker, bytes: u64) -> Result<Self> {
        let mut guard = Self::new(tracker);
        guard.increase(bytes)?;
        Ok(guard)
    }

    pub fn increase(&mut self, bytes: u64) -> Result<()> {
        self.tracker.increase(bytes)?;
        self.borrowed += bytes;
        Ok(())
    }

    /// # Panics
    /// If `bytes` exceeds what this guard has borrowed.
    pub fn decrease(&mut self, bytes: u64) {
        assert!(
            bytes <= self.borrowed,
            "guard releasing {bytes} bytes but only borrowed {}",
            self.borrowed
        );
        self.tracker.decrease(bytes);
        self.borrowed -= bytes;
    }

    /// Give up responsibility for the borrowed amount without releasing it.
    /// Returns the amount now owned by the caller.
    pub fn steal(&mut self) -> u64 {
        std::mem::take(&mut self.borrowed)
    }

    pub fn borrowed(&self) -> u64 {
        self.borrowed
    }

    pub fn tracker(&self) -> &'a LocalTracker {
        self.tracker
    }
}

impl Drop for ScopedUsage<'_> {
    fn drop(&mut self) {
        if self.borrowed > 0 {
            self.tracker.decrease(self.borrowed);
            self.borrowed = 0;
        }
    }
}

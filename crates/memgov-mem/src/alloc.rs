//! Allocator-shaped facade over a local tracker, plus buffers built on it.
//!
//! Growable buffers of a query should come from here so that their backing
//! store is charged to the query before it is allocated. Charges follow the
//! buffer's reserved capacity, not its length.

use std::mem::size_of;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::error::Result;
use crate::local::LocalTracker;

/// Cheap cloneable handle that charges allocations to one local tracker.
#[derive(Clone, Debug)]
pub struct TrackingAllocator {
    tracker: Arc<LocalTracker>,
}

impl TrackingAllocator {
    pub fn new(tracker: Arc<LocalTracker>) -> Self {
        Self { tracker }
    }

    pub fn allocate(&self, bytes: u64) -> Result<()> {
        self.tracker.increase(bytes)
    }

    pub fn deallocate(&self, bytes: u64) {
        self.tracker.decrease(bytes);
    }

    pub fn tracker(&self) -> &Arc<LocalTracker> {
        &self.tracker
    }
}

/// Bytes charged on behalf of one buffer. Returned to the tracker on drop.
#[derive(Debug)]
struct Charge {
    alloc: TrackingAllocator,
    bytes: u64,
}

impl Charge {
    fn new(alloc: TrackingAllocator) -> Self {
        Self { alloc, bytes: 0 }
    }

    /// Move the charge to `new_bytes`. Shrinking always succeeds; growing
    /// fails without changing the charge.
    fn try_resize(&mut self, new_bytes: u64) -> Result<()> {
        if new_bytes > self.bytes {
            self.alloc.allocate(new_bytes - self.bytes)?;
        } else if new_bytes < self.bytes {
            self.alloc.deallocate(self.bytes - new_bytes);
        }
        self.bytes = new_bytes;
        Ok(())
    }
}

impl Drop for Charge {
    fn drop(&mut self) {
        if self.bytes > 0 {
            self.alloc.deallocate(self.bytes);
            self.bytes = 0;
        }
    }
}

fn bytes_for<T>(elements: usize) -> u64 {
    (elements as u64).saturating_mul(size_of::<T>() as u64)
}

/// `Vec<T>` whose capacity is charged to a local tracker.
#[derive(Debug)]
pub struct TrackedVec<T> {
    charge: Charge,
    buf: Vec<T>,
}

impl<T> TrackedVec<T> {
    pub fn new(alloc: TrackingAllocator) -> Self {
        Self {
            charge: Charge::new(alloc),
            buf: Vec::new(),
        }
    }

    pub fn with_capacity(alloc: TrackingAllocator, cap: usize) -> Result<Self> {
        let mut v = Self::new(alloc);
        v.try_reserve(cap)?;
        Ok(v)
    }

    /// Reserve room for `additional` more elements, charging first.
    pub fn try_reserve(&mut self, additional: usize) -> Result<()> {
        let wanted = self.buf.len().saturating_add(additional);
        if wanted <= self.buf.capacity() {
            return Ok(());
        }
        self.grow_to(wanted)
    }

    /// Push, doubling capacity when full. A denied charge leaves the vector
    /// unchanged.
    pub fn try_push(&mut self, value: T) -> Result<()> {
        if self.buf.len() == self.buf.capacity() {
            let new_cap = (self.buf.capacity() * 2).max(4);
            self.grow_to(new_cap)?;
        }
        self.buf.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<T> {
        self.buf.pop()
    }

    /// Drops the elements, keeps (and keeps charging) the capacity.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn shrink_to_fit(&mut self) {
        self.buf.shrink_to_fit();
        let target = bytes_for::<T>(self.buf.capacity()).min(self.charge.bytes);
        // Shrinking cannot fail.
        let _ = self.charge.try_resize(target);
    }

    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    pub fn accounted_bytes(&self) -> u64 {
        self.charge.bytes
    }

    /// Release the charge and hand back the plain vector.
    pub fn into_inner(mut self) -> Vec<T> {
        let _ = self.charge.try_resize(0);
        std::mem::take(&mut self.buf)
    }

    fn grow_to(&mut self, new_cap: usize) -> Result<()> {
        self.charge.try_resize(bytes_for::<T>(new_cap))?;
        self.buf.reserve_exact(new_cap - self.buf.len());
        // The allocator may hand out more than asked for.
        let reserved = bytes_for::<T>(self.buf.capacity());
        if reserved > self.charge.bytes && self.charge.try_resize(reserved).is_err() {
            self.buf.shrink_to(new_cap);
            let kept = bytes_for::<T>(self.buf.capacity());
            let _ = self.charge.try_resize(kept.min(self.charge.bytes));
        }
        Ok(())
    }
}

impl<T> Deref for TrackedVec<T> {
    type Target = [T];
    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl<T> DerefMut for TrackedVec<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buf
    }
}

/// `String` whose capacity is charged to a local tracker.
#[derive(Debug)]
pub struct TrackedString {
    charge: Charge,
    buf: String,
}

impl TrackedString {
    pub fn new(alloc: TrackingAllocator) -> Self {
        Self {
            charge: Charge::new(alloc),
            buf: String::new(),
        }
    }

    pub fn try_push_str(&mut self, s: &str) -> Result<()> {
        let wanted = self.buf.len() + s.len();
        if wanted > self.buf.capacity() {
            let new_cap = wanted.max(self.buf.capacity() * 2);
            self.charge.try_resize(new_cap as u64)?;
            self.buf.reserve_exact(new_cap - self.buf.len());
            let reserved = self.buf.capacity() as u64;
            if reserved > self.charge.bytes && self.charge.try_resize(reserved).is_err() {
                self.buf.shrink_to(new_cap);
            }
        }
        self.buf.push_str(s);
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn accounted_bytes(&self) -> u64 {
        self.charge.bytes
    }

    pub fn into_inner(mut self) -> String {
        let _ = self.charge.try_resize(0);
        std::mem::take(&mut self.buf)
    }
}

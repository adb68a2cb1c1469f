//! Allocation tracking hooks.
//!
//! Backends report every slot array, bucket array and pool chunk they
//! acquire or release through an [`AllocTracker`] handle passed in at
//! construction. The default [`Untracked`] compiles away entirely.

use alloc::sync::Arc;
use core::sync::atomic::AtomicUsize;
use core::sync::atomic::Ordering;

/// Receives allocation events from a table.
pub trait AllocTracker: Clone {
    /// Called after `bytes` of backing storage were acquired.
    fn record_allocation(&self, bytes: usize);

    /// Called when `bytes` of backing storage are released.
    fn record_deallocation(&self, bytes: usize);
}

/// Tracker that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct Untracked;

impl AllocTracker for Untracked {
    #[inline(always)]
    fn record_allocation(&self, _bytes: usize) {}

    #[inline(always)]
    fn record_deallocation(&self, _bytes: usize) {}
}

/// Snapshot of the counters held by a [`MemoryTracker`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AllocStats {
    /// Total bytes allocated.
    pub total_allocated: usize,
    /// Total bytes released.
    pub total_deallocated: usize,
    /// Bytes currently held.
    pub current_usage: usize,
    /// Highest value `current_usage` has reached.
    pub peak_usage: usize,
    /// Number of allocations.
    pub allocation_count: usize,
    /// Number of releases.
    pub deallocation_count: usize,
}

impl AllocStats {
    /// Bytes allocated but never released.
    pub fn leaked(&self) -> usize {
        self.total_allocated.saturating_sub(self.total_deallocated)
    }

    /// Allocations without a matching release.
    pub fn outstanding_allocations(&self) -> usize {
        self.allocation_count.saturating_sub(self.deallocation_count)
    }
}

#[derive(Debug, Default)]
struct Counters {
    total_allocated: AtomicUsize,
    total_deallocated: AtomicUsize,
    current_usage: AtomicUsize,
    peak_usage: AtomicUsize,
    allocation_count: AtomicUsize,
    deallocation_count: AtomicUsize,
}

/// A shareable byte counter.
///
/// Clones share the same counters, so one tracker can observe several maps.
///
/// ```rust
/// # use dual_hash::{HashMap, MemoryTracker, Strategy};
/// let tracker = MemoryTracker::new();
/// {
///     let mut map = HashMap::with_tracker(Strategy::SeparateChaining, 16, tracker.clone());
///     map.insert(1, "one").unwrap();
///     assert!(tracker.stats().current_usage > 0);
/// }
/// assert_eq!(tracker.stats().leaked(), 0);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryTracker {
    counters: Arc<Counters>,
}

impl MemoryTracker {
    /// Creates a tracker with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current counter values.
    pub fn stats(&self) -> AllocStats {
        let c = &self.counters;
        AllocStats {
            total_allocated: c.total_allocated.load(Ordering::Relaxed),
            total_deallocated: c.total_deallocated.load(Ordering::Relaxed),
            current_usage: c.current_usage.load(Ordering::Relaxed),
            peak_usage: c.peak_usage.load(Ordering::Relaxed),
            allocation_count: c.allocation_count.load(Ordering::Relaxed),
            deallocation_count: c.deallocation_count.load(Ordering::Relaxed),
        }
    }

    /// Resets every counter to zero.
    pub fn reset(&self) {
        let c = &self.counters;
        for counter in [
            &c.total_allocated,
            &c.total_deallocated,
            &c.current_usage,
            &c.peak_usage,
            &c.allocation_count,
            &c.deallocation_count,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl AllocTracker for MemoryTracker {
    fn record_allocation(&self, bytes: usize) {
        let c = &self.counters;
        c.total_allocated.fetch_add(bytes, Ordering::Relaxed);
        c.allocation_count.fetch_add(1, Ordering::Relaxed);
        let current = c.current_usage.fetch_add(bytes, Ordering::Relaxed) + bytes;
        c.peak_usage.fetch_max(current, Ordering::Relaxed);
    }

    fn record_deallocation(&self, bytes: usize) {
        let c = &self.counters;
        c.total_deallocated.fetch_add(bytes, Ordering::Relaxed);
        c.deallocation_count.fetch_add(1, Ordering::Relaxed);
        // Saturate so a reset between allocation and release cannot wrap.
        let _ = c
            .current_usage
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
                Some(cur.saturating_sub(bytes))
            });
    }
}

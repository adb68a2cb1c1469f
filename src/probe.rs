//! Per-operation probe counters.

use core::cell::Cell;

/// Kind of operation a probe count is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    /// A call to `insert`.
    Insert,
    /// A call to `search`.
    Search,
    /// A call to `remove`.
    Remove,
}

#[derive(Debug, Default, Clone)]
struct Counter {
    ops: Cell<u64>,
    probes: Cell<u64>,
}

impl Counter {
    fn record(&self, probes: usize) {
        self.ops.set(self.ops.get() + 1);
        self.probes.set(self.probes.get() + probes as u64);
    }

    fn average(&self) -> f64 {
        match self.ops.get() {
            0 => 0.0,
            ops => self.probes.get() as f64 / ops as f64,
        }
    }

    fn reset(&self) {
        self.ops.set(0);
        self.probes.set(0);
    }
}

/// Running counts of slots (or chain nodes) visited per operation.
///
/// Diagnostic only. Counts are kept in [`Cell`]s so that lookups through a
/// shared reference can still record.
#[derive(Debug, Default, Clone)]
pub struct ProbeStats {
    insert: Counter,
    search: Counter,
    remove: Counter,
}

impl ProbeStats {
    fn counter(&self, kind: ProbeKind) -> &Counter {
        match kind {
            ProbeKind::Insert => &self.insert,
            ProbeKind::Search => &self.search,
            ProbeKind::Remove => &self.remove,
        }
    }

    #[inline]
    pub(crate) fn record(&self, kind: ProbeKind, probes: usize) {
        self.counter(kind).record(probes);
    }

    /// Mean probes per operation of `kind`, or `0.0` if none were recorded.
    pub fn average(&self, kind: ProbeKind) -> f64 {
        self.counter(kind).average()
    }

    /// Number of operations of `kind` recorded since the last reset.
    pub fn operations(&self, kind: ProbeKind) -> u64 {
        self.counter(kind).ops.get()
    }

    /// Total probes of `kind` recorded since the last reset.
    pub fn total_probes(&self, kind: ProbeKind) -> u64 {
        self.counter(kind).probes.get()
    }

    /// Zeroes every counter.
    pub fn reset(&self) {
        self.insert.reset();
        self.search.reset();
        self.remove.reset();
    }
}

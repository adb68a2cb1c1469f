//! Open addressing with linear probing and tombstones.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::error::Error;
use crate::error::Result;
use crate::mix::bucket_index;
use crate::mix::round_capacity;
use crate::probe::ProbeKind;
use crate::probe::ProbeStats;
use crate::store::Store;
use crate::store::check_load_factor;
use crate::tracker::AllocTracker;
use crate::tracker::Untracked;

/// Default maximum load factor, counting tombstones as load.
pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.7;

/// A single slot of the table.
///
/// `Empty` terminates a probe sequence, `Tombstone` does not. Tombstones only
/// turn back into `Empty` through a rebuild or [`OpenAddressing::clear`].
enum Slot {
    Empty,
    Occupied { key: i32, value: String },
    Tombstone,
}

const SLOT_BYTES: usize = core::mem::size_of::<Slot>();

/// Number of live entries plus tombstones that triggers growth.
///
/// Clamped so at least one `Empty` slot always remains, which keeps every
/// probe sequence finite.
#[inline(always)]
fn load_threshold(capacity: usize, max_load_factor: f64) -> usize {
    ((capacity as f64 * max_load_factor) as usize).clamp(1, capacity - 1)
}

/// A flat hash table resolving collisions by linear probing.
///
/// Removal leaves a tombstone behind so later probe sequences that passed
/// through the slot still reach their entries. Inserts recycle the first
/// tombstone on their probe path. Capacity doubles once live entries plus
/// tombstones reach the load threshold; the rebuild drops every tombstone.
///
/// ## Example
///
/// ```rust
/// # use dual_hash::open_addressing::OpenAddressing;
/// # use dual_hash::Store;
/// let mut table = OpenAddressing::with_capacity(8);
/// assert_eq!(table.capacity(), 16);
///
/// table.insert(3, "three".into()).unwrap();
/// assert_eq!(table.search(3), Some("three"));
/// assert!(table.remove(3));
/// assert_eq!(table.tombstones(), 1);
/// ```
pub struct OpenAddressing<A: AllocTracker = Untracked> {
    slots: Vec<Slot>,
    len: usize,
    tombstones: usize,
    load_threshold: usize,
    max_load_factor: f64,
    probes: ProbeStats,
    tracker: A,
}

impl<A: AllocTracker> Debug for OpenAddressing<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::format;
        use alloc::string::ToString;

        f.debug_struct("OpenAddressing")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("tombstones", &self.tombstones)
            .field("load_threshold", &self.load_threshold)
            .field(
                "slots",
                &self
                    .slots
                    .chunks(16)
                    .map(|row| {
                        row.iter()
                            .map(|slot| match slot {
                                Slot::Empty => "..".to_string(),
                                Slot::Tombstone => "xx".to_string(),
                                Slot::Occupied { key, .. } => format!("{key}"),
                            })
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl OpenAddressing<Untracked> {
    /// Creates a table with at least `capacity` slots.
    ///
    /// The capacity is rounded up to a power of two, and never below
    /// [`MIN_CAPACITY`](crate::MIN_CAPACITY).
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_tracker(capacity, Untracked)
    }
}

impl<A: AllocTracker> OpenAddressing<A> {
    /// Creates a table reporting its allocations to `tracker`.
    pub fn with_capacity_and_tracker(capacity: usize, tracker: A) -> Self {
        let capacity = round_capacity(capacity);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || Slot::Empty);
        Self::from_slots(slots, DEFAULT_MAX_LOAD_FACTOR, tracker)
    }

    /// Fallible counterpart of
    /// [`with_capacity_and_tracker`](Self::with_capacity_and_tracker) that
    /// also sets the maximum load factor.
    pub fn try_new(capacity: usize, max_load_factor: f64, tracker: A) -> Result<Self> {
        let max_load_factor = check_load_factor(max_load_factor)?;
        let slots = allocate_slots(round_capacity(capacity))?;
        Ok(Self::from_slots(slots, max_load_factor, tracker))
    }

    fn from_slots(slots: Vec<Slot>, max_load_factor: f64, tracker: A) -> Self {
        tracker.record_allocation(slots.len() * SLOT_BYTES);
        Self {
            load_threshold: load_threshold(slots.len(), max_load_factor),
            slots,
            len: 0,
            tombstones: 0,
            max_load_factor,
            probes: ProbeStats::default(),
            tracker,
        }
    }

    /// Number of tombstoned slots.
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    /// Live entries plus tombstones at which the next insert grows the table.
    pub fn load_threshold(&self) -> usize {
        self.load_threshold
    }

    /// Probe counters for inserts, searches and removes issued on this
    /// table.
    pub fn probe_stats(&self) -> &ProbeStats {
        &self.probes
    }

    /// Zeroes the probe counters.
    pub fn reset_probe_stats(&self) {
        self.probes.reset();
    }

    #[inline(always)]
    fn mask(&self) -> usize {
        self.slots.len() - 1
    }

    /// Finds the slot holding `key`, returning its index and the number of
    /// slots visited.
    #[inline]
    fn find_index(&self, key: i32) -> (Option<usize>, usize) {
        let mask = self.mask();
        let mut index = bucket_index(key, self.slots.len());
        let mut probes = 0;
        loop {
            probes += 1;
            match &self.slots[index] {
                Slot::Empty => return (None, probes),
                Slot::Occupied { key: occupied, .. } if *occupied == key => {
                    return (Some(index), probes);
                }
                Slot::Occupied { .. } | Slot::Tombstone => {}
            }
            index = (index + 1) & mask;
        }
    }

    /// Places `key` without checking the growth trigger, returning the
    /// replaced value and the number of slots visited.
    ///
    /// The entry lands in the first tombstone seen on the probe path, or in
    /// the terminating empty slot if there was none.
    fn place(&mut self, key: i32, value: String) -> (Option<String>, usize) {
        let mask = self.mask();
        let mut index = bucket_index(key, self.slots.len());
        let mut first_tombstone = None;
        let mut probes = 0;
        loop {
            probes += 1;
            match self.slots[index] {
                Slot::Empty => {
                    let target = match first_tombstone {
                        Some(tombstone) => {
                            self.tombstones -= 1;
                            tombstone
                        }
                        None => index,
                    };
                    self.slots[target] = Slot::Occupied { key, value };
                    self.len += 1;
                    return (None, probes);
                }
                Slot::Tombstone => {
                    first_tombstone.get_or_insert(index);
                }
                Slot::Occupied {
                    key: occupied,
                    value: ref mut existing,
                } if occupied == key => {
                    return (Some(core::mem::replace(existing, value)), probes);
                }
                Slot::Occupied { .. } => {}
            }
            index = (index + 1) & mask;
        }
    }

    #[cold]
    fn grow(&mut self) -> Result<()> {
        let old_capacity = self.slots.len();
        let new_capacity = old_capacity
            .checked_mul(2)
            .ok_or(Error::AllocationFailed { bytes: usize::MAX })?;
        let new_slots = allocate_slots(new_capacity)?;
        self.tracker.record_allocation(new_capacity * SLOT_BYTES);

        let old_slots = core::mem::replace(&mut self.slots, new_slots);
        let dropped_tombstones = core::mem::take(&mut self.tombstones);
        self.len = 0;
        self.load_threshold = load_threshold(new_capacity, self.max_load_factor);

        for slot in old_slots {
            if let Slot::Occupied { key, value } = slot {
                self.place(key, value);
            }
        }
        self.tracker.record_deallocation(old_capacity * SLOT_BYTES);

        log::debug!(
            "open addressing table grew {old_capacity} -> {new_capacity} slots \
             ({} live, {dropped_tombstones} tombstones dropped)",
            self.len
        );

        Ok(())
    }

    /// Returns detailed utilization statistics for debugging.
    #[cfg(feature = "stats")]
    pub fn debug_stats(&self) -> crate::store::DebugStats {
        let mask = self.mask();
        let mut empty_buckets = 0;
        let mut longest_probe = 0;
        for (index, slot) in self.slots.iter().enumerate() {
            match slot {
                Slot::Empty => empty_buckets += 1,
                Slot::Tombstone => {}
                Slot::Occupied { key, .. } => {
                    let home = bucket_index(*key, self.slots.len());
                    longest_probe = longest_probe.max((index.wrapping_sub(home) & mask) + 1);
                }
            }
        }

        crate::store::DebugStats {
            populated: self.len,
            capacity: self.capacity(),
            tombstones: self.tombstones,
            empty_buckets,
            longest_probe,
            load_factor: self.len as f64 / self.capacity() as f64,
            total_bytes: self.memory_usage(),
            pool_slots: 0,
        }
    }
}

impl<A: AllocTracker> Store for OpenAddressing<A> {
    fn insert(&mut self, key: i32, value: String) -> Result<Option<String>> {
        if self.len + self.tombstones >= self.load_threshold {
            self.grow()?;
        }

        let (previous, probes) = self.place(key, value);
        self.probes.record(ProbeKind::Insert, probes);
        debug_assert!(self.len + self.tombstones < self.slots.len());

        Ok(previous)
    }

    fn search(&self, key: i32) -> Option<&str> {
        let (index, probes) = self.find_index(key);
        self.probes.record(ProbeKind::Search, probes);

        match &self.slots[index?] {
            Slot::Occupied { value, .. } => Some(value.as_str()),
            Slot::Empty | Slot::Tombstone => unreachable!("find_index returned a vacant slot"),
        }
    }

    fn remove(&mut self, key: i32) -> bool {
        let (index, probes) = self.find_index(key);
        self.probes.record(ProbeKind::Remove, probes);

        let Some(index) = index else {
            return false;
        };
        self.slots[index] = Slot::Tombstone;
        self.len -= 1;
        self.tombstones += 1;

        true
    }

    fn len(&self) -> usize {
        self.len
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn clear(&mut self) {
        self.slots.fill_with(|| Slot::Empty);
        self.len = 0;
        self.tombstones = 0;
    }

    fn memory_usage(&self) -> usize {
        self.slots.len() * SLOT_BYTES
    }

    fn set_max_load_factor(&mut self, max_load_factor: f64) -> Result<()> {
        self.max_load_factor = check_load_factor(max_load_factor)?;
        self.load_threshold = load_threshold(self.slots.len(), self.max_load_factor);
        Ok(())
    }

    fn max_load_factor(&self) -> f64 {
        self.max_load_factor
    }
}

impl<A: AllocTracker> Drop for OpenAddressing<A> {
    fn drop(&mut self) {
        self.tracker.record_deallocation(self.slots.len() * SLOT_BYTES);
    }
}

fn allocate_slots(capacity: usize) -> Result<Vec<Slot>> {
    let mut slots = Vec::new();
    slots
        .try_reserve_exact(capacity)
        .map_err(Error::alloc::<Slot>(capacity))?;
    slots.resize_with(capacity, || Slot::Empty);
    Ok(slots)
}

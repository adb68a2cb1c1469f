use alloc::string::String;
use core::fmt::Debug;

use crate::chaining::SeparateChaining;
use crate::error::Error;
use crate::error::Result;
use crate::open_addressing::OpenAddressing;
use crate::probe::ProbeKind;
use crate::probe::ProbeStats;
use crate::store::Store;
use crate::store::check_load_factor;
use crate::tracker::AllocTracker;
use crate::tracker::Untracked;

/// Collision-resolution strategy backing a [`HashMap`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// One flat slot array, linear probing, tombstones on removal.
    #[default]
    OpenAddressing,
    /// An array of bucket heads, each a linked chain of pooled nodes.
    SeparateChaining,
}

impl core::fmt::Display for Strategy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Strategy::OpenAddressing => "open-addressing",
            Strategy::SeparateChaining => "separate-chaining",
        })
    }
}

macro_rules! dispatch {
    ($backend:expr, $table:ident => $body:expr) => {
        match $backend {
            Backend::OpenAddressing($table) => $body,
            Backend::SeparateChaining($table) => $body,
        }
    };
}

enum Backend<A: AllocTracker> {
    OpenAddressing(OpenAddressing<A>),
    SeparateChaining(SeparateChaining<A>),
}

impl<A: AllocTracker> Backend<A> {
    fn try_new(
        strategy: Strategy,
        capacity: usize,
        max_load_factor: Option<f64>,
        tracker: A,
    ) -> Result<Self> {
        Ok(match strategy {
            Strategy::OpenAddressing => Backend::OpenAddressing(OpenAddressing::try_new(
                capacity,
                max_load_factor.unwrap_or(crate::open_addressing::DEFAULT_MAX_LOAD_FACTOR),
                tracker,
            )?),
            Strategy::SeparateChaining => Backend::SeparateChaining(SeparateChaining::try_new(
                capacity,
                max_load_factor.unwrap_or(crate::chaining::DEFAULT_MAX_LOAD_FACTOR),
                tracker,
            )?),
        })
    }
}

/// An `i32` to `String` map with a switchable storage strategy.
///
/// The strategy is fixed at construction and can only be changed while the
/// map is empty. Both strategies present the same behavior through this
/// type; they differ in memory layout, growth policy and cost profile.
///
/// # Performance Characteristics
///
/// - **Open addressing**: grows when live entries plus tombstones reach
///   `capacity * 0.7` by default. Per-operation probe counts are recorded.
/// - **Separate chaining**: grows when entries exceed `capacity * 0.75` by
///   default. Nodes come from a chunked pool and are recycled on removal.
///
/// # Examples
///
/// ```rust
/// # use dual_hash::{HashMap, Strategy};
/// let mut map = HashMap::new(Strategy::OpenAddressing, 16);
/// map.insert(1, "one").unwrap();
/// map.insert(2, "two").unwrap();
///
/// assert_eq!(map.search(1), Some("one"));
/// assert!(map.remove(2));
/// assert_eq!(map.len(), 1);
/// ```
pub struct HashMap<A: AllocTracker = Untracked> {
    backend: Backend<A>,
    initial_capacity: usize,
    max_load_factor: Option<f64>,
    tracker: A,
}

impl<A: AllocTracker> Debug for HashMap<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HashMap")
            .field("strategy", &self.strategy())
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl Default for HashMap<Untracked> {
    fn default() -> Self {
        Self::new(Strategy::default(), crate::MIN_CAPACITY)
    }
}

impl HashMap<Untracked> {
    /// Creates an empty map using `strategy`, with room for
    /// `initial_capacity` slots or buckets before the first growth.
    ///
    /// The capacity is rounded up to a power of two, and never below
    /// [`MIN_CAPACITY`](crate::MIN_CAPACITY).
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use dual_hash::{HashMap, Strategy};
    /// let map = HashMap::new(Strategy::SeparateChaining, 100);
    /// assert_eq!(map.capacity(), 128);
    /// assert!(map.is_empty());
    /// ```
    pub fn new(strategy: Strategy, initial_capacity: usize) -> Self {
        Self::with_tracker(strategy, initial_capacity, Untracked)
    }

    /// Starts building a map with non-default settings.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use dual_hash::{HashMap, Strategy};
    /// let map = HashMap::builder()
    ///     .strategy(Strategy::SeparateChaining)
    ///     .initial_capacity(64)
    ///     .max_load_factor(0.5)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(map.max_load_factor(), 0.5);
    /// ```
    pub fn builder() -> HashMapBuilder<Untracked> {
        HashMapBuilder::default()
    }
}

impl<A: AllocTracker> HashMap<A> {
    /// Creates an empty map that reports its allocations to `tracker`.
    pub fn with_tracker(strategy: Strategy, initial_capacity: usize, tracker: A) -> Self {
        let backend = match strategy {
            Strategy::OpenAddressing => Backend::OpenAddressing(
                OpenAddressing::with_capacity_and_tracker(initial_capacity, tracker.clone()),
            ),
            Strategy::SeparateChaining => Backend::SeparateChaining(
                SeparateChaining::with_capacity_and_tracker(initial_capacity, tracker.clone()),
            ),
        };

        Self {
            backend,
            initial_capacity,
            max_load_factor: None,
            tracker,
        }
    }

    /// Returns the active strategy.
    pub fn strategy(&self) -> Strategy {
        match self.backend {
            Backend::OpenAddressing(_) => Strategy::OpenAddressing,
            Backend::SeparateChaining(_) => Strategy::SeparateChaining,
        }
    }

    /// Switches to `strategy`.
    ///
    /// Only an empty map can switch; otherwise [`Error::NotEmpty`] is returned
    /// and the map is left as it was. Switching to the active strategy is a
    /// no-op. The new backend starts at the map's initial capacity and keeps
    /// any load factor set through [`set_max_load_factor`].
    ///
    /// [`set_max_load_factor`]: Self::set_max_load_factor
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use dual_hash::{Error, HashMap, Strategy};
    /// let mut map = HashMap::new(Strategy::OpenAddressing, 16);
    /// map.set_strategy(Strategy::SeparateChaining).unwrap();
    /// assert_eq!(map.strategy(), Strategy::SeparateChaining);
    ///
    /// map.insert(1, "one").unwrap();
    /// assert_eq!(
    ///     map.set_strategy(Strategy::OpenAddressing),
    ///     Err(Error::NotEmpty { len: 1 })
    /// );
    /// assert_eq!(map.search(1), Some("one"));
    /// ```
    pub fn set_strategy(&mut self, strategy: Strategy) -> Result<()> {
        if strategy == self.strategy() {
            return Ok(());
        }
        if !self.is_empty() {
            log::warn!(
                "refusing to switch from {} to {strategy} with {} live entries",
                self.strategy(),
                self.len()
            );
            return Err(Error::NotEmpty { len: self.len() });
        }

        self.backend = Backend::try_new(
            strategy,
            self.initial_capacity,
            self.max_load_factor,
            self.tracker.clone(),
        )?;
        log::debug!("switched hash map strategy to {strategy}");

        Ok(())
    }

    /// Inserts `value` under `key`, returning the value it replaced.
    ///
    /// An existing key is overwritten in place. The only failure is an
    /// allocation failure while growing, in which case nothing is inserted.
    pub fn insert(&mut self, key: i32, value: impl Into<String>) -> Result<Option<String>> {
        dispatch!(&mut self.backend, table => table.insert(key, value.into()))
    }

    /// Returns the value stored under `key`.
    pub fn search(&self, key: i32) -> Option<&str> {
        dispatch!(&self.backend, table => table.search(key))
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: i32) -> bool {
        self.search(key).is_some()
    }

    /// Removes `key`, returning whether it was present.
    pub fn remove(&mut self, key: i32) -> bool {
        dispatch!(&mut self.backend, table => table.remove(key))
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        dispatch!(&self.backend, table => table.len())
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry. Capacity is kept.
    pub fn clear(&mut self) {
        dispatch!(&mut self.backend, table => table.clear());
    }

    /// Slots (open addressing) or buckets (chaining) currently allocated.
    pub fn capacity(&self) -> usize {
        dispatch!(&self.backend, table => table.capacity())
    }

    /// Approximate footprint of the active backend in bytes.
    ///
    /// `capacity * slot size` for open addressing; `capacity * link size +
    /// len * node size` for chaining.
    pub fn memory_usage(&self) -> usize {
        dispatch!(&self.backend, table => table.memory_usage())
    }

    /// The load factor that triggers growth of the active backend.
    pub fn max_load_factor(&self) -> f64 {
        dispatch!(&self.backend, table => table.max_load_factor())
    }

    /// Sets the load factor that triggers growth.
    ///
    /// Must lie strictly between 0 and 1. The setting applies to whichever
    /// strategy is active and carries over a strategy switch.
    pub fn set_max_load_factor(&mut self, max_load_factor: f64) -> Result<()> {
        let max_load_factor = check_load_factor(max_load_factor)?;
        dispatch!(&mut self.backend, table => table.set_max_load_factor(max_load_factor))?;
        self.max_load_factor = Some(max_load_factor);
        log::debug!("max load factor set to {max_load_factor}");
        Ok(())
    }

    /// Probe counters of the open-addressing backend, or `None` while
    /// chaining is active.
    pub fn probe_stats(&self) -> Option<&ProbeStats> {
        match &self.backend {
            Backend::OpenAddressing(table) => Some(table.probe_stats()),
            Backend::SeparateChaining(_) => None,
        }
    }

    /// Zeroes the probe counters.
    pub fn reset_probe_stats(&self) {
        if let Some(stats) = self.probe_stats() {
            stats.reset();
        }
    }

    fn avg_probes(&self, kind: ProbeKind) -> f64 {
        self.probe_stats().map_or(0.0, |stats| stats.average(kind))
    }

    /// Mean slots visited per insert since the last reset.
    pub fn avg_insert_probes(&self) -> f64 {
        self.avg_probes(ProbeKind::Insert)
    }

    /// Mean slots visited per search since the last reset.
    pub fn avg_search_probes(&self) -> f64 {
        self.avg_probes(ProbeKind::Search)
    }

    /// Mean slots visited per remove since the last reset.
    pub fn avg_remove_probes(&self) -> f64 {
        self.avg_probes(ProbeKind::Remove)
    }

    /// Name reported to benchmark harnesses.
    pub fn type_name(&self) -> &'static str {
        "HashMap"
    }

    /// Expected cost of `insert`.
    pub fn insert_complexity(&self) -> &'static str {
        "O(1) avg"
    }

    /// Expected cost of `search`.
    pub fn search_complexity(&self) -> &'static str {
        "O(1) avg"
    }

    /// Expected cost of `remove`.
    pub fn remove_complexity(&self) -> &'static str {
        "O(1) avg"
    }

    /// Returns detailed utilization statistics for the active backend.
    #[cfg(feature = "stats")]
    pub fn debug_stats(&self) -> crate::store::DebugStats {
        dispatch!(&self.backend, table => table.debug_stats())
    }
}

/// Builds a [`HashMap`] with various configuration knobs.
///
/// Unlike [`HashMap::new`], [`build`](Self::build) validates the load factor
/// and reports allocation failure instead of aborting.
#[derive(Debug, Clone)]
pub struct HashMapBuilder<A> {
    strategy: Strategy,
    initial_capacity: usize,
    max_load_factor: Option<f64>,
    tracker: A,
}

impl Default for HashMapBuilder<Untracked> {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            initial_capacity: crate::MIN_CAPACITY,
            max_load_factor: None,
            tracker: Untracked,
        }
    }
}

impl<A: AllocTracker> HashMapBuilder<A> {
    /// Sets the storage strategy.
    pub fn strategy(self, strategy: Strategy) -> Self {
        Self { strategy, ..self }
    }

    /// Sets the number of slots or buckets allocated up front.
    pub fn initial_capacity(self, initial_capacity: usize) -> Self {
        Self {
            initial_capacity,
            ..self
        }
    }

    /// Sets the load factor that triggers growth.
    pub fn max_load_factor(self, max_load_factor: f64) -> Self {
        Self {
            max_load_factor: Some(max_load_factor),
            ..self
        }
    }

    /// Reports allocations to `tracker`.
    pub fn tracker<B: AllocTracker>(self, tracker: B) -> HashMapBuilder<B> {
        HashMapBuilder {
            strategy: self.strategy,
            initial_capacity: self.initial_capacity,
            max_load_factor: self.max_load_factor,
            tracker,
        }
    }

    /// Builds the map.
    pub fn build(self) -> Result<HashMap<A>> {
        let max_load_factor = self.max_load_factor.map(check_load_factor).transpose()?;
        let backend = Backend::try_new(
            self.strategy,
            self.initial_capacity,
            max_load_factor,
            self.tracker.clone(),
        )?;

        Ok(HashMap {
            backend,
            initial_capacity: self.initial_capacity,
            max_load_factor,
            tracker: self.tracker,
        })
    }
}

//! The contract shared by both storage backends.

use alloc::string::String;

use crate::error::Error;
use crate::error::Result;

/// Operations every backend provides.
///
/// Both [`OpenAddressing`](crate::open_addressing::OpenAddressing) and
/// [`SeparateChaining`](crate::chaining::SeparateChaining) implement this, and
/// must be indistinguishable through it apart from `capacity` and
/// `memory_usage`.
pub trait Store {
    /// Inserts `value` under `key`, returning the value it replaced.
    ///
    /// Fails only if growing the table could not allocate.
    fn insert(&mut self, key: i32, value: String) -> Result<Option<String>>;

    /// Returns the value stored under `key`.
    fn search(&self, key: i32) -> Option<&str>;

    /// Removes `key`, returning whether it was present.
    fn remove(&mut self, key: i32) -> bool;

    /// Number of live entries.
    fn len(&self) -> usize;

    /// Returns `true` if the store holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots or buckets. Always a power of two.
    fn capacity(&self) -> usize;

    /// Removes every entry, keeping the current capacity.
    fn clear(&mut self);

    /// Approximate bytes used by the table's storage.
    fn memory_usage(&self) -> usize;

    /// Changes the load factor that triggers growth. Takes effect on the next
    /// insert.
    fn set_max_load_factor(&mut self, max_load_factor: f64) -> Result<()>;

    /// The load factor that triggers growth.
    fn max_load_factor(&self) -> f64;
}

/// Validates a maximum load factor.
pub(crate) fn check_load_factor(max_load_factor: f64) -> Result<f64> {
    if max_load_factor.is_finite() && max_load_factor > 0.0 && max_load_factor < 1.0 {
        Ok(max_load_factor)
    } else {
        Err(Error::InvalidLoadFactor(max_load_factor))
    }
}

/// Debug statistics for table analysis.
#[cfg(feature = "stats")]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of live entries
    pub populated: usize,
    /// Number of slots (open addressing) or buckets (chaining)
    pub capacity: usize,
    /// Tombstoned slots; always zero for chaining
    pub tombstones: usize,
    /// Slots or buckets holding nothing
    pub empty_buckets: usize,
    /// Longest probe sequence or chain needed to reach a live entry
    pub longest_probe: usize,
    /// Load factor (populated / capacity)
    pub load_factor: f64,
    /// Bytes reserved for slots, buckets and pooled nodes
    pub total_bytes: usize,
    /// Pool slots reserved for chain nodes; always zero for open addressing
    pub pool_slots: usize,
}

#[cfg(feature = "stats")]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.populated,
            self.capacity,
            self.load_factor * 100.0
        );
        println!(
            "Empty: {} buckets, {} tombstones",
            self.empty_buckets, self.tombstones
        );
        println!("Longest probe: {}", self.longest_probe);
        if self.pool_slots > 0 {
            println!("Pool: {} node slots", self.pool_slots);
        }
        println!("Total Allocated: {} bytes", self.total_bytes);
    }
}

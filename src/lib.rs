#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// The strategy-switching map.
///
/// This module provides `HashMap`, which owns exactly one backend and
/// forwards every operation to it.
pub mod hash_map;

pub mod chaining;
pub mod error;
pub mod mix;
pub mod open_addressing;
pub mod pool;
pub mod probe;
pub mod store;
pub mod tracker;

/// Smallest number of slots or buckets a table is created with.
pub const MIN_CAPACITY: usize = 16;

pub use error::Error;
pub use error::Result;
pub use hash_map::HashMap;
pub use hash_map::HashMapBuilder;
pub use hash_map::Strategy;
pub use probe::ProbeKind;
pub use probe::ProbeStats;
#[cfg(feature = "stats")]
pub use store::DebugStats;
pub use store::Store;
pub use tracker::AllocTracker;
pub use tracker::MemoryTracker;
pub use tracker::Untracked;

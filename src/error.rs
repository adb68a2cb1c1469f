//! Error type shared by the map and its backends.

use alloc::collections::TryReserveError;

/// Errors surfaced by [`HashMap`](crate::HashMap) and its backends.
///
/// Looking up or removing a missing key is not an error, and neither is
/// inserting a key that is already present (the value is replaced).
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The system allocator could not provide storage for growth.
    ///
    /// The operation that needed the storage has not been applied; the table
    /// still holds exactly what it held before the call.
    #[error("failed to allocate {bytes} bytes of table storage")]
    AllocationFailed {
        /// Size of the allocation that was refused.
        bytes: usize,
    },

    /// The storage strategy can only be switched while the map is empty.
    #[error("cannot switch strategy on a map holding {len} entries")]
    NotEmpty {
        /// Number of live entries at the time of the call.
        len: usize,
    },

    /// A maximum load factor outside of `(0, 1)`.
    #[error("max load factor must be in (0, 1), got {0}")]
    InvalidLoadFactor(f64),
}

impl Error {
    pub(crate) fn alloc<T>(count: usize) -> impl FnOnce(TryReserveError) -> Self {
        move |_| Error::AllocationFailed {
            bytes: count.saturating_mul(core::mem::size_of::<T>()),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

//! Key mixing shared by both backends.

const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

/// Scrambles a 64-bit key with the SplitMix64 finalizer.
///
/// Keys that differ in a single bit produce uncorrelated outputs, so the low
/// bits are safe to use directly as a bucket index.
///
/// ```rust
/// # use dual_hash::mix::mix;
/// assert_eq!(mix(7), mix(7));
/// assert_ne!(mix(7) & 15, mix(8) & 15);
/// ```
#[inline(always)]
pub const fn mix(key: u64) -> u64 {
    let mut x = key.wrapping_add(GOLDEN_GAMMA);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// Maps `key` onto `0..capacity`.
///
/// `capacity` must be a power of two.
#[inline(always)]
pub(crate) fn bucket_index(key: i32, capacity: usize) -> usize {
    debug_assert!(capacity.is_power_of_two());
    (mix(key as i64 as u64) as usize) & (capacity - 1)
}

/// Rounds a requested capacity up to a power of two, never below
/// [`MIN_CAPACITY`](crate::MIN_CAPACITY).
#[inline]
pub(crate) fn round_capacity(requested: usize) -> usize {
    requested
        .max(crate::MIN_CAPACITY)
        .checked_next_power_of_two()
        .unwrap_or(1 << (usize::BITS - 1))
}

//! Separate chaining over pooled nodes.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::error::Error;
use crate::error::Result;
use crate::mix::bucket_index;
use crate::mix::round_capacity;
use crate::pool::NodeId;
use crate::pool::NodePool;
use crate::store::Store;
use crate::store::check_load_factor;
use crate::tracker::AllocTracker;
use crate::tracker::Untracked;

/// Default maximum ratio of entries to buckets.
pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.75;

struct Node {
    key: i32,
    value: String,
    next: Link,
}

type Link = Option<NodeId>;

const LINK_BYTES: usize = core::mem::size_of::<Link>();
const NODE_BYTES: usize = core::mem::size_of::<Node>();

/// A hash table whose buckets are singly-linked chains of pooled nodes.
///
/// New keys are pushed at the head of their chain. When the entry count
/// exceeds `capacity * max_load_factor` the bucket array doubles and every
/// node is relinked into its new bucket; nodes themselves never move.
///
/// ## Example
///
/// ```rust
/// # use dual_hash::chaining::SeparateChaining;
/// # use dual_hash::Store;
/// let mut table = SeparateChaining::with_capacity(16);
/// table.insert(10, "ten".into()).unwrap();
/// table.insert(10, "TEN".into()).unwrap();
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.search(10), Some("TEN"));
/// ```
pub struct SeparateChaining<A: AllocTracker = Untracked> {
    buckets: Vec<Link>,
    pool: NodePool<Node, A>,
    len: usize,
    max_load_factor: f64,
    tracker: A,
}

impl<A: AllocTracker> Debug for SeparateChaining<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut chains = f.debug_map();
        for (index, head) in self.buckets.iter().enumerate() {
            if head.is_some() {
                chains.entry(&index, &self.chain(*head).map(|n| n.key).collect::<Vec<_>>());
            }
        }
        chains.finish()
    }
}

impl SeparateChaining<Untracked> {
    /// Creates a table with at least `capacity` buckets.
    ///
    /// The capacity is rounded up to a power of two, and never below
    /// [`MIN_CAPACITY`](crate::MIN_CAPACITY).
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_tracker(capacity, Untracked)
    }
}

impl<A: AllocTracker> SeparateChaining<A> {
    /// Creates a table reporting its allocations to `tracker`.
    pub fn with_capacity_and_tracker(capacity: usize, tracker: A) -> Self {
        let capacity = round_capacity(capacity);
        let mut buckets = Vec::with_capacity(capacity);
        buckets.resize(capacity, None);
        Self::from_buckets(buckets, DEFAULT_MAX_LOAD_FACTOR, tracker)
    }

    /// Fallible counterpart of
    /// [`with_capacity_and_tracker`](Self::with_capacity_and_tracker) that
    /// also sets the maximum load factor.
    pub fn try_new(capacity: usize, max_load_factor: f64, tracker: A) -> Result<Self> {
        let max_load_factor = check_load_factor(max_load_factor)?;
        let buckets = allocate_buckets(round_capacity(capacity))?;
        Ok(Self::from_buckets(buckets, max_load_factor, tracker))
    }

    fn from_buckets(buckets: Vec<Link>, max_load_factor: f64, tracker: A) -> Self {
        tracker.record_allocation(buckets.len() * LINK_BYTES);
        Self {
            buckets,
            pool: NodePool::new(tracker.clone()),
            len: 0,
            max_load_factor,
            tracker,
        }
    }

    /// Number of node slots reserved by the pool, live or free.
    pub fn pooled_slots(&self) -> usize {
        self.pool.slot_capacity()
    }

    fn chain(&self, head: Link) -> impl Iterator<Item = &Node> + '_ {
        let mut cursor = head;
        core::iter::from_fn(move || {
            let node = self.pool.get(cursor?);
            cursor = node.next;
            Some(node)
        })
    }

    fn find(&self, key: i32) -> Option<&Node> {
        let head = self.buckets[bucket_index(key, self.buckets.len())];
        self.chain(head).find(|node| node.key == key)
    }

    #[inline]
    fn needs_rehash(&self) -> bool {
        self.len as f64 > self.buckets.len() as f64 * self.max_load_factor
    }

    #[cold]
    fn rehash(&mut self) -> Result<()> {
        let old_capacity = self.buckets.len();
        let new_capacity = old_capacity
            .checked_mul(2)
            .ok_or(Error::AllocationFailed { bytes: usize::MAX })?;
        let new_buckets = allocate_buckets(new_capacity)?;
        self.tracker.record_allocation(new_capacity * LINK_BYTES);

        let old_buckets = core::mem::replace(&mut self.buckets, new_buckets);
        for head in old_buckets {
            let mut cursor = head;
            while let Some(id) = cursor {
                let node = self.pool.get_mut(id);
                cursor = node.next;
                let index = bucket_index(node.key, new_capacity);
                node.next = self.buckets[index];
                self.buckets[index] = Some(id);
            }
        }
        self.tracker.record_deallocation(old_capacity * LINK_BYTES);

        log::debug!(
            "chaining table rehashed {old_capacity} -> {new_capacity} buckets ({} live)",
            self.len
        );

        Ok(())
    }

    /// Returns detailed utilization statistics for debugging.
    #[cfg(feature = "stats")]
    pub fn debug_stats(&self) -> crate::store::DebugStats {
        let mut empty_buckets = 0;
        let mut longest_probe = 0;
        for head in &self.buckets {
            match self.chain(*head).count() {
                0 => empty_buckets += 1,
                length => longest_probe = longest_probe.max(length),
            }
        }

        crate::store::DebugStats {
            populated: self.len,
            capacity: self.capacity(),
            tombstones: 0,
            empty_buckets,
            longest_probe,
            load_factor: self.len as f64 / self.capacity() as f64,
            total_bytes: self.buckets.len() * LINK_BYTES + self.pool.reserved_bytes(),
            pool_slots: self.pool.slot_capacity(),
        }
    }
}

impl<A: AllocTracker> Store for SeparateChaining<A> {
    fn insert(&mut self, key: i32, value: String) -> Result<Option<String>> {
        if self.needs_rehash() {
            self.rehash()?;
        }

        let index = bucket_index(key, self.buckets.len());
        let mut cursor = self.buckets[index];
        while let Some(id) = cursor {
            let node = self.pool.get_mut(id);
            if node.key == key {
                return Ok(Some(core::mem::replace(&mut node.value, value)));
            }
            cursor = node.next;
        }

        let id = self.pool.allocate(Node {
            key,
            value,
            next: self.buckets[index],
        })?;
        self.buckets[index] = Some(id);
        self.len += 1;

        Ok(None)
    }

    fn search(&self, key: i32) -> Option<&str> {
        self.find(key).map(|node| node.value.as_str())
    }

    fn remove(&mut self, key: i32) -> bool {
        let index = bucket_index(key, self.buckets.len());
        let mut previous: Link = None;
        let mut cursor = self.buckets[index];
        while let Some(id) = cursor {
            let node = self.pool.get(id);
            if node.key == key {
                let next = node.next;
                match previous {
                    Some(previous) => self.pool.get_mut(previous).next = next,
                    None => self.buckets[index] = next,
                }
                self.pool.deallocate(id);
                self.len -= 1;
                return true;
            }
            previous = cursor;
            cursor = node.next;
        }

        false
    }

    fn len(&self) -> usize {
        self.len
    }

    fn capacity(&self) -> usize {
        self.buckets.len()
    }

    fn clear(&mut self) {
        self.pool.clear();
        self.buckets.fill(None);
        self.len = 0;
    }

    fn memory_usage(&self) -> usize {
        self.buckets.len() * LINK_BYTES + self.len * NODE_BYTES
    }

    fn set_max_load_factor(&mut self, max_load_factor: f64) -> Result<()> {
        self.max_load_factor = check_load_factor(max_load_factor)?;
        Ok(())
    }

    fn max_load_factor(&self) -> f64 {
        self.max_load_factor
    }
}

impl<A: AllocTracker> Drop for SeparateChaining<A> {
    fn drop(&mut self) {
        self.tracker.record_deallocation(self.buckets.len() * LINK_BYTES);
    }
}

fn allocate_buckets(capacity: usize) -> Result<Vec<Link>> {
    let mut buckets = Vec::new();
    buckets
        .try_reserve_exact(capacity)
        .map_err(Error::alloc::<Link>(capacity))?;
    buckets.resize(capacity, None);
    Ok(buckets)
}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeMap;
    use alloc::string::ToString;
    use alloc::vec;

    use rand::Rng;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::tracker::MemoryTracker;

    fn chain_keys<A: AllocTracker>(table: &SeparateChaining<A>, index: usize) -> Vec<i32> {
        table.chain(table.buckets[index]).map(|n| n.key).collect()
    }

    #[test]
    fn insert_search_remove() {
        let mut table = SeparateChaining::with_capacity(8);
        assert_eq!(table.capacity(), 16);

        table.insert(10, "ten".to_string()).unwrap();
        table.insert(20, "twenty".to_string()).unwrap();
        table.insert(30, "thirty".to_string()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.search(20), Some("twenty"));
        assert_eq!(table.search(40), None);

        assert_eq!(
            table.insert(20, "twenty2".to_string()).unwrap(),
            Some("twenty".to_string())
        );
        assert_eq!(table.len(), 3);

        assert!(table.remove(20));
        assert_eq!(table.search(20), None);
        assert_eq!(table.len(), 2);
        assert!(!table.remove(42));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn new_keys_are_pushed_at_chain_head() {
        let mut table = SeparateChaining::with_capacity(16);
        let keys: Vec<i32> = (0..)
            .filter(|&k| bucket_index(k, 16) == 4)
            .take(3)
            .collect();
        for &k in &keys {
            table.insert(k, k.to_string()).unwrap();
        }
        assert_eq!(chain_keys(&table, 4), vec![keys[2], keys[1], keys[0]]);

        // Unlinking from the middle and from the head.
        assert!(table.remove(keys[1]));
        assert_eq!(chain_keys(&table, 4), vec![keys[2], keys[0]]);
        assert!(table.remove(keys[2]));
        assert_eq!(chain_keys(&table, 4), vec![keys[0]]);
        assert_eq!(table.search(keys[0]), Some(keys[0].to_string().as_str()));
    }

    #[test]
    fn rehash_triggers_past_three_quarters() {
        let mut table = SeparateChaining::with_capacity(16);
        // 13 entries is the first count above 16 * 0.75.
        for k in 0..13 {
            table.insert(k, k.to_string()).unwrap();
        }
        assert_eq!(table.capacity(), 16);

        table.insert(13, "13".to_string()).unwrap();
        assert_eq!(table.capacity(), 32);
        for k in 0..14 {
            assert_eq!(table.search(k), Some(k.to_string().as_str()));
        }
    }

    #[test]
    fn rehash_moves_links_not_nodes() {
        let mut table = SeparateChaining::with_capacity(16);
        for k in 0..500 {
            table.insert(k, k.to_string()).unwrap();
        }
        // 500 nodes fit in the first pool chunk; rehashing never copied them.
        assert_eq!(table.pooled_slots(), crate::pool::DEFAULT_CHUNK);
        assert_eq!(table.capacity(), 1024);
        for k in 0..500 {
            assert_eq!(table.search(k), Some(k.to_string().as_str()));
        }
    }

    #[test]
    fn grow_then_remove_half() {
        let mut table = SeparateChaining::with_capacity(8);
        for k in 0..100 {
            table.insert(k, k.to_string()).unwrap();
        }
        for k in 0..50 {
            assert!(table.remove(k));
        }
        for k in 0..50 {
            assert_eq!(table.search(k), None);
        }
        for k in 50..100 {
            assert_eq!(table.search(k), Some(k.to_string().as_str()));
        }
        assert_eq!(table.len(), 50);
    }

    #[test]
    fn removed_nodes_are_recycled() {
        let mut table = SeparateChaining::with_capacity(16);
        for round in 0..10 {
            for k in 0..1000 {
                table.insert(k, round.to_string()).unwrap();
            }
            for k in 0..1000 {
                assert!(table.remove(k));
            }
        }
        assert!(table.is_empty());
        assert_eq!(table.pooled_slots(), crate::pool::DEFAULT_CHUNK);
    }

    #[test]
    fn clear_keeps_buckets() {
        let mut table = SeparateChaining::with_capacity(16);
        for k in 0..40 {
            table.insert(k, k.to_string()).unwrap();
        }
        let capacity = table.capacity();
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.capacity(), capacity);
        assert_eq!(table.search(1), None);
        assert_eq!(table.memory_usage(), capacity * LINK_BYTES);

        table.insert(1, "one".to_string()).unwrap();
        assert_eq!(table.search(1), Some("one"));
    }

    #[test]
    fn memory_usage_counts_live_nodes() {
        let mut table = SeparateChaining::with_capacity(16);
        table.insert(1, "a".to_string()).unwrap();
        table.insert(2, "b".to_string()).unwrap();
        assert_eq!(table.memory_usage(), 16 * LINK_BYTES + 2 * NODE_BYTES);
        table.remove(1);
        assert_eq!(table.memory_usage(), 16 * LINK_BYTES + NODE_BYTES);
    }

    #[test]
    fn load_factor_controls_rehash() {
        let mut table = SeparateChaining::with_capacity(16);
        table.set_max_load_factor(0.25).unwrap();
        for k in 0..5 {
            table.insert(k, k.to_string()).unwrap();
        }
        assert_eq!(table.capacity(), 16);
        table.insert(5, "5".to_string()).unwrap();
        assert_eq!(table.capacity(), 32);
        assert!(table.set_max_load_factor(0.0).is_err());
    }

    #[test]
    fn tracker_balances_after_drop() {
        let tracker = MemoryTracker::new();
        {
            let mut table = SeparateChaining::with_capacity_and_tracker(16, tracker.clone());
            for k in 0..2000 {
                table.insert(k, k.to_string()).unwrap();
            }
            let stats = tracker.stats();
            assert_eq!(
                stats.current_usage,
                table.capacity() * LINK_BYTES + table.pool.reserved_bytes()
            );
        }
        assert_eq!(tracker.stats().leaked(), 0);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn random_operations_match_model() {
        let mut rng = SmallRng::seed_from_u64(0xc4a1);
        let mut table = SeparateChaining::with_capacity(16);
        let mut model = BTreeMap::new();

        for step in 0..20_000 {
            let key = rng.random_range(-500..500);
            if rng.random_bool(0.6) {
                let value = step.to_string();
                assert_eq!(
                    table.insert(key, value.clone()).unwrap(),
                    model.insert(key, value)
                );
            } else {
                assert_eq!(table.remove(key), model.remove(&key).is_some());
            }
            assert_eq!(table.len(), model.len());
        }

        for key in -500..500 {
            assert_eq!(table.search(key), model.get(&key).map(String::as_str));
        }
    }

    #[cfg(feature = "stats")]
    #[test]
    fn debug_stats_reports_chains() {
        let mut table = SeparateChaining::with_capacity(16);
        let keys: Vec<i32> = (0..)
            .filter(|&k| bucket_index(k, 16) == 0)
            .take(3)
            .collect();
        for &k in &keys {
            table.insert(k, k.to_string()).unwrap();
        }

        let stats = table.debug_stats();
        assert_eq!(stats.populated, 3);
        assert_eq!(stats.longest_probe, 3);
        assert_eq!(stats.empty_buckets, 15);
        assert_eq!(stats.pool_slots, crate::pool::DEFAULT_CHUNK);
    }
}

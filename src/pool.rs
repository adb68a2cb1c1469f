//! A chunked node pool with an index-threaded free list.
//!
//! Nodes are addressed by [`NodeId`] instead of pointers. Storage is acquired
//! one chunk at a time and is only returned to the system allocator when the
//! pool itself is dropped; released slots are recycled through the free list.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::error::Error;
use crate::error::Result;
use crate::tracker::AllocTracker;

/// Number of slots per chunk unless specified otherwise.
pub const DEFAULT_CHUNK: usize = 1024;

/// Handle to a live node inside a [`NodePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[inline(always)]
    fn index(self) -> usize {
        self.0 as usize
    }
}

enum PoolSlot<T> {
    Vacant { next_free: Option<NodeId> },
    Occupied(T),
}

/// Fixed-size slot allocator for chain nodes.
///
/// `allocate` and `deallocate` are O(1) and never touch the system allocator
/// except when the free list is exhausted, in which case exactly one new
/// chunk of `CHUNK` slots is added.
pub struct NodePool<T, A: AllocTracker, const CHUNK: usize = DEFAULT_CHUNK> {
    chunks: Vec<Box<[PoolSlot<T>]>>,
    free_head: Option<NodeId>,
    live: usize,
    tracker: A,
}

impl<T, A: AllocTracker, const CHUNK: usize> Debug for NodePool<T, A, CHUNK> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NodePool")
            .field("chunks", &self.chunks.len())
            .field("chunk_size", &CHUNK)
            .field("live", &self.live)
            .finish()
    }
}

impl<T, A: AllocTracker, const CHUNK: usize> NodePool<T, A, CHUNK> {
    const CHUNK_BYTES: usize = CHUNK * core::mem::size_of::<PoolSlot<T>>();

    /// Creates an empty pool. No chunk is allocated until the first
    /// [`allocate`](Self::allocate).
    pub fn new(tracker: A) -> Self {
        const { assert!(CHUNK > 0, "chunk size must be non-zero") };
        Self {
            chunks: Vec::new(),
            free_head: None,
            live: 0,
            tracker,
        }
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if no node is live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of chunks acquired so far.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Total slots across all chunks, live or free.
    pub fn slot_capacity(&self) -> usize {
        self.chunks.len() * CHUNK
    }

    /// Number of slots available without acquiring another chunk.
    pub fn free_count(&self) -> usize {
        self.slot_capacity() - self.live
    }

    /// Bytes held by the pool's chunks.
    pub fn reserved_bytes(&self) -> usize {
        self.chunks.len() * Self::CHUNK_BYTES
    }

    /// Moves `value` into a free slot and returns its handle.
    pub fn allocate(&mut self, value: T) -> Result<NodeId> {
        if self.free_head.is_none() {
            self.add_chunk()?;
        }

        let Some(id) = self.free_head else {
            unreachable!("add_chunk always threads new slots onto the free list");
        };
        let slot = self.slot_mut(id);
        let PoolSlot::Vacant { next_free } = *slot else {
            unreachable!("free list points at an occupied slot");
        };
        *slot = PoolSlot::Occupied(value);
        self.free_head = next_free;
        self.live += 1;

        Ok(id)
    }

    /// Returns the slot behind `id` to the free list and hands back its value.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not live.
    pub fn deallocate(&mut self, id: NodeId) -> T {
        let next_free = self.free_head;
        let slot = self.slot_mut(id);
        if let PoolSlot::Vacant { .. } = slot {
            panic!("double free of pool slot {}", id.0);
        }
        let PoolSlot::Occupied(value) = core::mem::replace(slot, PoolSlot::Vacant { next_free })
        else {
            unreachable!("slot checked occupied above");
        };
        self.free_head = Some(id);
        self.live -= 1;
        value
    }

    /// Returns a reference to the live node behind `id`.
    #[inline]
    pub fn get(&self, id: NodeId) -> &T {
        match &self.chunks[id.index() / CHUNK][id.index() % CHUNK] {
            PoolSlot::Occupied(value) => value,
            PoolSlot::Vacant { .. } => panic!("access to free pool slot {}", id.0),
        }
    }

    /// Returns a mutable reference to the live node behind `id`.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut T {
        match self.slot_mut(id) {
            PoolSlot::Occupied(value) => value,
            PoolSlot::Vacant { .. } => panic!("access to free pool slot {}", id.0),
        }
    }

    /// Drops every live node and threads all slots back onto the free list.
    /// Chunks are retained.
    pub fn clear(&mut self) {
        self.free_head = None;
        for (chunk_index, chunk) in self.chunks.iter_mut().enumerate().rev() {
            for (offset, slot) in chunk.iter_mut().enumerate().rev() {
                *slot = PoolSlot::Vacant {
                    next_free: self.free_head,
                };
                self.free_head = Some(NodeId((chunk_index * CHUNK + offset) as u32));
            }
        }
        self.live = 0;
    }

    #[inline]
    fn slot_mut(&mut self, id: NodeId) -> &mut PoolSlot<T> {
        &mut self.chunks[id.index() / CHUNK][id.index() % CHUNK]
    }

    #[cold]
    fn add_chunk(&mut self) -> Result<()> {
        let base = self.slot_capacity();
        if base.saturating_add(CHUNK) > u32::MAX as usize {
            return Err(Error::AllocationFailed {
                bytes: Self::CHUNK_BYTES,
            });
        }

        self.chunks
            .try_reserve(1)
            .map_err(Error::alloc::<Box<[PoolSlot<T>]>>(1))?;
        let mut chunk = Vec::new();
        chunk
            .try_reserve_exact(CHUNK)
            .map_err(Error::alloc::<PoolSlot<T>>(CHUNK))?;

        // Thread in reverse so the lowest index is handed out first.
        let mut next_free = self.free_head;
        for offset in (0..CHUNK).rev() {
            chunk.push(PoolSlot::Vacant { next_free });
            next_free = Some(NodeId((base + offset) as u32));
        }
        chunk.reverse();

        self.chunks.push(chunk.into_boxed_slice());
        self.free_head = next_free;
        self.tracker.record_allocation(Self::CHUNK_BYTES);
        log::trace!(
            "node pool grew to {} chunks ({} slots)",
            self.chunks.len(),
            self.slot_capacity()
        );

        Ok(())
    }
}

impl<T, A: AllocTracker, const CHUNK: usize> Drop for NodePool<T, A, CHUNK> {
    fn drop(&mut self) {
        for _ in &self.chunks {
            self.tracker.record_deallocation(Self::CHUNK_BYTES);
        }
    }
}

//! Fixed-node pool allocator

use crate::{read_link, write_link, AllocId, RawAlloc, MAX_ARENA, OFFSET_NIL};
use core::cell::RefCell;
use core::marker::PhantomData;
use core::ptr::NonNull;
use critical_section::Mutex;

/// Smallest usable node size: one 16-bit free-list link
pub const MIN_NODE_SIZE: usize = 2;

/// O(1) allocator handing out equally sized nodes from a byte arena
///
/// Construction partitions the arena into as many nodes as fit and
/// threads them onto an internal free list in arena order. `allocate`
/// detaches the head node, `deallocate` pushes one back; both are
/// constant time and safe to call with interrupts enabled because the
/// free-list head lives behind a critical section.
pub struct PoolAllocator<'a> {
    base: NonNull<u8>,
    stride: usize,
    count: usize,
    state: Mutex<RefCell<PoolState>>,
    _arena: PhantomData<&'a mut [u8]>,
}

struct PoolState {
    head: u16,
    stats: PoolStats,
}

// State is only reached under a critical section; the base pointer is
// exclusively owned for the arena's borrowed lifetime.
unsafe impl Send for PoolAllocator<'_> {}
unsafe impl Sync for PoolAllocator<'_> {}

impl<'a> PoolAllocator<'a> {
    /// Partition `arena` into nodes of `node_size` bytes
    ///
    /// `node_size` is rounded up to at least [`MIN_NODE_SIZE`]; bytes
    /// that do not fill a whole node are unused.
    ///
    /// # Panics
    ///
    /// Panics if the arena is longer than [`MAX_ARENA`].
    pub fn new(arena: &'a mut [u8], node_size: usize) -> Self {
        assert!(arena.len() <= MAX_ARENA, "arena exceeds offset range");
        let stride = node_size.max(MIN_NODE_SIZE);
        let count = arena.len() / stride;

        // SAFETY: slice pointers are never null.
        let base = unsafe { NonNull::new_unchecked(arena.as_mut_ptr()) };

        // Thread every node onto the free list, first node first.
        let mut head = OFFSET_NIL;
        let mut i = count;
        while i > 0 {
            i -= 1;
            let offset = i * stride;
            // SAFETY: offset + 2 <= count * stride <= arena.len().
            unsafe { write_link(base, offset, head) };
            head = offset as u16;
        }

        Self {
            base,
            stride,
            count,
            state: Mutex::new(RefCell::new(PoolState {
                head,
                stats: PoolStats::new(count),
            })),
            _arena: PhantomData,
        }
    }

    /// Node size actually used, after rounding
    pub const fn node_size(&self) -> usize {
        self.stride
    }

    /// Total number of nodes in the pool
    pub const fn capacity(&self) -> usize {
        self.count
    }

    /// Snapshot of the pool occupancy counters
    pub fn stats(&self) -> PoolStats {
        critical_section::with(|cs| self.state.borrow_ref(cs).stats)
    }
}

impl RawAlloc for PoolAllocator<'_> {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        if size > self.stride {
            return None;
        }
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.head == OFFSET_NIL {
                return None;
            }
            let offset = state.head as usize;
            // SAFETY: offset came off the free list, so it is a node
            // boundary inside the arena.
            state.head = unsafe { read_link(self.base, offset) };
            state.stats.on_alloc();
            // SAFETY: base + offset stays inside the arena.
            Some(unsafe { NonNull::new_unchecked(self.base.as_ptr().add(offset)) })
        })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        let offset = ptr.as_ptr() as usize - self.base.as_ptr() as usize;
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            // SAFETY: per the trait contract ptr is a node of this pool.
            unsafe { write_link(self.base, offset, state.head) };
            state.head = offset as u16;
            state.stats.on_dealloc();
        });
    }

    fn id(&self) -> AllocId {
        AllocId(self as *const Self as usize)
    }
}

impl PartialEq for PoolAllocator<'_> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self, other)
    }
}

/// Pool occupancy counters for debugging and monitoring
#[derive(Debug, Clone, Copy)]
pub struct PoolStats {
    /// Total number of nodes in the pool
    pub total_nodes: usize,
    /// Number of free nodes currently available
    pub free_nodes: usize,
    /// Number of nodes currently handed out
    pub used_nodes: usize,
    /// Minimum number of free nodes ever reached
    pub min_free_nodes: usize,
}

impl PoolStats {
    /// Create counters for a pool of `total_nodes` nodes
    pub const fn new(total_nodes: usize) -> Self {
        Self {
            total_nodes,
            free_nodes: total_nodes,
            used_nodes: 0,
            min_free_nodes: total_nodes,
        }
    }

    /// Record an allocation
    pub fn on_alloc(&mut self) {
        self.used_nodes += 1;
        self.free_nodes -= 1;
        if self.free_nodes < self.min_free_nodes {
            self.min_free_nodes = self.free_nodes;
        }
    }

    /// Record a deallocation
    pub fn on_dealloc(&mut self) {
        if self.used_nodes > 0 {
            self.used_nodes -= 1;
            self.free_nodes += 1;
        }
    }

    /// Check if every node is handed out
    pub const fn is_full(&self) -> bool {
        self.free_nodes == 0
    }

    /// Check if every node is free
    pub const fn is_empty(&self) -> bool {
        self.used_nodes == 0
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PoolStats {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "PoolStats{{ total: {}, free: {}, used: {}, min_free: {} }}",
            self.total_nodes,
            self.free_nodes,
            self.used_nodes,
            self.min_free_nodes
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_size_is_rounded_up_to_link_size() {
        let mut arena = [0u8; 10];
        let pool = PoolAllocator::new(&mut arena, 1);
        assert_eq!(pool.node_size(), MIN_NODE_SIZE);
        assert_eq!(pool.capacity(), 5);
    }

    #[test]
    fn capacity_is_arena_over_stride() {
        let mut arena = [0u8; 10];
        let pool = PoolAllocator::new(&mut arena, 3);
        assert_eq!(pool.capacity(), 3);
    }

    #[test]
    fn exhaustion_then_reuse() {
        let mut arena = [0u8; 16];
        let pool = PoolAllocator::new(&mut arena, 4);

        let a = pool.allocate(4).unwrap();
        let b = pool.allocate(4).unwrap();
        let c = pool.allocate(4).unwrap();
        let d = pool.allocate(4).unwrap();
        let ptrs = [a, b, c, d];
        for (i, p) in ptrs.iter().enumerate() {
            for q in &ptrs[i + 1..] {
                assert_ne!(p, q);
            }
        }

        assert!(pool.allocate(4).is_none());
        assert!(pool.stats().is_full());

        unsafe { pool.deallocate(b) };
        assert_eq!(pool.allocate(4), Some(b));
    }

    #[test]
    fn oversized_request_is_refused() {
        let mut arena = [0u8; 16];
        let pool = PoolAllocator::new(&mut arena, 4);
        assert!(pool.allocate(5).is_none());
        assert!(pool.allocate(4).is_some());
    }

    #[test]
    fn nodes_are_handed_out_in_arena_order() {
        let mut arena = [0u8; 8];
        let pool = PoolAllocator::new(&mut arena, 2);
        let first = pool.allocate(2).unwrap();
        let second = pool.allocate(2).unwrap();
        assert_eq!(
            second.as_ptr() as usize - first.as_ptr() as usize,
            pool.node_size()
        );
    }

    #[test]
    fn min_free_watermark_persists() {
        let mut arena = [0u8; 8];
        let pool = PoolAllocator::new(&mut arena, 2);
        let a = pool.allocate(2).unwrap();
        let b = pool.allocate(2).unwrap();
        unsafe {
            pool.deallocate(a);
            pool.deallocate(b);
        }
        let stats = pool.stats();
        assert_eq!(stats.free_nodes, 4);
        assert_eq!(stats.min_free_nodes, 2);
    }
}

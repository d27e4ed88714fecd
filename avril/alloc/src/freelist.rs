//! First-fit coalescing free-list allocator

use crate::{read_link, write_link, AllocId, RawAlloc, MAX_ARENA, OFFSET_NIL};
use core::cell::RefCell;
use core::marker::PhantomData;
use core::ptr::NonNull;
use critical_section::Mutex;

/// Bytes of bookkeeping preceding every block: `{size: u16, next: u16}`
pub const HEADER_SIZE: usize = 4;

/// Upper bound on the blocks reported by a free-list snapshot
pub const SNAPSHOT_BLOCKS: usize = 32;

/// One entry of a free-list snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBlock {
    /// Offset of the block header from the arena start
    pub offset: u16,
    /// Usable bytes behind the header
    pub size: u16,
}

#[cfg(feature = "defmt")]
impl defmt::Format for FreeBlock {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "FreeBlock{{ offset: {}, size: {} }}", self.offset, self.size);
    }
}

/// Variable-size allocator over a caller-supplied byte arena
///
/// The arena is organised as a singly-linked list of free blocks
/// sorted by ascending address, each prefixed by a four-byte
/// `{size, next}` header. Allocation walks the list first-fit; freeing
/// re-inserts by address and merges with physically adjacent free
/// neighbours, so all coalescing happens eagerly.
pub struct FreeListAllocator<'a> {
    base: NonNull<u8>,
    len: usize,
    state: Mutex<RefCell<u16>>,
    _arena: PhantomData<&'a mut [u8]>,
}

// The free-list head is only reached under a critical section; the
// base pointer is exclusively owned for the arena's borrowed lifetime.
unsafe impl Send for FreeListAllocator<'_> {}
unsafe impl Sync for FreeListAllocator<'_> {}

impl<'a> FreeListAllocator<'a> {
    /// Build an allocator owning `arena`, initially one whole block
    ///
    /// # Panics
    ///
    /// Panics if the arena is longer than [`MAX_ARENA`].
    pub fn new(arena: &'a mut [u8]) -> Self {
        assert!(arena.len() <= MAX_ARENA, "arena exceeds offset range");
        let len = arena.len();
        // SAFETY: slice pointers are never null.
        let base = unsafe { NonNull::new_unchecked(arena.as_mut_ptr()) };
        // SAFETY: base/len describe exclusively borrowed memory.
        let head = unsafe { init(base, len) };
        Self {
            base,
            len,
            state: Mutex::new(RefCell::new(head)),
            _arena: PhantomData,
        }
    }

    /// Arena length in bytes
    pub const fn arena_len(&self) -> usize {
        self.len
    }

    /// Snapshot of the free blocks, in address order
    ///
    /// Truncated at [`SNAPSHOT_BLOCKS`] entries; intended for tests
    /// and diagnostics, not for steering allocation.
    pub fn free_blocks(&self) -> heapless::Vec<FreeBlock, SNAPSHOT_BLOCKS> {
        critical_section::with(|cs| {
            let head = *self.state.borrow_ref(cs);
            let mut out = heapless::Vec::new();
            let mut cur = head;
            while cur != OFFSET_NIL {
                // SAFETY: cur is a linked header inside the arena.
                let (size, next) = unsafe { read_header(self.base, cur as usize) };
                if out.push(FreeBlock { offset: cur, size }).is_err() {
                    break;
                }
                cur = next;
            }
            out
        })
    }

    /// Total free bytes (headers excluded)
    pub fn free_bytes(&self) -> usize {
        self.free_blocks().iter().map(|b| b.size as usize).sum()
    }

    /// Largest single allocatable request
    pub fn largest_free(&self) -> usize {
        self.free_blocks()
            .iter()
            .map(|b| b.size as usize)
            .max()
            .unwrap_or(0)
    }
}

impl RawAlloc for FreeListAllocator<'_> {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        critical_section::with(|cs| {
            let mut head = self.state.borrow_ref_mut(cs);
            // SAFETY: head threads through the exclusively owned arena.
            unsafe { allocate(self.base, &mut head, size) }
        })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        critical_section::with(|cs| {
            let mut head = self.state.borrow_ref_mut(cs);
            // SAFETY: per the trait contract ptr came from this arena.
            unsafe { deallocate(self.base, &mut head, ptr) };
        });
    }

    fn id(&self) -> AllocId {
        AllocId(self as *const Self as usize)
    }
}

impl PartialEq for FreeListAllocator<'_> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self, other)
    }
}

/// Read a `{size, next}` header at `offset`
///
/// # Safety
///
/// `offset + HEADER_SIZE` must be within the arena.
pub(crate) unsafe fn read_header(base: NonNull<u8>, offset: usize) -> (u16, u16) {
    (read_link(base, offset), read_link(base, offset + 2))
}

/// Write a `{size, next}` header at `offset`
///
/// # Safety
///
/// `offset + HEADER_SIZE` must be within the arena.
pub(crate) unsafe fn write_header(base: NonNull<u8>, offset: usize, size: u16, next: u16) {
    write_link(base, offset, size);
    write_link(base, offset + 2, next);
}

/// Lay down the initial whole-arena block, returning the list head
///
/// # Safety
///
/// `base`/`len` must describe exclusively owned memory.
pub(crate) unsafe fn init(base: NonNull<u8>, len: usize) -> u16 {
    if len <= HEADER_SIZE {
        return OFFSET_NIL;
    }
    write_header(base, 0, (len - HEADER_SIZE) as u16, OFFSET_NIL);
    0
}

/// First-fit allocation out of the list rooted at `head`
///
/// A block larger than the request plus one header is split and the
/// trailing portion handed out; anything down to an exact fit is
/// unlinked whole.
///
/// # Safety
///
/// `head` must root a well-formed free list inside the arena at `base`.
pub(crate) unsafe fn allocate(base: NonNull<u8>, head: &mut u16, size: usize) -> Option<NonNull<u8>> {
    let want = size.max(1);
    if want > u16::MAX as usize {
        return None;
    }

    let mut prev = OFFSET_NIL;
    let mut cur = *head;
    while cur != OFFSET_NIL {
        let (block_size, next) = read_header(base, cur as usize);
        let block_size = block_size as usize;

        if block_size > want + HEADER_SIZE {
            // Split: the head portion stays listed, the tail is handed out.
            let kept = (block_size - want - HEADER_SIZE) as u16;
            write_link(base, cur as usize, kept);
            let out = cur as usize + HEADER_SIZE + kept as usize;
            write_header(base, out, want as u16, OFFSET_NIL);
            return Some(NonNull::new_unchecked(base.as_ptr().add(out + HEADER_SIZE)));
        }

        if block_size >= want {
            // Exact-ish fit: unlink the whole block.
            if prev == OFFSET_NIL {
                *head = next;
            } else {
                write_link(base, prev as usize + 2, next);
            }
            return Some(NonNull::new_unchecked(
                base.as_ptr().add(cur as usize + HEADER_SIZE),
            ));
        }

        prev = cur;
        cur = next;
    }
    None
}

/// Return a block, inserting address-sorted and merging neighbours
///
/// # Safety
///
/// `ptr` must be a live block previously handed out from this arena.
pub(crate) unsafe fn deallocate(base: NonNull<u8>, head: &mut u16, ptr: NonNull<u8>) {
    let data = ptr.as_ptr() as usize - base.as_ptr() as usize;
    let block = (data - HEADER_SIZE) as u16;
    let mut size = read_link(base, block as usize);

    // Locate the address-sorted position: prev < block < next.
    let mut prev = OFFSET_NIL;
    let mut next = *head;
    while next != OFFSET_NIL && next < block {
        prev = next;
        next = read_link(base, next as usize + 2);
    }

    // Merge with the following block when the end of this one meets
    // its header.
    if next != OFFSET_NIL && block as usize + HEADER_SIZE + size as usize == next as usize {
        let (next_size, next_next) = read_header(base, next as usize);
        size += HEADER_SIZE as u16 + next_size;
        next = next_next;
    }
    write_header(base, block as usize, size, next);

    if prev == OFFSET_NIL {
        *head = block;
        return;
    }

    // Merge with the preceding block when its end meets this header.
    let prev_size = read_link(base, prev as usize);
    if prev as usize + HEADER_SIZE + prev_size as usize == block as usize {
        write_header(
            base,
            prev as usize,
            prev_size + HEADER_SIZE as u16 + size,
            next,
        );
    } else {
        write_link(base, prev as usize + 2, block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_arena_minus_header_is_allocatable() {
        let mut arena = [0u8; 24];
        let fl = FreeListAllocator::new(&mut arena);
        assert_eq!(fl.largest_free(), 20);

        let p = fl.allocate(20).unwrap();
        assert_eq!(fl.largest_free(), 0);
        unsafe { fl.deallocate(p) };
        assert!(fl.allocate(21).is_none());
    }

    #[test]
    fn fragmentation_then_coalesce() {
        let mut arena = [0u8; 24];
        let fl = FreeListAllocator::new(&mut arena);

        let a = fl.allocate(2).unwrap();
        let b = fl.allocate(2).unwrap();
        let c = fl.allocate(2).unwrap();
        let d = fl.allocate(2).unwrap();
        assert!(fl.allocate(1).is_none());

        unsafe {
            fl.deallocate(a);
            fl.deallocate(c);
        }
        // Two separated two-byte holes cannot satisfy eight bytes.
        assert!(fl.allocate(8).is_none());

        unsafe { fl.deallocate(b) };
        // a, b and c merged into one block.
        assert!(fl.allocate(8).is_some());
        let _ = d;
    }

    #[test]
    fn free_list_stays_address_sorted_and_coalesced() {
        let mut arena = [0u8; 64];
        let fl = FreeListAllocator::new(&mut arena);

        let mut ptrs = [None; 5];
        for slot in ptrs.iter_mut() {
            *slot = fl.allocate(6);
            assert!(slot.is_some());
        }
        // Free out of order.
        for &i in &[3usize, 0, 4, 2, 1] {
            if let Some(p) = ptrs[i] {
                unsafe { fl.deallocate(p) };
            }
            let blocks = fl.free_blocks();
            for pair in blocks.windows(2) {
                assert!(pair[0].offset < pair[1].offset, "not address sorted");
                assert_ne!(
                    pair[0].offset as usize + HEADER_SIZE + pair[0].size as usize,
                    pair[1].offset as usize,
                    "adjacent blocks left uncoalesced"
                );
            }
        }
    }

    #[test]
    fn round_trip_restores_the_fresh_arena_shape() {
        let mut arena = [0u8; 64];
        let fl = FreeListAllocator::new(&mut arena);
        let fresh_largest = fl.largest_free();
        assert_eq!(fresh_largest, 60);

        let a = fl.allocate(10).unwrap();
        let b = fl.allocate(5).unwrap();
        let c = fl.allocate(7).unwrap();
        unsafe {
            fl.deallocate(b);
            fl.deallocate(a);
            fl.deallocate(c);
        }
        assert_eq!(fl.largest_free(), fresh_largest);
        assert_eq!(fl.free_blocks().len(), 1);
    }

    #[test]
    fn tiny_arena_has_no_blocks() {
        let mut arena = [0u8; 4];
        let fl = FreeListAllocator::new(&mut arena);
        assert!(fl.allocate(1).is_none());
        assert!(fl.free_blocks().is_empty());
    }

    #[test]
    fn identity_equality() {
        let mut arena_a = [0u8; 16];
        let mut arena_b = [0u8; 16];
        let a = FreeListAllocator::new(&mut arena_a);
        let b = FreeListAllocator::new(&mut arena_b);
        assert_eq!(a.id(), a.id());
        assert_ne!(a.id(), b.id());
        assert!(a == a);
        assert!(a != b);
    }
}

#![no_std]
#![allow(unsafe_code)] // Arena allocators require unsafe for raw block handling

//! # Avril Allocators
//!
//! Deterministic arena allocators for environments with no operating
//! system and no global heap: a fixed-node pool allocator, a first-fit
//! coalescing free-list allocator, and a process-wide heap singleton
//! built on the latter. All allocators hand out raw byte blocks from a
//! caller-supplied contiguous arena and never touch memory outside it.
//!
//! Free structures are threaded through the arena itself as 16-bit
//! offsets, which keeps bookkeeping at two bytes per link on an
//! ATmega. Offsets are read and written unaligned; AVR has no
//! alignment requirements and hosts running the test suite do.

use core::ptr::NonNull;

pub mod freelist;
pub mod heap;
pub mod pool;

pub use freelist::{FreeBlock, FreeListAllocator};
pub use heap::Heap;
pub use pool::{PoolAllocator, PoolStats};

/// Reserved offset value marking the end of an in-arena linked list
pub(crate) const OFFSET_NIL: u16 = u16::MAX;

/// Largest supported arena, in bytes
///
/// One short of `u16::MAX` so every byte has a representable offset
/// distinct from [`OFFSET_NIL`].
pub const MAX_ARENA: usize = u16::MAX as usize - 1;

/// Identity handle for an allocator object
///
/// Allocators are not cloneable; two allocators compare equal exactly
/// when they are the same object. Containers record the id of the
/// allocator that produced their storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocId(pub(crate) usize);

/// Raw byte-block allocator over a fixed arena
pub trait RawAlloc {
    /// Allocate `size` bytes, returning `None` when no block fits
    fn allocate(&self, size: usize) -> Option<NonNull<u8>>;

    /// Return a block to the allocator
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by [`RawAlloc::allocate`] on this
    /// same allocator and must not have been deallocated already.
    unsafe fn deallocate(&self, ptr: NonNull<u8>);

    /// Identity of this allocator object
    fn id(&self) -> AllocId;
}

impl<A: RawAlloc + ?Sized> RawAlloc for &A {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        (**self).allocate(size)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        (**self).deallocate(ptr)
    }

    fn id(&self) -> AllocId {
        (**self).id()
    }
}

/// Read a 16-bit link stored unaligned at `base + offset`
///
/// # Safety
///
/// `offset + 2` must be within the arena that `base` points to.
pub(crate) unsafe fn read_link(base: NonNull<u8>, offset: usize) -> u16 {
    base.as_ptr().add(offset).cast::<u16>().read_unaligned()
}

/// Write a 16-bit link unaligned at `base + offset`
///
/// # Safety
///
/// `offset + 2` must be within the arena that `base` points to.
pub(crate) unsafe fn write_link(base: NonNull<u8>, offset: usize, link: u16) {
    base.as_ptr().add(offset).cast::<u16>().write_unaligned(link);
}

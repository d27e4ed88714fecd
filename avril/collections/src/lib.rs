#![no_std]
#![allow(unsafe_code)] // Ring storage and slot arenas require unsafe for raw buffers

//! # Avril Collections
//!
//! Value-owning containers for environments without a global heap:
//! a growable ring-buffer deque, its fixed-capacity in-object twin,
//! doubly- and singly-linked lists over index arenas, and FIFO /
//! priority-queue adapters on top of them.
//!
//! Node-based containers never hold raw node pointers. Links are
//! 16-bit [`NodeId`] handles into a slot arena owned by the container;
//! [`NodeId::NIL`] is the reserved sentinel index that terminates every
//! chain. The arena comes in two flavours picked by a type parameter:
//! [`InlineSlots`] embeds a compile-time number of slots in the
//! container object, [`ArenaSlots`] grows out of any [`RawAlloc`]
//! byte allocator (normally the [`avril_alloc::Heap`] singleton).

use avril_alloc::RawAlloc;
use avril_core::{Error, Result};
use core::ptr::NonNull;

pub mod deque;
pub mod forward_list;
pub mod list;
pub mod priority_queue;
pub mod queue;
pub mod slots;
pub mod static_deque;

pub use deque::Deque;
pub use forward_list::{ForwardList, FwdNode, FwdPos, HeapForwardList, StaticForwardList};
pub use list::{Cursor, HeapList, List, Node, StaticList};
pub use priority_queue::PriorityQueue;
pub use queue::{FifoBuffer, Queue};
pub use slots::{ArenaSlots, InlineSlots, NodeId, SlotStore};
pub use static_deque::StaticDeque;

/// One raw allocation carrying a self-aligned typed view
///
/// The byte allocators are alignment-oblivious (the AVR target has
/// none), so each container over-requests by `align - 1` bytes and
/// keeps both the raw pointer for deallocation and the aligned data
/// pointer for element access.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawBuffer<T> {
    pub(crate) raw: NonNull<u8>,
    pub(crate) data: NonNull<T>,
}

pub(crate) fn alloc_buffer<T, A: RawAlloc>(alloc: &A, cap: usize) -> Result<RawBuffer<T>> {
    let align = core::mem::align_of::<T>();
    let bytes = core::mem::size_of::<T>()
        .checked_mul(cap)
        .and_then(|b| b.checked_add(align - 1))
        .ok_or(Error::BadAlloc)?;
    let raw = alloc.allocate(bytes).ok_or(Error::BadAlloc)?;
    let addr = raw.as_ptr() as usize;
    let aligned = (addr + align - 1) & !(align - 1);
    // SAFETY: aligned is within the over-sized block, and nonzero.
    let data = unsafe { NonNull::new_unchecked(aligned as *mut T) };
    Ok(RawBuffer { raw, data })
}

/// # Safety
///
/// `buf` must have come from [`alloc_buffer`] on the same allocator,
/// with all elements already dropped.
pub(crate) unsafe fn free_buffer<T, A: RawAlloc>(alloc: &A, buf: RawBuffer<T>) {
    alloc.deallocate(buf.raw);
}

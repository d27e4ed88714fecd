//! Process-wide heap singleton over a compile-time arena

use crate::freelist;
use crate::{AllocId, RawAlloc, MAX_ARENA, OFFSET_NIL};
use core::cell::{RefCell, UnsafeCell};
use core::ptr::NonNull;
use critical_section::Mutex;

/// Free-list heap with an in-object arena of `CAP` bytes
///
/// Designed to live in a `static` and serve as the default allocator
/// for the container crates:
///
/// ```ignore
/// static HEAP: Heap<1024> = Heap::new();
/// let mut names: HeapList<u8, &Heap<1024>> = List::with_alloc(&HEAP);
/// ```
///
/// The free list is primed lazily on first use, so construction is a
/// `const fn` and the arena costs nothing until something allocates.
/// Allocation and deallocation counters are kept for leak hunting.
pub struct Heap<const CAP: usize> {
    arena: UnsafeCell<[u8; CAP]>,
    state: Mutex<RefCell<HeapState>>,
}

struct HeapState {
    head: u16,
    primed: bool,
    allocs: u32,
    deallocs: u32,
}

// The arena is only reached while the state is borrowed under a
// critical section.
unsafe impl<const CAP: usize> Sync for Heap<CAP> {}

impl<const CAP: usize> Heap<CAP> {
    /// Create an unprimed heap
    pub const fn new() -> Self {
        assert!(CAP <= MAX_ARENA, "arena exceeds offset range");
        Self {
            arena: UnsafeCell::new([0; CAP]),
            state: Mutex::new(RefCell::new(HeapState {
                head: OFFSET_NIL,
                primed: false,
                allocs: 0,
                deallocs: 0,
            })),
        }
    }

    fn base(&self) -> NonNull<u8> {
        // SAFETY: UnsafeCell::get never returns null.
        unsafe { NonNull::new_unchecked(self.arena.get().cast()) }
    }

    fn prime(&self, state: &mut HeapState) {
        if !state.primed {
            // SAFETY: the arena is in-object memory of CAP bytes.
            state.head = unsafe { freelist::init(self.base(), CAP) };
            state.primed = true;
        }
    }

    /// Arena capacity in bytes
    pub const fn capacity(&self) -> usize {
        CAP
    }

    /// Number of successful allocations so far
    pub fn allocations(&self) -> u32 {
        critical_section::with(|cs| self.state.borrow_ref(cs).allocs)
    }

    /// Number of deallocations so far
    pub fn deallocations(&self) -> u32 {
        critical_section::with(|cs| self.state.borrow_ref(cs).deallocs)
    }

    /// Total free bytes (headers excluded)
    pub fn free_bytes(&self) -> usize {
        self.walk(|total, size| total + size)
    }

    /// Largest single allocatable request
    pub fn largest_free(&self) -> usize {
        self.walk(|best, size| if size > best { size } else { best })
    }

    fn walk(&self, fold: impl Fn(usize, usize) -> usize) -> usize {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            self.prime(&mut state);
            let mut acc = 0;
            let mut cur = state.head;
            while cur != OFFSET_NIL {
                // SAFETY: cur is a linked header inside the arena.
                let (size, next) = unsafe { freelist::read_header(self.base(), cur as usize) };
                acc = fold(acc, size as usize);
                cur = next;
            }
            acc
        })
    }
}

impl<const CAP: usize> RawAlloc for Heap<CAP> {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            self.prime(&mut state);
            let mut head = state.head;
            // SAFETY: head threads through the in-object arena.
            let ptr = unsafe { freelist::allocate(self.base(), &mut head, size) };
            state.head = head;
            if ptr.is_some() {
                state.allocs += 1;
            }
            ptr
        })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            let mut head = state.head;
            // SAFETY: per the trait contract ptr came from this arena.
            unsafe { freelist::deallocate(self.base(), &mut head, ptr) };
            state.head = head;
            state.deallocs += 1;
        });
    }

    fn id(&self) -> AllocId {
        AllocId(self as *const Self as *const u8 as usize)
    }
}

impl<const CAP: usize> Default for Heap<CAP> {
    fn default() -> Self {
        Self::new()
    }
}

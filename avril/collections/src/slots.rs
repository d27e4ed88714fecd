//! Slot arenas backing the node containers
//!
//! Linked containers keep their nodes in one of these arenas and refer
//! to them by 16-bit [`NodeId`] handles instead of pointers. A vacant
//! slot remembers the next vacant slot, forming an internal free list,
//! so inserting pops a slot in O(1) and removing pushes one back.

use crate::{alloc_buffer, free_buffer, RawBuffer};
use avril_alloc::RawAlloc;
use avril_core::{Error, Result};

/// Capacity of the first lazily created slot buffer
const FIRST_CAPACITY: usize = 4;

/// Most slots any arena can address: ids are 16-bit with one reserved
pub const MAX_SLOTS: usize = u16::MAX as usize - 1;

/// Handle of one node slot
///
/// [`NodeId::NIL`] is the reserved sentinel index terminating every
/// chain; it never names a live slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(pub(crate) u16);

impl NodeId {
    /// The reserved sentinel index
    pub const NIL: NodeId = NodeId(u16::MAX);

    pub(crate) const fn from_index(i: usize) -> NodeId {
        NodeId(i as u16)
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }

    /// Check for the sentinel
    pub const fn is_nil(self) -> bool {
        self.0 == u16::MAX
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for NodeId {
    fn format(&self, fmt: defmt::Formatter) {
        if self.is_nil() {
            defmt::write!(fmt, "NodeId(NIL)");
        } else {
            defmt::write!(fmt, "NodeId({})", self.0);
        }
    }
}

enum Slot<N> {
    Vacant { next: NodeId },
    Occupied(N),
}

impl<N> Slot<N> {
    const VACANT: Slot<N> = Slot::Vacant { next: NodeId::NIL };
}

/// Storage strategy for node containers
pub trait SlotStore<N> {
    /// Store a node, returning its handle
    fn try_insert(&mut self, node: N) -> Result<NodeId>;

    /// Ensure a vacant slot so the next `try_insert` cannot fail
    ///
    /// `try_insert` consumes its node even when it reports
    /// [`Error::BadAlloc`]; callers that must not lose the value
    /// reserve first.
    fn reserve(&mut self) -> Result<()>;

    /// Vacate a slot, returning its node; `None` when already vacant
    fn take(&mut self, id: NodeId) -> Option<N>;

    /// Borrow the node in a slot; `None` when vacant or out of range
    fn get(&self, id: NodeId) -> Option<&N>;

    /// Mutably borrow the node in a slot
    fn get_mut(&mut self, id: NodeId) -> Option<&mut N>;

    /// Vacate every slot
    fn clear(&mut self);

    /// Number of occupied slots
    fn len(&self) -> usize;

    /// Check whether no slot is occupied
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Slot arena embedded in the container object
///
/// `CAP` slots live inline; exhausting them is a [`Error::BadAlloc`],
/// matching what the heap-backed arena reports when its allocator runs
/// dry. The free list is threaded lazily so `new` stays `const`.
pub struct InlineSlots<N, const CAP: usize> {
    slots: [Slot<N>; CAP],
    free: NodeId,
    primed: bool,
    len: usize,
}

impl<N, const CAP: usize> InlineSlots<N, CAP> {
    /// Create an arena with every slot vacant
    pub const fn new() -> Self {
        Self {
            slots: [Slot::VACANT; CAP],
            free: NodeId::NIL,
            primed: false,
            len: 0,
        }
    }

    /// Compile-time slot capacity
    pub const fn capacity(&self) -> usize {
        CAP
    }

    fn prime(&mut self) {
        debug_assert!(CAP <= MAX_SLOTS);
        let mut head = NodeId::NIL;
        let mut i = CAP;
        while i > 0 {
            i -= 1;
            self.slots[i] = Slot::Vacant { next: head };
            head = NodeId::from_index(i);
        }
        self.free = head;
        self.primed = true;
    }
}

impl<N, const CAP: usize> Default for InlineSlots<N, CAP> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, const CAP: usize> SlotStore<N> for InlineSlots<N, CAP> {
    fn try_insert(&mut self, node: N) -> Result<NodeId> {
        if !self.primed {
            self.prime();
        }
        let id = self.free;
        if id.is_nil() {
            return Err(Error::BadAlloc);
        }
        match self.slots[id.index()] {
            Slot::Vacant { next } => self.free = next,
            Slot::Occupied(_) => unreachable!("free list entry is occupied"),
        }
        self.slots[id.index()] = Slot::Occupied(node);
        self.len += 1;
        Ok(id)
    }

    fn reserve(&mut self) -> Result<()> {
        if !self.primed {
            self.prime();
        }
        if self.free.is_nil() {
            Err(Error::BadAlloc)
        } else {
            Ok(())
        }
    }

    fn take(&mut self, id: NodeId) -> Option<N> {
        if id.index() >= CAP {
            return None;
        }
        if matches!(self.slots[id.index()], Slot::Vacant { .. }) {
            return None;
        }
        let freed = core::mem::replace(
            &mut self.slots[id.index()],
            Slot::Vacant { next: self.free },
        );
        self.free = id;
        self.len -= 1;
        match freed {
            Slot::Occupied(node) => Some(node),
            Slot::Vacant { .. } => unreachable!("checked occupied above"),
        }
    }

    fn get(&self, id: NodeId) -> Option<&N> {
        match self.slots.get(id.index()) {
            Some(Slot::Occupied(node)) => Some(node),
            _ => None,
        }
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut N> {
        match self.slots.get_mut(id.index()) {
            Some(Slot::Occupied(node)) => Some(node),
            _ => None,
        }
    }

    fn clear(&mut self) {
        self.prime();
        self.len = 0;
    }

    fn len(&self) -> usize {
        self.len
    }
}

/// Slot arena growing out of a byte allocator
///
/// Every slot of the buffer is always initialised (vacant or
/// occupied), so growth just moves the slot values across and threads
/// the new tail onto the free list; existing handles stay valid.
pub struct ArenaSlots<N, A: RawAlloc + Copy> {
    alloc: A,
    buf: Option<RawBuffer<Slot<N>>>,
    cap: usize,
    free: NodeId,
    len: usize,
}

// The slot buffer is exclusively owned by the arena.
unsafe impl<N: Send, A: RawAlloc + Copy + Send> Send for ArenaSlots<N, A> {}
unsafe impl<N: Sync, A: RawAlloc + Copy + Sync> Sync for ArenaSlots<N, A> {}

impl<N, A: RawAlloc + Copy> ArenaSlots<N, A> {
    /// Create an empty arena; nothing is allocated yet
    pub const fn new(alloc: A) -> Self {
        Self {
            alloc,
            buf: None,
            cap: 0,
            free: NodeId::NIL,
            len: 0,
        }
    }

    /// Current slot capacity
    pub const fn capacity(&self) -> usize {
        self.cap
    }

    fn slice(&self) -> &[Slot<N>] {
        match &self.buf {
            // SAFETY: all cap slots are initialised.
            Some(b) => unsafe { core::slice::from_raw_parts(b.data.as_ptr(), self.cap) },
            None => &[],
        }
    }

    fn slice_mut(&mut self) -> &mut [Slot<N>] {
        match &self.buf {
            // SAFETY: all cap slots are initialised and exclusively
            // owned through &mut self.
            Some(b) => unsafe { core::slice::from_raw_parts_mut(b.data.as_ptr(), self.cap) },
            None => &mut [],
        }
    }

    fn grow(&mut self) -> Result<()> {
        let new_cap = if self.cap == 0 {
            FIRST_CAPACITY
        } else if self.cap >= MAX_SLOTS {
            return Err(Error::BadAlloc);
        } else {
            (self.cap * 2).min(MAX_SLOTS)
        };

        let new = alloc_buffer::<Slot<N>, A>(&self.alloc, new_cap)?;
        for i in 0..self.cap {
            // SAFETY: old slots are initialised; the values move.
            unsafe {
                let v = self.slice().as_ptr().add(i).read();
                new.data.as_ptr().add(i).write(v);
            }
        }
        // Thread the fresh tail slots onto the free list.
        let mut head = self.free;
        let mut i = new_cap;
        while i > self.cap {
            i -= 1;
            // SAFETY: slot i of the new buffer is in range.
            unsafe { new.data.as_ptr().add(i).write(Slot::Vacant { next: head }) };
            head = NodeId::from_index(i);
        }
        self.free = head;

        if let Some(old) = self.buf.take() {
            // SAFETY: every old slot value was moved out above.
            unsafe { free_buffer(&self.alloc, old) };
        }
        self.buf = Some(new);
        self.cap = new_cap;
        Ok(())
    }
}

impl<N, A: RawAlloc + Copy> SlotStore<N> for ArenaSlots<N, A> {
    fn try_insert(&mut self, node: N) -> Result<NodeId> {
        if self.free.is_nil() {
            self.grow()?;
        }
        let id = self.free;
        match self.slice()[id.index()] {
            Slot::Vacant { next } => self.free = next,
            Slot::Occupied(_) => unreachable!("free list entry is occupied"),
        }
        self.slice_mut()[id.index()] = Slot::Occupied(node);
        self.len += 1;
        Ok(id)
    }

    fn reserve(&mut self) -> Result<()> {
        if self.free.is_nil() {
            self.grow()
        } else {
            Ok(())
        }
    }

    fn take(&mut self, id: NodeId) -> Option<N> {
        if id.index() >= self.cap {
            return None;
        }
        if matches!(self.slice()[id.index()], Slot::Vacant { .. }) {
            return None;
        }
        let free = self.free;
        let freed = core::mem::replace(
            &mut self.slice_mut()[id.index()],
            Slot::Vacant { next: free },
        );
        self.free = id;
        self.len -= 1;
        match freed {
            Slot::Occupied(node) => Some(node),
            Slot::Vacant { .. } => unreachable!("checked occupied above"),
        }
    }

    fn get(&self, id: NodeId) -> Option<&N> {
        match self.slice().get(id.index()) {
            Some(Slot::Occupied(node)) => Some(node),
            _ => None,
        }
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut N> {
        match self.slice_mut().get_mut(id.index()) {
            Some(Slot::Occupied(node)) => Some(node),
            _ => None,
        }
    }

    fn clear(&mut self) {
        let cap = self.cap;
        let mut head = NodeId::NIL;
        let mut i = cap;
        while i > 0 {
            i -= 1;
            // Dropping an occupied slot's node happens in the
            // assignment.
            self.slice_mut()[i] = Slot::Vacant { next: head };
            head = NodeId::from_index(i);
        }
        self.free = head;
        self.len = 0;
    }

    fn len(&self) -> usize {
        self.len
    }
}

impl<N, A: RawAlloc + Copy> Drop for ArenaSlots<N, A> {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            let cap = self.cap;
            // SAFETY: all cap slots are initialised; drop them in
            // place, then release the buffer.
            unsafe {
                core::ptr::drop_in_place(core::ptr::slice_from_raw_parts_mut(
                    buf.data.as_ptr(),
                    cap,
                ));
                free_buffer(&self.alloc, buf);
            }
        }
    }
}

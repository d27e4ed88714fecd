//! Singly-linked list over a slot arena

use crate::slots::{ArenaSlots, InlineSlots, NodeId, SlotStore};
use avril_alloc::RawAlloc;
use avril_core::{Error, Result};
use core::marker::PhantomData;

/// One forward-list node: element plus successor handle
pub struct FwdNode<T> {
    pub(crate) next: NodeId,
    pub(crate) value: T,
}

/// Position in a forward list
///
/// `before_begin` is the front sentinel position: it carries no
/// element, but inserting after it prepends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FwdPos(Option<NodeId>);

impl FwdPos {
    const fn sentinel() -> Self {
        FwdPos(None)
    }
}

/// Singly-linked list storing its nodes in the slot arena `S`
pub struct ForwardList<T, S> {
    slots: S,
    head: NodeId,
    _marker: PhantomData<T>,
}

/// Forward list with `N` node slots embedded in the object
pub type StaticForwardList<T, const N: usize> = ForwardList<T, InlineSlots<FwdNode<T>, N>>;

/// Forward list whose nodes grow out of a byte allocator
pub type HeapForwardList<T, A> = ForwardList<T, ArenaSlots<FwdNode<T>, A>>;

impl<T, const N: usize> StaticForwardList<T, N> {
    /// Create an empty static forward list
    pub const fn new() -> Self {
        Self::new_in(InlineSlots::new())
    }
}

impl<T, A: RawAlloc + Copy> HeapForwardList<T, A> {
    /// Create an empty forward list allocating from `alloc`
    pub const fn with_alloc(alloc: A) -> Self {
        Self::new_in(ArenaSlots::new(alloc))
    }
}

impl<T, S> ForwardList<T, S> {
    /// Create an empty forward list over an existing slot arena
    pub const fn new_in(slots: S) -> Self {
        Self {
            slots,
            head: NodeId::NIL,
            _marker: PhantomData,
        }
    }

    /// The front sentinel position
    pub const fn before_begin(&self) -> FwdPos {
        FwdPos::sentinel()
    }
}

impl<T, S: SlotStore<FwdNode<T>>> ForwardList<T, S> {
    /// Number of stored elements
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check for emptiness
    pub fn is_empty(&self) -> bool {
        self.head.is_nil()
    }

    /// Position of the front node
    pub fn first(&self) -> Option<FwdPos> {
        if self.head.is_nil() {
            None
        } else {
            Some(FwdPos(Some(self.head)))
        }
    }

    /// Position one step towards the back
    pub fn next_pos(&self, at: FwdPos) -> Option<FwdPos> {
        let next = match at.0 {
            None => self.head,
            Some(id) => self.slots.get(id)?.next,
        };
        if next.is_nil() {
            None
        } else {
            Some(FwdPos(Some(next)))
        }
    }

    /// Borrow the element at a position
    ///
    /// The sentinel position and vacated positions carry no element.
    pub fn get(&self, at: FwdPos) -> Result<&T> {
        match at.0 {
            None => Err(Error::NullPointer),
            Some(id) => self
                .slots
                .get(id)
                .map(|n| &n.value)
                .ok_or(Error::NullPointer),
        }
    }

    /// Prepend at the front
    pub fn push_front(&mut self, value: T) -> Result<()> {
        let id = self.slots.try_insert(FwdNode {
            next: self.head,
            value,
        })?;
        self.head = id;
        Ok(())
    }

    /// Remove and return the front element
    pub fn pop_front(&mut self) -> Option<T> {
        let node = self.slots.take(self.head)?;
        self.head = node.next;
        Some(node.value)
    }

    /// Borrow the front element
    pub fn front(&self) -> Option<&T> {
        self.slots.get(self.head).map(|n| &n.value)
    }

    /// Insert a new element after `at`
    ///
    /// `insert_after(before_begin(), v)` prepends.
    pub fn insert_after(&mut self, at: FwdPos, value: T) -> Result<FwdPos> {
        let next = match at.0 {
            None => self.head,
            Some(id) => match self.slots.get(id) {
                Some(node) => node.next,
                None => return Err(Error::NullPointer),
            },
        };
        let id = self.slots.try_insert(FwdNode { next, value })?;
        match at.0 {
            None => self.head = id,
            Some(prev) => {
                if let Some(node) = self.slots.get_mut(prev) {
                    node.next = id;
                }
            }
        }
        Ok(FwdPos(Some(id)))
    }

    /// Erase the element after `at`, returning it
    pub fn erase_after(&mut self, at: FwdPos) -> Option<T> {
        let target = match at.0 {
            None => self.head,
            Some(id) => self.slots.get(id)?.next,
        };
        let node = self.slots.take(target)?;
        match at.0 {
            None => self.head = node.next,
            Some(prev) => {
                if let Some(p) = self.slots.get_mut(prev) {
                    p.next = node.next;
                }
            }
        }
        Some(node.value)
    }

    /// Move every element of `donor` behind `at`, keeping their order
    ///
    /// Elements move between the two containers' slot arenas, so each
    /// one allocates in the recipient. On failure the elements moved
    /// so far stay moved, the element that failed to transfer is
    /// dropped, and the rest remain in the donor.
    pub fn splice_after<S2: SlotStore<FwdNode<T>>>(
        &mut self,
        at: FwdPos,
        donor: &mut ForwardList<T, S2>,
    ) -> Result<()> {
        let mut pos = at;
        while let Some(value) = donor.pop_front() {
            pos = self.insert_after(pos, value)?;
        }
        Ok(())
    }

    /// Reverse the element order in place
    pub fn reverse(&mut self) {
        let mut prev = NodeId::NIL;
        let mut cur = self.head;
        while !cur.is_nil() {
            let node = match self.slots.get_mut(cur) {
                Some(node) => node,
                None => unreachable!("linked id names an occupied slot"),
            };
            let next = node.next;
            node.next = prev;
            prev = cur;
            cur = next;
        }
        self.head = prev;
    }

    /// Drop every element
    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = NodeId::NIL;
    }

    /// Iterate front to back
    pub fn iter(&self) -> Iter<'_, T, S> {
        Iter {
            list: self,
            cur: self.head,
        }
    }
}

impl<T: PartialEq, S1, S2> PartialEq<ForwardList<T, S2>> for ForwardList<T, S1>
where
    S1: SlotStore<FwdNode<T>>,
    S2: SlotStore<FwdNode<T>>,
{
    fn eq(&self, other: &ForwardList<T, S2>) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

/// Front-to-back borrowing iterator
pub struct Iter<'a, T, S> {
    list: &'a ForwardList<T, S>,
    cur: NodeId,
}

impl<'a, T, S: SlotStore<FwdNode<T>>> Iterator for Iter<'a, T, S> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let node = self.list.slots.get(self.cur)?;
        self.cur = node.next;
        Some(&node.value)
    }
}

impl<'a, T, S: SlotStore<FwdNode<T>>> IntoIterator for &'a ForwardList<T, S> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, S>;

    fn into_iter(self) -> Iter<'a, T, S> {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_front_orders_last_first() {
        let mut list: StaticForwardList<u8, 4> = StaticForwardList::new();
        list.push_front(42).unwrap();
        list.push_front(43).unwrap();
        list.push_front(44).unwrap();
        assert!(list.iter().eq([44, 43, 42].iter()));
    }

    #[test]
    fn reverse_relinks() {
        let mut list: StaticForwardList<u8, 4> = StaticForwardList::new();
        list.push_front(42).unwrap();
        list.push_front(43).unwrap();
        list.push_front(44).unwrap();
        list.reverse();
        assert!(list.iter().eq([42, 43, 44].iter()));
        assert_eq!(list.front(), Some(&42));
    }

    #[test]
    fn insert_after_sentinel_prepends() {
        let mut list: StaticForwardList<u8, 4> = StaticForwardList::new();
        list.push_front(2).unwrap();
        list.insert_after(list.before_begin(), 1).unwrap();
        assert!(list.iter().eq([1, 2].iter()));

        let first = list.first().unwrap();
        list.insert_after(first, 9).unwrap();
        assert!(list.iter().eq([1, 9, 2].iter()));
    }

    #[test]
    fn erase_after_sentinel_pops_front() {
        let mut list: StaticForwardList<u8, 4> = StaticForwardList::new();
        list.push_front(2).unwrap();
        list.push_front(1).unwrap();
        assert_eq!(list.erase_after(list.before_begin()), Some(1));
        assert_eq!(list.erase_after(list.first().unwrap()), None);
        assert!(list.iter().eq([2].iter()));
    }

    #[test]
    fn sentinel_carries_no_element() {
        let list: StaticForwardList<u8, 4> = StaticForwardList::new();
        assert_eq!(list.get(list.before_begin()), Err(Error::NullPointer));
    }

    #[test]
    fn splice_after_moves_donor_elements() {
        let mut a: StaticForwardList<u8, 8> = StaticForwardList::new();
        let mut b: StaticForwardList<u8, 8> = StaticForwardList::new();
        a.push_front(20).unwrap();
        a.push_front(10).unwrap();
        b.push_front(3).unwrap();
        b.push_front(2).unwrap();
        b.push_front(1).unwrap();

        let first = a.first().unwrap();
        a.splice_after(first, &mut b).unwrap();
        assert!(a.iter().eq([10, 1, 2, 3, 20].iter()));
        assert!(b.is_empty());
    }

    #[test]
    fn splice_after_reports_exhaustion() {
        let mut a: StaticForwardList<u8, 2> = StaticForwardList::new();
        let mut b: StaticForwardList<u8, 4> = StaticForwardList::new();
        a.push_front(1).unwrap();
        b.push_front(3).unwrap();
        b.push_front(2).unwrap();

        let first = a.first().unwrap();
        assert_eq!(a.splice_after(first, &mut b), Err(Error::BadAlloc));
        // Element 2 made it across before the arena filled up; the
        // failed element 3 is gone and nothing remains in the donor.
        assert!(a.iter().eq([1, 2].iter()));
        assert!(b.is_empty());
    }
}

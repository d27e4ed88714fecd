//! Doubly-linked list over a slot arena

use crate::slots::{ArenaSlots, InlineSlots, NodeId, SlotStore};
use avril_alloc::RawAlloc;
use avril_core::{Error, Result};
use core::marker::PhantomData;

/// One list node: element plus neighbour handles
pub struct Node<T> {
    pub(crate) prev: NodeId,
    pub(crate) next: NodeId,
    pub(crate) value: T,
}

/// Doubly-linked list storing its nodes in the slot arena `S`
///
/// `head.prev` and `tail.next` are [`NodeId::NIL`], the reserved
/// sentinel index; every other link names an occupied slot. Erasing a
/// node invalidates cursors to that node only.
pub struct List<T, S> {
    slots: S,
    head: NodeId,
    tail: NodeId,
    _marker: PhantomData<T>,
}

/// List with `N` node slots embedded in the object
pub type StaticList<T, const N: usize> = List<T, InlineSlots<Node<T>, N>>;

/// List whose nodes grow out of a byte allocator
pub type HeapList<T, A> = List<T, ArenaSlots<Node<T>, A>>;

/// Stable position of one live node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor(pub(crate) NodeId);

impl<T, const N: usize> StaticList<T, N> {
    /// Create an empty static list
    pub const fn new() -> Self {
        Self::new_in(InlineSlots::new())
    }
}

impl<T, A: RawAlloc + Copy> HeapList<T, A> {
    /// Create an empty list allocating from `alloc`
    pub const fn with_alloc(alloc: A) -> Self {
        Self::new_in(ArenaSlots::new(alloc))
    }
}

impl<T, S> List<T, S> {
    /// Create an empty list over an existing slot arena
    pub const fn new_in(slots: S) -> Self {
        Self {
            slots,
            head: NodeId::NIL,
            tail: NodeId::NIL,
            _marker: PhantomData,
        }
    }
}

impl<T, S: SlotStore<Node<T>>> List<T, S> {
    /// Number of stored elements
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check for emptiness
    pub fn is_empty(&self) -> bool {
        self.head.is_nil()
    }

    fn node(&self, id: NodeId) -> &Node<T> {
        match self.slots.get(id) {
            Some(node) => node,
            None => unreachable!("linked id names an occupied slot"),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        match self.slots.get_mut(id) {
            Some(node) => node,
            None => unreachable!("linked id names an occupied slot"),
        }
    }

    /// Append at the back
    pub fn push_back(&mut self, value: T) -> Result<()> {
        let id = self.slots.try_insert(Node {
            prev: self.tail,
            next: NodeId::NIL,
            value,
        })?;
        if self.tail.is_nil() {
            self.head = id;
        } else {
            let tail = self.tail;
            self.node_mut(tail).next = id;
        }
        self.tail = id;
        Ok(())
    }

    /// Prepend at the front
    pub fn push_front(&mut self, value: T) -> Result<()> {
        let id = self.slots.try_insert(Node {
            prev: NodeId::NIL,
            next: self.head,
            value,
        })?;
        if self.head.is_nil() {
            self.tail = id;
        } else {
            let head = self.head;
            self.node_mut(head).prev = id;
        }
        self.head = id;
        Ok(())
    }

    fn unlink(&mut self, prev: NodeId, next: NodeId) {
        if prev.is_nil() {
            self.head = next;
        } else {
            self.node_mut(prev).next = next;
        }
        if next.is_nil() {
            self.tail = prev;
        } else {
            self.node_mut(next).prev = prev;
        }
    }

    /// Remove and return the front element
    pub fn pop_front(&mut self) -> Option<T> {
        let id = self.head;
        let node = self.slots.take(id)?;
        self.unlink(node.prev, node.next);
        Some(node.value)
    }

    /// Remove and return the back element
    pub fn pop_back(&mut self) -> Option<T> {
        let id = self.tail;
        let node = self.slots.take(id)?;
        self.unlink(node.prev, node.next);
        Some(node.value)
    }

    /// Borrow the front element
    pub fn front(&self) -> Option<&T> {
        self.slots.get(self.head).map(|n| &n.value)
    }

    /// Borrow the back element
    pub fn back(&self) -> Option<&T> {
        self.slots.get(self.tail).map(|n| &n.value)
    }

    /// Cursor to the front node
    pub fn first(&self) -> Option<Cursor> {
        if self.head.is_nil() {
            None
        } else {
            Some(Cursor(self.head))
        }
    }

    /// Cursor to the back node
    pub fn last(&self) -> Option<Cursor> {
        if self.tail.is_nil() {
            None
        } else {
            Some(Cursor(self.tail))
        }
    }

    /// Cursor one step towards the back
    pub fn next(&self, at: Cursor) -> Option<Cursor> {
        let next = self.slots.get(at.0)?.next;
        if next.is_nil() {
            None
        } else {
            Some(Cursor(next))
        }
    }

    /// Cursor one step towards the front
    pub fn prev(&self, at: Cursor) -> Option<Cursor> {
        let prev = self.slots.get(at.0)?.prev;
        if prev.is_nil() {
            None
        } else {
            Some(Cursor(prev))
        }
    }

    /// Borrow the element under a cursor
    ///
    /// A cursor whose node was erased reads as a dangling position.
    pub fn get(&self, at: Cursor) -> Result<&T> {
        self.slots.get(at.0).map(|n| &n.value).ok_or(Error::NullPointer)
    }

    /// Mutably borrow the element under a cursor
    pub fn get_mut(&mut self, at: Cursor) -> Result<&mut T> {
        self.slots
            .get_mut(at.0)
            .map(|n| &mut n.value)
            .ok_or(Error::NullPointer)
    }

    /// Insert a new element before the node under `at`
    pub fn insert_before(&mut self, at: Cursor, value: T) -> Result<Cursor> {
        let prev = match self.slots.get(at.0) {
            Some(node) => node.prev,
            None => return Err(Error::NullPointer),
        };
        let id = self.slots.try_insert(Node {
            prev,
            next: at.0,
            value,
        })?;
        self.node_mut(at.0).prev = id;
        if prev.is_nil() {
            self.head = id;
        } else {
            self.node_mut(prev).next = id;
        }
        Ok(Cursor(id))
    }

    /// Insert a new element after the node under `at`
    pub fn insert_after(&mut self, at: Cursor, value: T) -> Result<Cursor> {
        let next = match self.slots.get(at.0) {
            Some(node) => node.next,
            None => return Err(Error::NullPointer),
        };
        let id = self.slots.try_insert(Node {
            prev: at.0,
            next,
            value,
        })?;
        self.node_mut(at.0).next = id;
        if next.is_nil() {
            self.tail = id;
        } else {
            self.node_mut(next).prev = id;
        }
        Ok(Cursor(id))
    }

    /// Erase the node under `at`, returning its element
    pub fn remove_at(&mut self, at: Cursor) -> Result<T> {
        let node = self.slots.take(at.0).ok_or(Error::NullPointer)?;
        self.unlink(node.prev, node.next);
        Ok(node.value)
    }

    /// Erase every element equal to `value` in one pass
    pub fn remove(&mut self, value: &T) -> usize
    where
        T: PartialEq,
    {
        let mut removed = 0;
        let mut cur = self.head;
        while !cur.is_nil() {
            let next = self.node(cur).next;
            if self.node(cur).value == *value {
                if let Some(node) = self.slots.take(cur) {
                    self.unlink(node.prev, node.next);
                    removed += 1;
                }
            }
            cur = next;
        }
        removed
    }

    /// Keep only the elements satisfying `pred`, in one pass
    pub fn retain(&mut self, mut pred: impl FnMut(&T) -> bool) {
        let mut cur = self.head;
        while !cur.is_nil() {
            let next = self.node(cur).next;
            if !pred(&self.node(cur).value) {
                if let Some(node) = self.slots.take(cur) {
                    self.unlink(node.prev, node.next);
                }
            }
            cur = next;
        }
    }

    /// Reverse the element order in place
    pub fn reverse(&mut self) {
        let mut cur = self.head;
        while !cur.is_nil() {
            let node = self.node_mut(cur);
            core::mem::swap(&mut node.prev, &mut node.next);
            // prev now holds the old next.
            cur = node.prev;
        }
        core::mem::swap(&mut self.head, &mut self.tail);
    }

    /// Drop every element
    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = NodeId::NIL;
        self.tail = NodeId::NIL;
    }

    /// Make room so the next single insertion cannot fail
    pub fn try_reserve(&mut self) -> Result<()> {
        self.slots.reserve()
    }

    /// Append every item of an iterator
    pub fn try_extend<I: IntoIterator<Item = T>>(&mut self, items: I) -> Result<()> {
        for v in items {
            self.push_back(v)?;
        }
        Ok(())
    }

    /// Iterate front to back
    pub fn iter(&self) -> Iter<'_, T, S> {
        Iter {
            list: self,
            front: self.head,
            back: self.tail,
            remaining: self.len(),
        }
    }
}

impl<T: PartialEq, S1, S2> PartialEq<List<T, S2>> for List<T, S1>
where
    S1: SlotStore<Node<T>>,
    S2: SlotStore<Node<T>>,
{
    fn eq(&self, other: &List<T, S2>) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

/// Double-ended borrowing iterator
pub struct Iter<'a, T, S> {
    list: &'a List<T, S>,
    front: NodeId,
    back: NodeId,
    remaining: usize,
}

impl<'a, T, S: SlotStore<Node<T>>> Iterator for Iter<'a, T, S> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.list.slots.get(self.front)?;
        self.front = node.next;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T, S: SlotStore<Node<T>>> DoubleEndedIterator for Iter<'a, T, S> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.list.slots.get(self.back)?;
        self.back = node.prev;
        self.remaining -= 1;
        Some(&node.value)
    }
}

impl<'a, T, S: SlotStore<Node<T>>> ExactSizeIterator for Iter<'a, T, S> {}

impl<'a, T, S: SlotStore<Node<T>>> IntoIterator for &'a List<T, S> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, S>;

    fn into_iter(self) -> Iter<'a, T, S> {
        self.iter()
    }
}

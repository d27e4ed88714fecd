//! FIFO adapter over an exchangeable backing container

use crate::list::{List, Node};
use crate::slots::SlotStore;
use crate::{Deque, StaticDeque};
use avril_alloc::RawAlloc;
use avril_core::{Error, Result};
use core::marker::PhantomData;

/// Back-in front-out storage usable behind [`Queue`]
///
/// Implemented by [`Deque`], [`StaticDeque`] and [`List`], so the same
/// adapter runs over a growable ring, a fixed in-object ring or a
/// linked list depending on the memory regime.
pub trait FifoBuffer<T> {
    /// Append at the back
    fn push_back(&mut self, value: T) -> Result<()>;
    /// Remove and return the front element
    fn pop_front(&mut self) -> Option<T>;
    /// Borrow the front element
    fn front(&self) -> Option<&T>;
    /// Borrow the back element
    fn back(&self) -> Option<&T>;
    /// Number of stored elements
    fn len(&self) -> usize;
    /// Check for emptiness
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Make room so that the next `push_back` cannot fail
    ///
    /// Fixed-capacity containers report fullness here instead of
    /// consuming the value in `push_back`; growable containers
    /// pre-allocate.
    fn reserve_back(&mut self) -> Result<()> {
        Ok(())
    }
    /// Iterate front to back
    fn iter<'a>(&'a self) -> impl Iterator<Item = &'a T>
    where
        T: 'a;
}

impl<T, A: RawAlloc + Copy> FifoBuffer<T> for Deque<T, A> {
    fn push_back(&mut self, value: T) -> Result<()> {
        Deque::push_back(self, value)
    }

    fn pop_front(&mut self) -> Option<T> {
        Deque::pop_front(self)
    }

    fn front(&self) -> Option<&T> {
        Deque::front(self)
    }

    fn back(&self) -> Option<&T> {
        Deque::back(self)
    }

    fn len(&self) -> usize {
        Deque::len(self)
    }

    fn reserve_back(&mut self) -> Result<()> {
        self.reserve(1)
    }

    fn iter<'a>(&'a self) -> impl Iterator<Item = &'a T>
    where
        T: 'a,
    {
        Deque::iter(self)
    }
}

impl<T, const N: usize> FifoBuffer<T> for StaticDeque<T, N> {
    fn push_back(&mut self, value: T) -> Result<()> {
        StaticDeque::push_back(self, value)
    }

    fn pop_front(&mut self) -> Option<T> {
        StaticDeque::pop_front(self)
    }

    fn front(&self) -> Option<&T> {
        StaticDeque::front(self)
    }

    fn back(&self) -> Option<&T> {
        StaticDeque::back(self)
    }

    fn len(&self) -> usize {
        StaticDeque::len(self)
    }

    fn reserve_back(&mut self) -> Result<()> {
        if self.is_full() {
            Err(Error::LengthError)
        } else {
            Ok(())
        }
    }

    fn iter<'a>(&'a self) -> impl Iterator<Item = &'a T>
    where
        T: 'a,
    {
        StaticDeque::iter(self)
    }
}

impl<T, S: SlotStore<Node<T>>> FifoBuffer<T> for List<T, S> {
    fn push_back(&mut self, value: T) -> Result<()> {
        List::push_back(self, value)
    }

    fn pop_front(&mut self) -> Option<T> {
        List::pop_front(self)
    }

    fn front(&self) -> Option<&T> {
        List::front(self)
    }

    fn back(&self) -> Option<&T> {
        List::back(self)
    }

    fn len(&self) -> usize {
        List::len(self)
    }

    fn reserve_back(&mut self) -> Result<()> {
        self.try_reserve()
    }

    fn iter<'a>(&'a self) -> impl Iterator<Item = &'a T>
    where
        T: 'a,
    {
        List::iter(self)
    }
}

/// First-in first-out adapter over a [`FifoBuffer`]
pub struct Queue<T, C: FifoBuffer<T>> {
    buf: C,
    _marker: PhantomData<T>,
}

impl<T, C: FifoBuffer<T>> Queue<T, C> {
    /// Wrap an existing container
    pub const fn new(buf: C) -> Self {
        Self {
            buf,
            _marker: PhantomData,
        }
    }

    /// Enqueue at the back
    pub fn push(&mut self, value: T) -> Result<()> {
        self.buf.push_back(value)
    }

    /// Dequeue from the front
    pub fn pop(&mut self) -> Option<T> {
        self.buf.pop_front()
    }

    /// Borrow the next element to leave
    pub fn front(&self) -> Option<&T> {
        self.buf.front()
    }

    /// Borrow the most recently enqueued element
    pub fn back(&self) -> Option<&T> {
        self.buf.back()
    }

    /// Number of queued elements
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check for emptiness
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Iterate in dequeue order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buf.iter()
    }

    /// Unwrap the backing container
    pub fn into_inner(self) -> C {
        self.buf
    }
}

impl<T, C: FifoBuffer<T> + Default> Default for Queue<T, C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticList;
    use avril_core::Error;

    #[test]
    fn fifo_order_over_static_ring() {
        let mut q: Queue<u8, StaticDeque<u8, 4>> = Queue::default();
        q.push(1).unwrap();
        q.push(2).unwrap();
        q.push(3).unwrap();
        assert_eq!(q.front(), Some(&1));
        assert_eq!(q.back(), Some(&3));
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), Some(2));
        q.push(4).unwrap();
        assert_eq!(q.pop(), Some(3));
        assert_eq!(q.pop(), Some(4));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn full_ring_reports_length_error() {
        let mut q: Queue<u8, StaticDeque<u8, 2>> = Queue::default();
        q.push(1).unwrap();
        q.push(2).unwrap();
        assert_eq!(q.push(3), Err(Error::LengthError));
        assert_eq!(q.len(), 2);
    }

    fn front_to_back<C: FifoBuffer<u8>>(buf: &C) -> [Option<u8>; 4] {
        let mut out = [None; 4];
        for (slot, v) in out.iter_mut().zip(buf.iter()) {
            *slot = Some(*v);
        }
        out
    }

    #[test]
    fn iter_is_usable_through_the_trait() {
        let mut ring: StaticDeque<u8, 4> = StaticDeque::new();
        let mut list: StaticList<u8, 4> = StaticList::new();
        for v in [1, 2, 3] {
            FifoBuffer::push_back(&mut ring, v).unwrap();
            FifoBuffer::push_back(&mut list, v).unwrap();
        }
        assert_eq!(front_to_back(&ring), front_to_back(&list));
        assert_eq!(front_to_back(&ring)[0], Some(1));
    }

    #[test]
    fn list_backing_reports_fullness_on_reserve() {
        let mut list: StaticList<u8, 1> = StaticList::new();
        assert!(FifoBuffer::reserve_back(&mut list).is_ok());
        FifoBuffer::push_back(&mut list, 1).unwrap();
        assert_eq!(FifoBuffer::reserve_back(&mut list), Err(Error::BadAlloc));
    }

    #[test]
    fn list_backing_behaves_the_same() {
        let mut q: Queue<u8, StaticList<u8, 4>> = Queue::new(StaticList::new());
        q.push(7).unwrap();
        q.push(8).unwrap();
        assert!(q.iter().eq([7, 8].iter()));
        assert_eq!(q.pop(), Some(7));
        assert_eq!(q.pop(), Some(8));
        assert!(q.is_empty());
    }
}

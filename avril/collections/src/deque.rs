//! Growable ring-buffer deque

use crate::{alloc_buffer, free_buffer, RawBuffer};
use avril_alloc::RawAlloc;
use avril_core::{Error, Result};

/// Capacity of the first lazily created buffer
const FIRST_CAPACITY: usize = 4;

/// Double-ended queue over a contiguous ring buffer
///
/// Storage is allocated lazily from the byte allocator `A` and doubles
/// whenever `len == capacity`; reallocation re-lays the elements out
/// in logical order from slot zero, so it invalidates every borrowed
/// position. Element `i` lives at `(front + i) % capacity`.
pub struct Deque<T, A: RawAlloc + Copy> {
    alloc: A,
    buf: Option<RawBuffer<T>>,
    cap: usize,
    front: usize,
    len: usize,
}

// Raw buffer pointers are exclusively owned by the deque.
unsafe impl<T: Send, A: RawAlloc + Copy + Send> Send for Deque<T, A> {}
unsafe impl<T: Sync, A: RawAlloc + Copy + Sync> Sync for Deque<T, A> {}

impl<T, A: RawAlloc + Copy> Deque<T, A> {
    /// Create an empty deque; nothing is allocated yet
    pub const fn new(alloc: A) -> Self {
        Self {
            alloc,
            buf: None,
            cap: 0,
            front: 0,
            len: 0,
        }
    }

    /// Number of stored elements
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Check for emptiness
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current slot capacity
    pub const fn capacity(&self) -> usize {
        self.cap
    }

    fn data(&self) -> *mut T {
        match &self.buf {
            Some(b) => b.data.as_ptr(),
            None => core::ptr::NonNull::dangling().as_ptr(),
        }
    }

    /// Pointer to logical slot `i`; requires `cap > 0` and `i` in range
    fn slot(&self, i: usize) -> *mut T {
        debug_assert!(self.cap > 0);
        // SAFETY: the reduced index is a valid slot of the buffer.
        unsafe { self.data().add((self.front + i) % self.cap) }
    }

    fn reallocate(&mut self, new_cap: usize) -> Result<()> {
        debug_assert!(new_cap >= self.len);
        if new_cap == 0 {
            if let Some(old) = self.buf.take() {
                // SAFETY: len == 0, so no live elements remain.
                unsafe { free_buffer(&self.alloc, old) };
            }
            self.cap = 0;
            self.front = 0;
            return Ok(());
        }

        let new = alloc_buffer::<T, A>(&self.alloc, new_cap)?;
        for i in 0..self.len {
            // SAFETY: source slots hold live elements, destination
            // slots are fresh; the values move.
            unsafe { new.data.as_ptr().add(i).write(self.slot(i).read()) };
        }
        if let Some(old) = self.buf.take() {
            // SAFETY: every element was moved out above.
            unsafe { free_buffer(&self.alloc, old) };
        }
        self.buf = Some(new);
        self.cap = new_cap;
        self.front = 0;
        Ok(())
    }

    fn grow(&mut self) -> Result<()> {
        let new_cap = if self.cap == 0 {
            FIRST_CAPACITY
        } else {
            self.cap.checked_mul(2).ok_or(Error::BadAlloc)?
        };
        self.reallocate(new_cap)
    }

    /// Append at the back
    pub fn push_back(&mut self, value: T) -> Result<()> {
        if self.len == self.cap {
            self.grow()?;
        }
        // SAFETY: after grow there is at least one vacant slot.
        unsafe { self.data().add((self.front + self.len) % self.cap).write(value) };
        self.len += 1;
        Ok(())
    }

    /// Prepend at the front
    pub fn push_front(&mut self, value: T) -> Result<()> {
        if self.len == self.cap {
            self.grow()?;
        }
        self.front = (self.front + self.cap - 1) % self.cap;
        // SAFETY: the new front slot is vacant.
        unsafe { self.data().add(self.front).write(value) };
        self.len += 1;
        Ok(())
    }

    /// Remove and return the front element
    pub fn pop_front(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        // SAFETY: the front slot holds a live element; it moves out.
        let value = unsafe { self.slot(0).read() };
        self.front = (self.front + 1) % self.cap;
        self.len -= 1;
        Some(value)
    }

    /// Remove and return the back element
    pub fn pop_back(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: the old back slot holds a live element; it moves out.
        Some(unsafe { self.slot(self.len).read() })
    }

    /// Borrow element `i`, `None` when out of range
    pub fn get(&self, i: usize) -> Option<&T> {
        if i < self.len {
            // SAFETY: in-range slots hold live elements.
            Some(unsafe { &*self.slot(i) })
        } else {
            None
        }
    }

    /// Mutably borrow element `i`
    pub fn get_mut(&mut self, i: usize) -> Option<&mut T> {
        if i < self.len {
            // SAFETY: in-range slots hold live elements.
            Some(unsafe { &mut *self.slot(i) })
        } else {
            None
        }
    }

    /// Borrow element `i`, erroring when out of range
    pub fn at(&self, i: usize) -> Result<&T> {
        self.get(i).ok_or(Error::OutOfRange)
    }

    /// Borrow the front element
    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    /// Borrow the back element
    pub fn back(&self) -> Option<&T> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    /// Drop all elements, keeping the buffer
    pub fn clear(&mut self) {
        for i in 0..self.len {
            // SAFETY: each in-range slot holds a live element, dropped
            // exactly once.
            unsafe { core::ptr::drop_in_place(self.slot(i)) };
        }
        self.len = 0;
        self.front = 0;
    }

    /// Grow until at least `additional` more elements fit
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let needed = self.len.checked_add(additional).ok_or(Error::BadAlloc)?;
        while self.cap < needed {
            self.grow()?;
        }
        Ok(())
    }

    /// Reallocate down to exactly `len` slots
    pub fn shrink_to_fit(&mut self) -> Result<()> {
        if self.len == self.cap {
            return Ok(());
        }
        self.reallocate(self.len)
    }

    /// Iterate front to back
    pub fn iter(&self) -> Iter<'_, T, A> {
        Iter { deque: self, i: 0 }
    }

    /// Deep copy using the same allocator
    pub fn try_clone(&self) -> Result<Self>
    where
        T: Clone,
    {
        let mut out = Self::new(self.alloc);
        for v in self.iter() {
            out.push_back(v.clone())?;
        }
        Ok(out)
    }
}

impl<T, A: RawAlloc + Copy> Drop for Deque<T, A> {
    fn drop(&mut self) {
        self.clear();
        if let Some(buf) = self.buf.take() {
            // SAFETY: clear dropped every element.
            unsafe { free_buffer(&self.alloc, buf) };
        }
    }
}

impl<T, A: RawAlloc + Copy> core::ops::Index<usize> for Deque<T, A> {
    type Output = T;

    fn index(&self, i: usize) -> &T {
        match self.get(i) {
            Some(v) => v,
            None => panic!("deque index {} out of range (len {})", i, self.len),
        }
    }
}

impl<T: PartialEq, A: RawAlloc + Copy, B: RawAlloc + Copy> PartialEq<Deque<T, B>> for Deque<T, A> {
    fn eq(&self, other: &Deque<T, B>) -> bool {
        self.len == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

/// Front-to-back borrowing iterator
pub struct Iter<'a, T, A: RawAlloc + Copy> {
    deque: &'a Deque<T, A>,
    i: usize,
}

impl<'a, T, A: RawAlloc + Copy> Iterator for Iter<'a, T, A> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let item = self.deque.get(self.i)?;
        self.i += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.deque.len() - self.i;
        (rest, Some(rest))
    }
}

impl<'a, T, A: RawAlloc + Copy> IntoIterator for &'a Deque<T, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, A>;

    fn into_iter(self) -> Iter<'a, T, A> {
        self.iter()
    }
}

//! Fixed-capacity in-object deque

use avril_core::{Error, Result};
use core::mem::MaybeUninit;

/// Ring-buffer deque with `N` slots embedded in the object
///
/// Same interface as [`crate::Deque`] but no allocator and no growth:
/// an operation that would exceed `N` elements returns
/// [`Error::LengthError`] and leaves the container untouched.
pub struct StaticDeque<T, const N: usize> {
    items: [MaybeUninit<T>; N],
    front: usize,
    len: usize,
}

impl<T, const N: usize> StaticDeque<T, N> {
    /// Create an empty deque
    pub const fn new() -> Self {
        Self {
            // SAFETY: an array of MaybeUninit needs no initialisation.
            items: unsafe { MaybeUninit::uninit().assume_init() },
            front: 0,
            len: 0,
        }
    }

    /// Build from a slice, cloning the elements
    pub fn from_slice(items: &[T]) -> Result<Self>
    where
        T: Clone,
    {
        let mut out = Self::new();
        for v in items {
            out.push_back(v.clone())?;
        }
        Ok(out)
    }

    /// Compile-time capacity
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of stored elements
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Check for emptiness
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check for fullness
    pub const fn is_full(&self) -> bool {
        self.len == N
    }

    /// Pointer to logical slot `i`; requires `i < len`
    fn slot(&self, i: usize) -> *const T {
        debug_assert!(i < self.len);
        self.items[(self.front + i) % N].as_ptr()
    }

    /// Mutable pointer to logical slot `i`; requires `i < len`
    fn slot_mut(&mut self, i: usize) -> *mut T {
        debug_assert!(i < self.len);
        self.items[(self.front + i) % N].as_mut_ptr()
    }

    /// Append at the back
    pub fn push_back(&mut self, value: T) -> Result<()> {
        if self.len == N {
            return Err(Error::LengthError);
        }
        self.items[(self.front + self.len) % N].write(value);
        self.len += 1;
        Ok(())
    }

    /// Prepend at the front
    pub fn push_front(&mut self, value: T) -> Result<()> {
        if self.len == N {
            return Err(Error::LengthError);
        }
        self.front = (self.front + N - 1) % N;
        self.items[self.front].write(value);
        self.len += 1;
        Ok(())
    }

    /// Remove and return the front element
    pub fn pop_front(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        // SAFETY: the front slot holds a live element; it moves out.
        let value = unsafe { self.items[self.front].assume_init_read() };
        self.front = (self.front + 1) % N;
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
        Some(unsafe { self.items[(self.front + self.len) % N].assume_init_read() })
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
            Some(unsafe { &mut *self.slot_mut(i) })
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

    /// Drop all elements
    pub fn clear(&mut self) {
        while self.pop_front().is_some() {}
        self.front = 0;
    }

    /// Replace the contents with `n` clones of `value`
    pub fn assign(&mut self, n: usize, value: T) -> Result<()>
    where
        T: Clone,
    {
        if n > N {
            return Err(Error::LengthError);
        }
        self.clear();
        for _ in 0..n {
            self.push_back(value.clone())?;
        }
        Ok(())
    }

    /// Replace the contents with the items of an iterator
    pub fn assign_from<I: IntoIterator<Item = T>>(&mut self, items: I) -> Result<()> {
        self.clear();
        for v in items {
            self.push_back(v)?;
        }
        Ok(())
    }

    /// Grow or shrink to exactly `n` elements, filling with `value`
    pub fn resize(&mut self, n: usize, value: T) -> Result<()>
    where
        T: Clone,
    {
        if n > N {
            return Err(Error::LengthError);
        }
        while self.len > n {
            drop(self.pop_back());
        }
        while self.len < n {
            self.push_back(value.clone())?;
        }
        Ok(())
    }

    /// Iterate front to back
    pub fn iter(&self) -> Iter<'_, T, N> {
        Iter { deque: self, i: 0 }
    }
}

impl<T, const N: usize> Drop for StaticDeque<T, N> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T, const N: usize> Default for StaticDeque<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, const N: usize> Clone for StaticDeque<T, N> {
    fn clone(&self) -> Self {
        let mut out = Self::new();
        for v in self.iter() {
            // Cannot exceed N: the source fits in the same capacity.
            if out.push_back(v.clone()).is_err() {
                break;
            }
        }
        out
    }
}

impl<T, const N: usize> core::ops::Index<usize> for StaticDeque<T, N> {
    type Output = T;

    fn index(&self, i: usize) -> &T {
        match self.get(i) {
            Some(v) => v,
            None => panic!("deque index {} out of range (len {})", i, self.len),
        }
    }
}

impl<T: PartialEq, const N: usize, const M: usize> PartialEq<StaticDeque<T, M>>
    for StaticDeque<T, N>
{
    fn eq(&self, other: &StaticDeque<T, M>) -> bool {
        self.len == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

/// Front-to-back borrowing iterator
pub struct Iter<'a, T, const N: usize> {
    deque: &'a StaticDeque<T, N>,
    i: usize,
}

impl<'a, T, const N: usize> Iterator for Iter<'a, T, N> {
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

impl<'a, T, const N: usize> IntoIterator for &'a StaticDeque<T, N> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, N>;

    fn into_iter(self) -> Iter<'a, T, N> {
        self.iter()
    }
}

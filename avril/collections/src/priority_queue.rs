//! Sorted-insert priority queue over a linked list

use crate::list::{Iter, List, Node};
use crate::slots::SlotStore;
use avril_core::Result;

/// Priority queue keeping its elements sorted on insertion
///
/// `less` is a pure strict-weak ordering on element values. `push`
/// walks front to back and inserts before the first element that the
/// new one is less than, so equal-priority elements keep their arrival
/// order and iteration is always non-decreasing under `less`.
pub struct PriorityQueue<T, S, F: Fn(&T, &T) -> bool> {
    list: List<T, S>,
    less: F,
}

impl<T, S, F: Fn(&T, &T) -> bool> PriorityQueue<T, S, F> {
    /// Create an empty queue over an existing slot arena
    pub const fn new_in(slots: S, less: F) -> Self {
        Self {
            list: List::new_in(slots),
            less,
        }
    }
}

impl<T, S: SlotStore<Node<T>>, F: Fn(&T, &T) -> bool> PriorityQueue<T, S, F> {
    /// Number of stored elements
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Check for emptiness
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Insert, keeping the sorted order
    ///
    /// Calls `less(new, existing)` once per visited element.
    pub fn push(&mut self, value: T) -> Result<()> {
        let mut cur = self.list.first();
        while let Some(at) = cur {
            if let Ok(existing) = self.list.get(at) {
                if (self.less)(&value, existing) {
                    self.list.insert_before(at, value)?;
                    return Ok(());
                }
            }
            cur = self.list.next(at);
        }
        self.list.push_back(value)
    }

    /// Borrow the highest-priority element
    pub fn top(&self) -> Option<&T> {
        self.list.front()
    }

    /// Remove and return the highest-priority element
    pub fn pop(&mut self) -> Option<T> {
        self.list.pop_front()
    }

    /// Drop every element
    pub fn clear(&mut self) {
        self.list.clear();
    }

    /// Iterate in non-decreasing priority order
    pub fn iter(&self) -> Iter<'_, T, S> {
        self.list.iter()
    }
}

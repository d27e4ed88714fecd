#![no_std]
#![forbid(unsafe_code)]

//! # Avril Scheduler
//!
//! Cooperative run-to-completion scheduler: a foreground loop calls
//! [`Scheduler::execute`] to drain due tasks while a periodic timer
//! ISR calls [`Scheduler::clock`] to expire delays. There is no
//! preemption and no time-slicing; a task runs to completion with
//! interrupts enabled and may schedule further tasks, including
//! itself.
//!
//! Delayed tasks live in a linked list ordered by firing time and
//! store *relative* delays: each entry's counter is the tick distance
//! to the entry in front of it, so `clock` only ever decrements the
//! front counter. When it reaches zero the task moves to the due FIFO
//! together with every immediately following zero-delta entry.
//!
//! All shared state sits behind a [`critical_section::Mutex`], so a
//! single `static` scheduler can be shared by foreground code and
//! ISRs. `clock` takes the [`CriticalSection`] token instead of
//! opening its own region; an ISR on the target runs with interrupts
//! already disabled and proves it by the token it was dispatched with.

use avril_alloc::RawAlloc;
use avril_collections::{
    ArenaSlots, Deque, FifoBuffer, InlineSlots, List, Node, SlotStore, StaticDeque,
};
use avril_core::{Result, Task, Ticks};
use core::cell::RefCell;
use critical_section::{CriticalSection, Mutex};

/// One delayed task and its tick distance to the entry in front
pub struct DelayEntry<T> {
    delta: Ticks,
    task: T,
}

struct Inner<T, D, Q> {
    delayed: List<DelayEntry<T>, D>,
    due: Q,
}

impl<T, D, Q> Inner<T, D, Q>
where
    D: SlotStore<Node<DelayEntry<T>>>,
    Q: FifoBuffer<T>,
{
    /// Relative-delay insertion into the delayed list
    ///
    /// Walks front to back subtracting each stored delta from the
    /// remaining delay; inserts before the first entry whose delta
    /// exceeds the remainder and reduces that entry's delta so the
    /// sum code stays intact. Equal firing times go after the
    /// existing entries, preserving schedule order.
    fn insert_delayed(&mut self, task: T, delay: Ticks) -> Result<()> {
        let mut remaining = delay;
        let mut cur = self.delayed.first();
        while let Some(at) = cur {
            let delta = match self.delayed.get(at) {
                Ok(entry) => entry.delta,
                Err(_) => break,
            };
            if delta > remaining {
                self.delayed.insert_before(
                    at,
                    DelayEntry {
                        delta: remaining,
                        task,
                    },
                )?;
                if let Ok(entry) = self.delayed.get_mut(at) {
                    entry.delta = delta.saturating_sub(remaining);
                }
                return Ok(());
            }
            remaining = remaining.saturating_sub(delta);
            cur = self.delayed.next(at);
        }
        self.delayed.push_back(DelayEntry {
            delta: remaining,
            task,
        })
    }

    /// Move the expired front prefix of the delayed list to the due
    /// FIFO
    ///
    /// Stops early when the due FIFO has no room; the remaining
    /// zero-delta entries stay delayed and the next tick retries.
    fn promote_due(&mut self) {
        while let Some(front) = self.delayed.first() {
            match self.delayed.get(front) {
                Ok(entry) if entry.delta.is_zero() => {}
                _ => break,
            }
            if self.due.reserve_back().is_err() {
                break;
            }
            if let Ok(entry) = self.delayed.remove_at(front) {
                // Cannot fail: room was reserved above.
                let _ = self.due.push_back(entry.task);
            }
        }
    }
}

/// Cooperative scheduler over a delayed list and a due FIFO
///
/// `D` is the slot arena backing the delayed list and `Q` the FIFO of
/// due tasks; [`StaticScheduler`] and [`HeapScheduler`] pick the two
/// standard pairings.
pub struct Scheduler<T, D, Q> {
    inner: Mutex<RefCell<Inner<T, D, Q>>>,
}

/// Scheduler with `N` delayed slots and `N` due slots in the object
pub type StaticScheduler<T, const N: usize> =
    Scheduler<T, InlineSlots<Node<DelayEntry<T>>, N>, StaticDeque<T, N>>;

/// Scheduler growing both queues out of a byte allocator
pub type HeapScheduler<T, A> = Scheduler<T, ArenaSlots<Node<DelayEntry<T>>, A>, Deque<T, A>>;

impl<T, const N: usize> StaticScheduler<T, N> {
    /// Create an empty fixed-capacity scheduler
    pub const fn new() -> Self {
        Scheduler::new_in(InlineSlots::new(), StaticDeque::new())
    }
}

impl<T, const N: usize> Default for StaticScheduler<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: RawAlloc + Copy> HeapScheduler<T, A> {
    /// Create an empty scheduler allocating from `alloc`
    pub const fn with_alloc(alloc: A) -> Self {
        Scheduler::new_in(ArenaSlots::new(alloc), Deque::new(alloc))
    }
}

impl<T, D, Q> Scheduler<T, D, Q> {
    /// Create a scheduler over existing backing stores
    pub const fn new_in(delayed_store: D, due: Q) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                delayed: List::new_in(delayed_store),
                due,
            })),
        }
    }
}

impl<T, D, Q> Scheduler<T, D, Q>
where
    T: Task,
    D: SlotStore<Node<DelayEntry<T>>>,
    Q: FifoBuffer<T>,
{
    /// Submit a task to run after `delay` ticks
    ///
    /// A zero delay makes the task due immediately; it runs on a
    /// following [`execute`](Self::execute) call, never inside this
    /// one. Callable from tasks and from ISRs.
    pub fn schedule(&self, task: T, delay: Ticks) -> Result<()> {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            if delay.is_zero() {
                inner.due.push_back(task)
            } else {
                inner.insert_delayed(task, delay)
            }
        })
    }

    /// Advance time by one tick
    ///
    /// Decrements the front delay once; on expiry the front task and
    /// every immediately following zero-delta entry move to the due
    /// FIFO. The token restricts callers to contexts where interrupts
    /// are already out of the way, normally the timer ISR.
    pub fn clock(&self, cs: CriticalSection<'_>) {
        let mut inner = self.inner.borrow_ref_mut(cs);
        let Some(front) = inner.delayed.first() else {
            return;
        };
        let expired = match inner.delayed.get_mut(front) {
            Ok(entry) => {
                entry.delta.decrement();
                entry.delta.is_zero()
            }
            Err(_) => false,
        };
        if expired {
            inner.promote_due();
        }
    }

    /// Run the next due task, if any
    ///
    /// The task is taken out of the due FIFO inside a critical
    /// section but runs outside it, so `clock` and re-entrant
    /// `schedule` calls interleave freely with the task body. Returns
    /// false when nothing was due.
    pub fn execute(&self) -> bool {
        let task = critical_section::with(|cs| self.inner.borrow_ref_mut(cs).due.pop_front());
        match task {
            Some(mut task) => {
                task.run();
                true
            }
            None => false,
        }
    }

    /// Number of tasks still waiting on their delay
    pub fn pending(&self) -> usize {
        critical_section::with(|cs| self.inner.borrow_ref(cs).delayed.len())
    }

    /// Number of tasks due but not yet executed
    pub fn due_len(&self) -> usize {
        critical_section::with(|cs| self.inner.borrow_ref(cs).due.len())
    }

    #[cfg(test)]
    fn deltas(&self) -> heapless::Vec<u16, 16> {
        critical_section::with(|cs| {
            self.inner
                .borrow_ref(cs)
                .delayed
                .iter()
                .map(|entry| entry.delta.get())
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    #[derive(Clone, Copy)]
    struct Noop;

    impl Task for Noop {
        fn run(&mut self) {}
    }

    #[test]
    fn stored_delays_are_relative() {
        let sched: StaticScheduler<Noop, 8> = StaticScheduler::new();
        sched.schedule(Noop, Ticks::new(12)).unwrap();
        sched.schedule(Noop, Ticks::new(23)).unwrap();
        sched.schedule(Noop, Ticks::new(23)).unwrap();
        sched.schedule(Noop, Ticks::new(34)).unwrap();
        sched.schedule(Noop, Ticks::new(23)).unwrap();
        assert_eq!(sched.deltas()[..], [12, 11, 0, 0, 11]);
    }

    #[test]
    fn earlier_insert_reduces_the_displaced_delta() {
        let sched: StaticScheduler<Noop, 8> = StaticScheduler::new();
        sched.schedule(Noop, Ticks::new(10)).unwrap();
        sched.schedule(Noop, Ticks::new(4)).unwrap();
        assert_eq!(sched.deltas()[..], [4, 6]);
        sched.schedule(Noop, Ticks::new(7)).unwrap();
        assert_eq!(sched.deltas()[..], [4, 3, 3]);
    }

    #[test]
    fn zero_delay_skips_the_delayed_list() {
        let sched: StaticScheduler<Noop, 4> = StaticScheduler::new();
        sched.schedule(Noop, Ticks::ZERO).unwrap();
        assert_eq!(sched.pending(), 0);
        assert_eq!(sched.due_len(), 1);
        assert!(sched.execute());
        assert!(!sched.execute());
    }

    struct Counting<'a>(&'a Cell<u8>);

    impl Task for Counting<'_> {
        fn run(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn list_backed_due_queue_keeps_every_task() {
        use avril_collections::StaticList;

        let ran = Cell::new(0u8);
        let sched: Scheduler<
            Counting<'_>,
            InlineSlots<Node<DelayEntry<Counting<'_>>>, 4>,
            StaticList<Counting<'_>, 1>,
        > = Scheduler::new_in(InlineSlots::new(), StaticList::new());
        sched.schedule(Counting(&ran), Ticks::new(1)).unwrap();
        sched.schedule(Counting(&ran), Ticks::new(1)).unwrap();

        critical_section::with(|cs| sched.clock(cs));
        // Only one expired task fits in the due list; the other waits.
        assert_eq!(sched.due_len(), 1);
        assert_eq!(sched.pending(), 1);

        while sched.execute() {}
        critical_section::with(|cs| sched.clock(cs));
        assert_eq!(sched.pending(), 0);
        assert!(sched.execute());
        assert_eq!(ran.get(), 2);
    }

    #[test]
    fn full_due_fifo_retries_on_a_later_tick() {
        let ran = Cell::new(0u8);
        let sched: StaticScheduler<Counting<'_>, 4> = StaticScheduler::new();
        for _ in 0..4 {
            sched.schedule(Counting(&ran), Ticks::ZERO).unwrap();
        }
        sched.schedule(Counting(&ran), Ticks::new(1)).unwrap();
        sched.schedule(Counting(&ran), Ticks::new(1)).unwrap();
        assert_eq!(sched.deltas()[..], [1, 0]);

        critical_section::with(|cs| sched.clock(cs));
        // The due FIFO is full, so both expired entries stay delayed.
        assert_eq!(sched.pending(), 2);
        assert_eq!(sched.deltas()[..], [0, 0]);

        assert!(sched.execute());
        critical_section::with(|cs| sched.clock(cs));
        assert_eq!(sched.pending(), 1);
        assert_eq!(sched.due_len(), 4);

        while sched.execute() {}
        critical_section::with(|cs| sched.clock(cs));
        assert!(sched.execute());
        assert_eq!(sched.pending(), 0);
        assert_eq!(ran.get(), 6);
    }
}

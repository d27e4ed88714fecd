//! End-to-end scheduler behaviour through the public API

use avril_alloc::Heap;
use avril_core::{Task, Ticks};
use avril_sched::{HeapScheduler, StaticScheduler};
use core::cell::{Cell, RefCell};

type Log = RefCell<heapless::Vec<u8, 16>>;

struct IdTask<'a> {
    id: u8,
    log: &'a Log,
}

impl Task for IdTask<'_> {
    fn run(&mut self) {
        self.log.borrow_mut().push(self.id).unwrap();
    }
}

fn tick<T: Task, D, Q>(sched: &avril_sched::Scheduler<T, D, Q>)
where
    D: avril_collections::SlotStore<avril_collections::Node<avril_sched::DelayEntry<T>>>,
    Q: avril_collections::FifoBuffer<T>,
{
    critical_section::with(|cs| sched.clock(cs));
}

#[test]
fn mixed_delays_run_in_firing_order() {
    let log: Log = RefCell::new(heapless::Vec::new());
    let sched: StaticScheduler<IdTask<'_>, 16> = StaticScheduler::new();

    for (id, delay) in [
        (4u8, 12u16),
        (1, 0),
        (5, 23),
        (6, 23),
        (2, 0),
        (9, 34),
        (7, 23),
        (3, 0),
        (8, 23),
    ] {
        sched.schedule(IdTask { id, log: &log }, Ticks::new(delay)).unwrap();
    }

    for _ in 0..40 {
        tick(&sched);
        sched.execute();
    }
    while sched.execute() {}

    assert_eq!(log.borrow()[..], [1, 2, 3, 4, 5, 6, 7, 8, 9]);
    assert_eq!(sched.pending(), 0);
    assert_eq!(sched.due_len(), 0);
}

struct Stamp<'a> {
    delay: u16,
    now: &'a Cell<u16>,
    log: &'a RefCell<heapless::Vec<(u16, u16), 8>>,
}

impl Task for Stamp<'_> {
    fn run(&mut self) {
        self.log.borrow_mut().push((self.delay, self.now.get())).unwrap();
    }
}

#[test]
fn every_task_fires_after_exactly_its_delay() {
    let now = Cell::new(0u16);
    let log = RefCell::new(heapless::Vec::new());
    let sched: StaticScheduler<Stamp<'_>, 8> = StaticScheduler::new();

    for delay in [5u16, 2, 9, 2, 7] {
        sched
            .schedule(
                Stamp {
                    delay,
                    now: &now,
                    log: &log,
                },
                Ticks::new(delay),
            )
            .unwrap();
    }

    for _ in 0..9 {
        now.set(now.get() + 1);
        tick(&sched);
        while sched.execute() {}
    }

    let log = log.borrow();
    assert_eq!(log.len(), 5);
    for &(delay, fired_at) in log.iter() {
        assert_eq!(delay, fired_at);
    }
    // Equal delays ran in schedule order: both delay-2 stamps are
    // adjacent and precede the rest.
    assert_eq!(log[0].0, 2);
    assert_eq!(log[1].0, 2);
}

// Tasks that reschedule need a scheduler they can name, so this pair
// lives in statics the way firmware would set them up.
static CHAIN_SCHED: StaticScheduler<Chain, 8> = StaticScheduler::new();
static CHAIN_LOG: std::sync::Mutex<Vec<u8>> = std::sync::Mutex::new(Vec::new());

struct Chain {
    n: u8,
}

impl Task for Chain {
    fn run(&mut self) {
        CHAIN_LOG.lock().unwrap().push(self.n);
        if self.n < 3 {
            CHAIN_SCHED
                .schedule(Chain { n: self.n + 1 }, Ticks::ZERO)
                .unwrap();
        }
    }
}

#[test]
fn tasks_may_schedule_their_successors() {
    CHAIN_SCHED.schedule(Chain { n: 0 }, Ticks::ZERO).unwrap();

    // A zero-delay successor is visible to the very next execute.
    let mut sweeps = 0;
    while CHAIN_SCHED.execute() {
        sweeps += 1;
    }
    assert_eq!(sweeps, 4);
    assert_eq!(CHAIN_LOG.lock().unwrap()[..], [0, 1, 2, 3]);
}

#[test]
fn heap_backed_scheduler_behaves_identically() {
    static HEAP: Heap<1024> = Heap::new();
    let log: Log = RefCell::new(heapless::Vec::new());
    let sched: HeapScheduler<IdTask<'_>, &Heap<1024>> = HeapScheduler::with_alloc(&HEAP);

    sched.schedule(IdTask { id: 2, log: &log }, Ticks::new(3)).unwrap();
    sched.schedule(IdTask { id: 1, log: &log }, Ticks::new(1)).unwrap();
    sched.schedule(IdTask { id: 3, log: &log }, Ticks::new(3)).unwrap();
    assert_eq!(sched.pending(), 3);

    for _ in 0..3 {
        tick(&sched);
        while sched.execute() {}
    }
    assert_eq!(log.borrow()[..], [1, 2, 3]);
}

//! Containers running over the shared heap singleton

use avril_alloc::Heap;
use avril_collections::{Deque, HeapForwardList, HeapList, StaticForwardList};

static HEAP: Heap<2048> = Heap::new();

#[test]
fn deque_grows_and_keeps_order() {
    let mut dq: Deque<u32, &Heap<2048>> = Deque::new(&HEAP);
    assert_eq!(dq.capacity(), 0);
    for v in 0..40u32 {
        dq.push_back(v).unwrap();
    }
    assert!(dq.capacity() >= 40);
    for v in 0..40u32 {
        assert_eq!(dq.pop_front(), Some(v));
    }
    assert!(dq.is_empty());
}

#[test]
fn deque_push_front_wraps() {
    let mut dq: Deque<u8, &Heap<2048>> = Deque::new(&HEAP);
    dq.push_back(2).unwrap();
    dq.push_front(1).unwrap();
    dq.push_back(3).unwrap();
    assert_eq!(dq[0], 1);
    assert_eq!(dq[1], 2);
    assert_eq!(dq[2], 3);
}

#[test]
fn shrink_to_fit_releases_spare_slots() {
    let mut dq: Deque<u8, &Heap<2048>> = Deque::new(&HEAP);
    for v in 0..9u8 {
        dq.push_back(v).unwrap();
    }
    let grown = dq.capacity();
    assert!(grown > 9);
    dq.shrink_to_fit().unwrap();
    assert_eq!(dq.capacity(), 9);
    assert!(dq.iter().copied().eq(0..9));
}

#[test]
fn try_clone_is_an_independent_copy() {
    let mut a: Deque<u8, &Heap<2048>> = Deque::new(&HEAP);
    a.push_back(1).unwrap();
    a.push_back(2).unwrap();
    let mut b = a.try_clone().unwrap();
    b.push_back(3).unwrap();
    assert_eq!(a.len(), 2);
    assert_eq!(b.len(), 3);
    assert!(a != b);
}

#[test]
fn heap_list_round_trip() {
    let mut list: HeapList<u16, &Heap<2048>> = HeapList::with_alloc(&HEAP);
    for v in [10u16, 20, 30, 40] {
        list.push_back(v).unwrap();
    }
    list.reverse();
    assert!(list.iter().eq([40, 30, 20, 10].iter()));
    while list.pop_front().is_some() {}
    assert!(list.is_empty());
}

#[test]
fn moving_a_container_does_not_allocate() {
    // Private heap so the counters are not shared with other tests.
    static MOVE_HEAP: Heap<256> = Heap::new();
    let mut l1: HeapList<u8, &Heap<256>> = HeapList::with_alloc(&MOVE_HEAP);
    l1.push_back(1).unwrap();
    l1.push_back(2).unwrap();

    let before = MOVE_HEAP.allocations();
    let l2 = l1;
    assert_eq!(MOVE_HEAP.allocations(), before);
    assert!(l2.iter().eq([1, 2].iter()));
}

#[test]
fn splice_between_storage_strategies() {
    let mut heap_list: HeapForwardList<u8, &Heap<2048>> = HeapForwardList::with_alloc(&HEAP);
    let mut inline: StaticForwardList<u8, 4> = StaticForwardList::new();
    heap_list.push_front(20).unwrap();
    heap_list.push_front(10).unwrap();
    inline.push_front(3).unwrap();
    inline.push_front(2).unwrap();
    inline.push_front(1).unwrap();

    heap_list
        .splice_after(heap_list.before_begin(), &mut inline)
        .unwrap();
    assert!(heap_list.iter().eq([1, 2, 3, 10, 20].iter()));
    assert!(inline.is_empty());
}

#[test]
fn drop_returns_memory_to_the_heap() {
    static LOCAL: Heap<512> = Heap::new();
    let free_before = LOCAL.free_bytes();
    {
        let mut dq: Deque<u8, &Heap<512>> = Deque::new(&LOCAL);
        for v in 0..50u8 {
            dq.push_back(v).unwrap();
        }
        assert!(LOCAL.free_bytes() < free_before);
    }
    assert_eq!(LOCAL.free_bytes(), free_before);
}

//! Tests for the SPSC ring buffer

use std::sync::Arc;
use std::thread;

use super::RingBuffer;

#[test]
fn test_capacity_rounds_up_to_power_of_two() {
    assert_eq!(RingBuffer::<u32>::new(1024).capacity(), 1024);
    assert_eq!(RingBuffer::<u32>::new(1000).capacity(), 1024);
    assert_eq!(RingBuffer::<u32>::new(100_000).capacity(), 131_072);
    assert_eq!(RingBuffer::<u32>::new(0).capacity(), 1);
}

#[test]
fn test_push_pop_fifo() {
    let buf = RingBuffer::new(8);
    for i in 0..5 {
        buf.try_push(i).expect("push");
    }
    assert_eq!(buf.len(), 5);

    for i in 0..5 {
        assert_eq!(buf.try_pop(), Some(i));
    }
    assert_eq!(buf.try_pop(), None);
    assert!(buf.is_empty());
}

#[test]
fn test_push_fails_when_full() {
    let buf = RingBuffer::new(4);
    for i in 0..4 {
        buf.try_push(i).expect("push");
    }
    assert_eq!(buf.len(), buf.capacity());
    assert_eq!(buf.try_push(99), Err(99));

    // One pop frees one slot.
    assert_eq!(buf.try_pop(), Some(0));
    assert!(buf.try_push(99).is_ok());
}

#[test]
fn test_pop_batch_transfers_in_order() {
    let buf = RingBuffer::new(16);
    for i in 0..10 {
        buf.try_push(i).expect("push");
    }

    let mut out = Vec::new();
    assert_eq!(buf.pop_batch(&mut out, 4), 4);
    assert_eq!(out, vec![0, 1, 2, 3]);

    // Appends to existing contents.
    assert_eq!(buf.pop_batch(&mut out, 100), 6);
    assert_eq!(out, (0..10).collect::<Vec<_>>());

    assert_eq!(buf.pop_batch(&mut out, 100), 0);
}

#[test]
fn test_pop_batch_zero_max() {
    let buf = RingBuffer::new(4);
    buf.try_push(1).expect("push");

    let mut out = Vec::new();
    assert_eq!(buf.pop_batch(&mut out, 0), 0);
    assert!(out.is_empty());
    assert_eq!(buf.len(), 1);
}

#[test]
fn test_wraparound_preserves_order() {
    let buf = RingBuffer::new(4);
    let mut out = Vec::new();

    // Cycle far past capacity so the cursors wrap the slot array many times.
    for round in 0u64..100 {
        for i in 0..3 {
            buf.try_push(round * 3 + i).expect("push");
        }
        out.clear();
        assert_eq!(buf.pop_batch(&mut out, 3), 3);
        assert_eq!(out, vec![round * 3, round * 3 + 1, round * 3 + 2]);
    }
    assert!(buf.is_empty());
}

#[test]
fn test_drop_releases_remaining_items() {
    let item = Arc::new(());
    {
        let buf = RingBuffer::new(8);
        for _ in 0..5 {
            buf.try_push(Arc::clone(&item)).expect("push");
        }
        assert_eq!(Arc::strong_count(&item), 6);
    }
    assert_eq!(Arc::strong_count(&item), 1);
}

#[test]
fn test_spsc_threads_preserve_fifo() {
    const TOTAL: u64 = 1_000_000;

    let buf = Arc::new(RingBuffer::new(1024));

    let producer = {
        let buf = Arc::clone(&buf);
        thread::spawn(move || {
            let mut next = 0u64;
            while next < TOTAL {
                if buf.try_push(next).is_ok() {
                    next += 1;
                } else {
                    thread::yield_now();
                }
            }
        })
    };

    let consumer = {
        let buf = Arc::clone(&buf);
        thread::spawn(move || {
            let mut expected = 0u64;
            let mut batch = Vec::with_capacity(256);
            while expected < TOTAL {
                batch.clear();
                let popped = buf.pop_batch(&mut batch, 256);
                if popped == 0 {
                    thread::yield_now();
                    continue;
                }
                for &value in &batch {
                    assert_eq!(value, expected, "out-of-order item");
                    expected += 1;
                }
            }
            expected
        })
    };

    producer.join().expect("producer");
    let consumed = consumer.join().expect("consumer");
    assert_eq!(consumed, TOTAL);
    assert!(buf.is_empty());
}

#[test]
fn test_spsc_threads_mixed_pop_modes() {
    const TOTAL: u64 = 100_000;

    let buf = Arc::new(RingBuffer::new(256));

    let producer = {
        let buf = Arc::clone(&buf);
        thread::spawn(move || {
            let mut next = 0u64;
            while next < TOTAL {
                if buf.try_push(next).is_ok() {
                    next += 1;
                }
            }
        })
    };

    let mut expected = 0u64;
    let mut batch = Vec::new();
    while expected < TOTAL {
        // Alternate single pops with batch pops to cover both consumer paths.
        if expected % 2 == 0 {
            if let Some(value) = buf.try_pop() {
                assert_eq!(value, expected);
                expected += 1;
            }
        } else {
            batch.clear();
            buf.pop_batch(&mut batch, 64);
            for value in batch.drain(..) {
                assert_eq!(value, expected);
                expected += 1;
            }
        }
    }

    producer.join().expect("producer");
}

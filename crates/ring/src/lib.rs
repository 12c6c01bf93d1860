//! Sluice - SPSC ring buffer
//!
//! A wait-free bounded queue specialized for exactly one producer thread and
//! one consumer thread. The stream reader owns the producer end of every
//! buffer; each writer thread owns the consumer end of its own buffer.
//!
//! # Design
//!
//! - Capacity is rounded up to a power of two so slot indexing is a mask.
//! - `head` and `tail` are monotonically increasing cursors; occupancy is
//!   `head - tail`, full is `head - tail == capacity`. Every slot is usable.
//! - The cursors live on separate cache lines (`CachePadded`) so the
//!   producer and consumer do not false-share.
//! - `pop_batch` is the hot path: it transfers up to `max` items with a
//!   single release-store of `tail`.
//!
//! # Memory ordering
//!
//! The producer's slot writes happen-before the consumer's reads of those
//! slots: the producer release-stores `head` after writing a slot, the
//! consumer acquire-loads `head` before reading. The same pairing protects
//! slot reuse in the other direction through `tail`. Each side may load its
//! own cursor relaxed because it is the only thread that stores it.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

/// Lock-free single-producer single-consumer ring buffer
pub struct RingBuffer<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: usize,

    /// Producer cursor: total items ever pushed
    head: CachePadded<AtomicUsize>,

    /// Consumer cursor: total items ever popped
    tail: CachePadded<AtomicUsize>,
}

// SAFETY: the buffer is shared between exactly one producer and one consumer.
// Slot contents are handed off through the release/acquire cursor pair, so a
// slot is never read and written concurrently. T itself crosses threads,
// hence the T: Send bound.
unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    /// Create a buffer with at least `capacity` slots.
    ///
    /// Capacity is rounded up to the next power of two (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            slots,
            mask: capacity - 1,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Try to push an item (producer side only).
    ///
    /// Returns the item back if the buffer is full. Never blocks, never
    /// allocates.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);

        if head.wrapping_sub(tail) == self.capacity() {
            return Err(item);
        }

        unsafe {
            (*self.slots[head & self.mask].get()).write(item);
        }
        self.head.store(head.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Try to pop a single item (consumer side only)
    pub fn try_pop(&self) -> Option<T> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        if head == tail {
            return None;
        }

        let item = unsafe { (*self.slots[tail & self.mask].get()).assume_init_read() };
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(item)
    }

    /// Pop up to `max` items into `out`, preserving FIFO order (consumer
    /// side only).
    ///
    /// Observes `head` once and publishes the new `tail` with a single
    /// store, so the per-item atomic cost amortizes across the batch.
    /// Returns the number of items transferred.
    pub fn pop_batch(&self, out: &mut Vec<T>, max: usize) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        let available = head.wrapping_sub(tail);
        let count = available.min(max);
        if count == 0 {
            return 0;
        }

        out.reserve(count);
        for i in 0..count {
            let slot = self.slots[tail.wrapping_add(i) & self.mask].get();
            out.push(unsafe { (*slot).assume_init_read() });
        }

        self.tail.store(tail.wrapping_add(count), Ordering::Release);
        count
    }

    /// Current occupancy. Advisory: may be stale by the time it returns.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }

    /// Whether the buffer is empty. Advisory, same as [`len`](Self::len).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slot count after power-of-two rounding
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        let head = *self.head.get_mut();
        let mut tail = *self.tail.get_mut();
        while tail != head {
            unsafe {
                (*self.slots[tail & self.mask].get()).assume_init_drop();
            }
            tail = tail.wrapping_add(1);
        }
    }
}

impl<T> std::fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "ring_test.rs"]
mod ring_test;

//! Round-robin fan-out across writer ring buffers
//!
//! The dispatcher owns a rotating index so load spreads evenly across
//! writers over time. When the preferred buffer is full it probes the
//! remaining buffers in rotation; only when every buffer is full does a
//! dispatch fail, which ends the current read round and lets the upstream
//! stream absorb the excess.

use std::sync::Arc;

use sluice_ring::RingBuffer;

/// Round-robin dispatcher over N ring buffers
#[derive(Debug, Default)]
pub struct Dispatcher {
    next: usize,
}

impl Dispatcher {
    /// Create a dispatcher starting at buffer 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to enqueue `item` into one of `buffers`.
    ///
    /// Starts at the rotating index and probes each buffer at most once.
    /// Returns `false` iff every buffer is full; the rotation state is
    /// preserved either way, so the next call resumes where this one left
    /// off.
    pub fn dispatch<T>(&mut self, buffers: &[Arc<RingBuffer<T>>], item: T) -> bool {
        let n = buffers.len();
        if n == 0 {
            return false;
        }

        let mut item = item;
        for probe in 0..n {
            let idx = (self.next + probe) % n;
            match buffers[idx].try_push(item) {
                Ok(()) => {
                    self.next = (idx + 1) % n;
                    return true;
                }
                Err(rejected) => item = rejected,
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffers(n: usize, capacity: usize) -> Vec<Arc<RingBuffer<u64>>> {
        (0..n).map(|_| Arc::new(RingBuffer::new(capacity))).collect()
    }

    #[test]
    fn test_round_robin_is_fair() {
        let bufs = buffers(4, 64);
        let mut dispatcher = Dispatcher::new();

        for i in 0..40 {
            assert!(dispatcher.dispatch(&bufs, i));
        }
        for buf in &bufs {
            assert_eq!(buf.len(), 10);
        }
    }

    #[test]
    fn test_uneven_counts_differ_by_at_most_one() {
        let bufs = buffers(3, 64);
        let mut dispatcher = Dispatcher::new();

        for i in 0..10 {
            assert!(dispatcher.dispatch(&bufs, i));
        }
        let counts: Vec<usize> = bufs.iter().map(|b| b.len()).collect();
        assert_eq!(counts.iter().sum::<usize>(), 10);
        for count in counts {
            assert!(count == 3 || count == 4);
        }
    }

    #[test]
    fn test_rotation_survives_across_calls() {
        let bufs = buffers(2, 64);
        let mut dispatcher = Dispatcher::new();

        dispatcher.dispatch(&bufs, 1);
        assert_eq!(bufs[0].len(), 1);

        // A fresh call continues the rotation instead of restarting at 0.
        dispatcher.dispatch(&bufs, 2);
        assert_eq!(bufs[1].len(), 1);
    }

    #[test]
    fn test_full_buffer_is_skipped() {
        let bufs = buffers(2, 2);
        let mut dispatcher = Dispatcher::new();

        // Fill buffer 0 completely.
        bufs[0].try_push(100).unwrap();
        bufs[0].try_push(101).unwrap();

        // Both dispatches land in buffer 1 even though rotation points at 0.
        assert!(dispatcher.dispatch(&bufs, 1));
        assert!(dispatcher.dispatch(&bufs, 2));
        assert_eq!(bufs[1].len(), 2);
    }

    #[test]
    fn test_all_full_fails_and_item_is_not_lost_upstream() {
        let bufs = buffers(2, 2);
        let mut dispatcher = Dispatcher::new();

        for i in 0..4 {
            assert!(dispatcher.dispatch(&bufs, i));
        }
        assert!(!dispatcher.dispatch(&bufs, 99));

        // Nothing was enqueued anywhere.
        assert_eq!(bufs[0].len() + bufs[1].len(), 4);
    }

    #[test]
    fn test_no_buffers() {
        let bufs: Vec<Arc<RingBuffer<u64>>> = Vec::new();
        let mut dispatcher = Dispatcher::new();
        assert!(!dispatcher.dispatch(&bufs, 1));
    }
}

//! Consumer-side counters
//!
//! Relaxed atomics; these are statistics, not synchronization.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters owned by the stream consumer
#[derive(Debug, Default)]
pub struct ConsumerStats {
    /// Messages successfully decoded and enqueued
    pub messages_read: AtomicU64,

    /// Messages whose payload failed to decode (skipped, left pending)
    pub parse_errors: AtomicU64,
}

impl ConsumerStats {
    /// Create a new counter block
    pub const fn new() -> Self {
        Self {
            messages_read: AtomicU64::new(0),
            parse_errors: AtomicU64::new(0),
        }
    }

    /// Record messages read and enqueued
    #[inline]
    pub fn record_read(&self, count: u64) {
        self.messages_read.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a payload decode failure
    #[inline]
    pub fn record_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time snapshot
    pub fn snapshot(&self) -> ConsumerSnapshot {
        ConsumerSnapshot {
            messages_read: self.messages_read.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of consumer counters
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsumerSnapshot {
    pub messages_read: u64,
    pub parse_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let stats = ConsumerStats::new();
        stats.record_read(10);
        stats.record_read(5);
        stats.record_parse_error();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.messages_read, 15);
        assert_eq!(snapshot.parse_errors, 1);
    }
}

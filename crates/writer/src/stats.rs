//! Writer-side counters
//!
//! Shared across all worker threads; relaxed atomics, statistics only.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters owned by the writer pool
#[derive(Debug, Default)]
pub struct WriterStats {
    /// Entries accepted by the database
    pub logs_written: AtomicU64,

    /// Batches accepted by the database
    pub batches_written: AtomicU64,

    /// Failed insert attempts (a batch exhausting its retry budget counts
    /// once per attempt)
    pub write_errors: AtomicU64,
}

impl WriterStats {
    /// Create a new counter block
    pub const fn new() -> Self {
        Self {
            logs_written: AtomicU64::new(0),
            batches_written: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
        }
    }

    /// Record entries accepted by the database
    #[inline]
    pub fn record_logs_written(&self, count: u64) {
        self.logs_written.fetch_add(count, Ordering::Relaxed);
    }

    /// Record one accepted batch
    #[inline]
    pub fn record_batch_written(&self) {
        self.batches_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one failed insert attempt
    #[inline]
    pub fn record_write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Entries written so far (used for the benchmark exit condition)
    #[inline]
    pub fn logs_written(&self) -> u64 {
        self.logs_written.load(Ordering::Relaxed)
    }

    /// Get a point-in-time snapshot
    pub fn snapshot(&self) -> WriterSnapshot {
        WriterSnapshot {
            logs_written: self.logs_written.load(Ordering::Relaxed),
            batches_written: self.batches_written.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of writer counters
#[derive(Debug, Clone, Copy, Default)]
pub struct WriterSnapshot {
    pub logs_written: u64,
    pub batches_written: u64,
    pub write_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let stats = WriterStats::new();
        stats.record_logs_written(10_000);
        stats.record_batch_written();
        stats.record_logs_written(500);
        stats.record_batch_written();
        stats.record_write_error();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.logs_written, 10_500);
        assert_eq!(snapshot.batches_written, 2);
        assert_eq!(snapshot.write_errors, 1);
        assert_eq!(stats.logs_written(), 10_500);
    }
}

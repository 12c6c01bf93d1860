//! Sluice - Writer Pool
//!
//! N worker threads, each pinned to one SPSC ring buffer and one ClickHouse
//! connection over the native protocol (LZ4 compressed). Workers accumulate
//! entries into a local batch, insert the batch as a single column-oriented
//! block, and hand the inserted entries' upstream ids to a flush callback so
//! the consumer can acknowledge them.
//!
//! # At-least-once
//!
//! The flush callback runs only after ClickHouse accepted the insert. A
//! batch that still fails after the retry budget is discarded *without*
//! acknowledgment, so the upstream queue re-delivers those messages. The
//! pipeline can duplicate under failure but never silently drops.
//!
//! # Worker loop
//!
//! ```text
//! pop_batch ──> batch full? ──> insert ──ok──> callback(ids) ──> clear
//!     │                           │
//!     │ empty pop                 └─err──> reconnect, 500ms, retry (×3)
//!     └──> 1ms sleep, flush partial batch
//! ```

mod columns;
mod error;
mod pool;
mod stats;

pub use error::WriterError;
pub use pool::{FlushCallback, WriterConfig, WriterPool, DEFAULT_RETRY_ATTEMPTS};
pub use stats::{WriterSnapshot, WriterStats};

/// Result type for writer operations
pub type Result<T> = std::result::Result<T, WriterError>;

//! Writer error types

use thiserror::Error;

/// Errors from starting the writer pool.
///
/// Insert and connection failures during operation are handled inside the
/// worker threads (retry, reconnect, discard) and surface only as counters
/// and log lines.
#[derive(Debug, Error)]
pub enum WriterError {
    /// One ring buffer per writer thread is required
    #[error("buffer count ({buffers}) does not match writer threads ({threads})")]
    BufferCount {
        /// Ring buffers supplied
        buffers: usize,
        /// Writer threads configured
        threads: usize,
    },

    /// A worker's async runtime could not be built
    #[error("failed to build writer runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// A worker thread could not be spawned
    #[error("failed to spawn writer thread: {0}")]
    Spawn(#[source] std::io::Error),
}

//! Sluice - Stream Consumer
//!
//! Reads log messages from a Redis Stream through a consumer group, decodes
//! the `data` payload of each message, and fans the resulting entries out
//! round-robin into one SPSC ring buffer per writer thread.
//!
//! # Connections
//!
//! The consumer keeps two independent connections:
//!
//! - a **reader** connection, used only by the ingest thread for blocking
//!   `XREADGROUP` calls;
//! - a **writer** connection behind a mutex, used for consumer-group setup
//!   and `XACK` issued from the writer threads' flush callbacks.
//!
//! A single connection cannot interleave a long-blocking read with short ack
//! writes, so ack latency stays off the hot read path.
//!
//! # Delivery semantics
//!
//! Messages become *pending* for this consumer name when read and stay
//! pending until acknowledged. Acks are only issued after the database
//! accepted the insert, so a crash anywhere in between re-delivers via
//! [`StreamConsumer::recover_pending`]: at-least-once, never silent loss.

mod consumer;
mod dispatch;
mod error;
mod stats;

pub use consumer::{ConsumerConfig, StreamConsumer};
pub use dispatch::Dispatcher;
pub use error::ConsumerError;
pub use stats::{ConsumerSnapshot, ConsumerStats};

/// Result type for consumer operations
pub type Result<T> = std::result::Result<T, ConsumerError>;

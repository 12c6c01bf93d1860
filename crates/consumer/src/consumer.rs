//! Redis Streams consumer-group reader

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::{Commands, Connection};

use sluice_protocol::{decode_payload, LogEntry};
use sluice_ring::RingBuffer;

use crate::dispatch::Dispatcher;
use crate::error::ConsumerError;
use crate::stats::ConsumerStats;
use crate::Result;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the stream consumer
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Redis host
    pub host: String,

    /// Redis port
    pub port: u16,

    /// Stream key to read from
    pub stream_key: String,

    /// Consumer group name
    pub group_name: String,

    /// Consumer name within the group
    pub consumer_name: String,

    /// Maximum messages per read
    pub read_batch_size: usize,

    /// Blocking-read timeout in milliseconds
    pub block_ms: u64,

    /// When false, reads do not block (polling mode); the caller paces the
    /// loop instead
    pub blocking: bool,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 6379,
            stream_key: "logs:stream".into(),
            group_name: "log-processors".into(),
            consumer_name: "sluice".into(),
            read_batch_size: 1_000,
            block_ms: 100,
            blocking: true,
        }
    }
}

impl ConsumerConfig {
    /// Set the Redis address
    pub fn with_addr(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Set the stream key
    pub fn with_stream_key(mut self, key: impl Into<String>) -> Self {
        self.stream_key = key.into();
        self
    }

    /// Set group and consumer names
    pub fn with_group(
        mut self,
        group: impl Into<String>,
        consumer: impl Into<String>,
    ) -> Self {
        self.group_name = group.into();
        self.consumer_name = consumer.into();
        self
    }

    fn url(&self) -> String {
        format!("redis://{}:{}/", self.host, self.port)
    }
}

// =============================================================================
// Stream Consumer
// =============================================================================

/// Reader state: the blocking connection plus the fan-out rotation.
/// Touched only by the ingest thread; the mutex is uncontended.
struct ReaderState {
    conn: Option<Connection>,
    dispatcher: Dispatcher,
}

/// Consumer-group reader over a Redis Stream.
///
/// Shared as `Arc<StreamConsumer>`: the ingest thread drives
/// [`read_batch`](Self::read_batch) while writer threads call
/// [`ack_batch`](Self::ack_batch) from their flush callbacks.
pub struct StreamConsumer {
    config: ConsumerConfig,
    reader: Mutex<ReaderState>,
    writer: Mutex<Option<Connection>>,
    running: AtomicBool,
    stats: ConsumerStats,
}

impl StreamConsumer {
    /// Create an unconnected consumer
    pub fn new(config: ConsumerConfig) -> Self {
        Self {
            config,
            reader: Mutex::new(ReaderState {
                conn: None,
                dispatcher: Dispatcher::new(),
            }),
            writer: Mutex::new(None),
            running: AtomicBool::new(true),
            stats: ConsumerStats::new(),
        }
    }

    /// Open the reader and writer connections and ensure the consumer group
    /// exists (creating the stream if needed).
    pub fn connect(&self) -> Result<()> {
        let client = redis::Client::open(self.config.url().as_str())
            .map_err(ConsumerError::Connect)?;
        let reader = client.get_connection().map_err(ConsumerError::Connect)?;
        let writer = client.get_connection().map_err(ConsumerError::Connect)?;

        self.reader.lock().conn = Some(reader);
        *self.writer.lock() = Some(writer);

        self.ensure_consumer_group()?;

        tracing::info!(
            host = %self.config.host,
            port = self.config.port,
            stream = %self.config.stream_key,
            group = %self.config.group_name,
            consumer = %self.config.consumer_name,
            "connected to redis"
        );
        Ok(())
    }

    /// `XGROUP CREATE <key> <group> $ MKSTREAM`; an already-existing group is
    /// not an error.
    fn ensure_consumer_group(&self) -> Result<()> {
        let mut guard = self.writer.lock();
        let conn = guard.as_mut().ok_or(ConsumerError::NotConnected)?;

        let created: redis::RedisResult<String> = conn.xgroup_create_mkstream(
            &self.config.stream_key,
            &self.config.group_name,
            "$",
        );
        match created {
            Ok(_) => Ok(()),
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(ConsumerError::GroupSetup(e)),
        }
    }

    /// Read one batch of unseen messages and fan them out into `buffers`.
    ///
    /// Blocks up to `block_ms` when the stream is empty (unless in polling
    /// mode). Returns the number of entries enqueued; transport errors are
    /// logged and reported as 0 so the caller can retry.
    pub fn read_batch(&self, buffers: &[Arc<RingBuffer<LogEntry>>]) -> usize {
        self.read_with_cursor(">", true, buffers)
    }

    /// Re-fetch messages previously delivered to this consumer name but
    /// never acknowledged. Called once at startup for crash recovery.
    pub fn recover_pending(&self, buffers: &[Arc<RingBuffer<LogEntry>>]) -> usize {
        self.read_with_cursor("0", false, buffers)
    }

    fn read_with_cursor(
        &self,
        cursor: &str,
        allow_block: bool,
        buffers: &[Arc<RingBuffer<LogEntry>>],
    ) -> usize {
        let mut state = self.reader.lock();
        let state = &mut *state;
        let Some(conn) = state.conn.as_mut() else {
            tracing::warn!("stream read before connect");
            return 0;
        };

        let mut opts = StreamReadOptions::default()
            .group(&self.config.group_name, &self.config.consumer_name)
            .count(self.config.read_batch_size);
        if allow_block && self.config.blocking {
            opts = opts.block(self.config.block_ms as usize);
        }

        let reply: redis::RedisResult<Option<StreamReadReply>> =
            conn.xread_options(&[self.config.stream_key.as_str()], &[cursor], &opts);

        let reply = match reply {
            Ok(Some(reply)) => reply,
            Ok(None) => return 0,
            Err(e) => {
                tracing::warn!(error = %e, "stream read failed");
                return 0;
            }
        };

        let mut enqueued = 0usize;
        'streams: for stream in &reply.keys {
            for message in &stream.ids {
                let Some(data) = message.get::<String>("data") else {
                    self.stats.record_parse_error();
                    continue;
                };
                let entry = match decode_payload(&data, &message.id) {
                    Ok(entry) => entry,
                    Err(e) => {
                        // Skipped, never acked: the upstream copy stays
                        // pending and comes back through recovery.
                        tracing::debug!(id = %message.id, error = %e, "payload decode failed");
                        self.stats.record_parse_error();
                        continue;
                    }
                };

                if state.dispatcher.dispatch(buffers, entry) {
                    enqueued += 1;
                } else {
                    // Every ring buffer is full: end the round and let the
                    // stream absorb the rest.
                    tracing::debug!(enqueued, "all ring buffers full, ending read round");
                    break 'streams;
                }
            }
        }

        self.stats.record_read(enqueued as u64);
        enqueued
    }

    /// Acknowledge a set of message ids in one `XACK`.
    ///
    /// A transport error drops the ack: the messages stay pending and will
    /// be re-delivered, preserving at-least-once delivery.
    pub fn ack_batch(&self, ids: &[String]) {
        if ids.is_empty() {
            return;
        }

        let mut guard = self.writer.lock();
        let Some(conn) = guard.as_mut() else {
            return;
        };

        let acked: redis::RedisResult<u64> =
            conn.xack(&self.config.stream_key, &self.config.group_name, ids);
        if let Err(e) = acked {
            tracing::warn!(
                error = %e,
                count = ids.len(),
                "ack failed; messages remain pending"
            );
        }
    }

    /// Current stream length (`XLEN`), observational only
    pub fn stream_len(&self) -> Option<u64> {
        let mut guard = self.writer.lock();
        let conn = guard.as_mut()?;
        match conn.xlen(&self.config.stream_key) {
            Ok(len) => Some(len),
            Err(e) => {
                tracing::debug!(error = %e, "stream length query failed");
                None
            }
        }
    }

    /// Request cooperative termination
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Whether the consumer has been asked to keep running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Counter block for this consumer
    pub fn stats(&self) -> &ConsumerStats {
        &self.stats
    }

    /// Configuration this consumer was built with
    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ConsumerConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 6379);
        assert_eq!(config.stream_key, "logs:stream");
        assert_eq!(config.group_name, "log-processors");
        assert_eq!(config.read_batch_size, 1_000);
        assert_eq!(config.block_ms, 100);
        assert!(config.blocking);
    }

    #[test]
    fn test_config_builders() {
        let config = ConsumerConfig::default()
            .with_addr("redis.internal", 6380)
            .with_stream_key("logs:prod")
            .with_group("workers", "node-7");

        assert_eq!(config.host, "redis.internal");
        assert_eq!(config.port, 6380);
        assert_eq!(config.stream_key, "logs:prod");
        assert_eq!(config.group_name, "workers");
        assert_eq!(config.consumer_name, "node-7");
        assert_eq!(config.url(), "redis://redis.internal:6380/");
    }

    #[test]
    fn test_stop_clears_running() {
        let consumer = StreamConsumer::new(ConsumerConfig::default());
        assert!(consumer.is_running());
        consumer.stop();
        assert!(!consumer.is_running());
    }

    #[test]
    fn test_read_before_connect_returns_zero() {
        let consumer = StreamConsumer::new(ConsumerConfig::default());
        let buffers = vec![Arc::new(RingBuffer::new(16))];
        assert_eq!(consumer.read_batch(&buffers), 0);
        assert_eq!(consumer.recover_pending(&buffers), 0);
    }

    #[test]
    fn test_ack_before_connect_is_a_noop() {
        let consumer = StreamConsumer::new(ConsumerConfig::default());
        consumer.ack_batch(&["1-0".to_string()]);
        assert!(consumer.stream_len().is_none());
    }
}

//! Writer pool and per-thread flush loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use clickhouse_rs::{ClientHandle, Pool};

use sluice_protocol::LogEntry;
use sluice_ring::RingBuffer;

use crate::columns::{build_block, collect_ack_ids};
use crate::error::WriterError;
use crate::stats::WriterStats;
use crate::Result;

/// Insert attempts per batch before it is discarded
pub const DEFAULT_RETRY_ATTEMPTS: usize = 3;

/// Sleep between retry attempts
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Sleep when a ring buffer comes up empty; also the partial-batch flush
/// latency, so keep it small
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// Callback invoked with the upstream ids of an inserted batch
pub type FlushCallback = Arc<dyn Fn(&[String]) + Send + Sync>;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the writer pool
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// ClickHouse host
    pub host: String,

    /// Native protocol port
    pub port: u16,

    /// Database name
    pub database: String,

    /// Target table
    pub table: String,

    /// Username
    pub user: String,

    /// Password
    pub password: String,

    /// Entries per insert
    pub batch_size: usize,

    /// Worker thread count; must equal the number of ring buffers
    pub writer_threads: usize,

    /// Insert attempts per batch before discarding it
    pub retry_attempts: usize,

    /// Connection timeout for the native client
    pub connection_timeout: Duration,

    /// Timeout for a single insert round-trip
    pub insert_timeout: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 9000,
            database: "logs_db".into(),
            table: "logs".into(),
            user: "default".into(),
            password: String::new(),
            batch_size: 10_000,
            writer_threads: 4,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            connection_timeout: Duration::from_secs(5),
            insert_timeout: Duration::from_secs(5),
        }
    }
}

impl WriterConfig {
    /// Set the ClickHouse address
    pub fn with_addr(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Set database and table
    pub fn with_table(mut self, database: impl Into<String>, table: impl Into<String>) -> Self {
        self.database = database.into();
        self.table = table.into();
        self
    }

    /// Set authentication credentials
    pub fn with_credentials(
        mut self,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    /// Set the batch size
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the worker thread count
    pub fn with_writer_threads(mut self, threads: usize) -> Self {
        self.writer_threads = threads;
        self
    }

    /// Native-protocol URL for the client, one dedicated connection per
    /// worker (LZ4 compression on)
    pub fn database_url(&self) -> String {
        let auth = if self.password.is_empty() {
            self.user.clone()
        } else {
            format!("{}:{}", self.user, self.password)
        };
        format!(
            "tcp://{}@{}:{}/{}?compression=lz4&connection_timeout={}ms&insert_timeout={}ms&pool_min=1&pool_max=1",
            auth,
            self.host,
            self.port,
            self.database,
            self.connection_timeout.as_millis(),
            self.insert_timeout.as_millis(),
        )
    }
}

// =============================================================================
// Writer Pool
// =============================================================================

/// Pool of writer threads draining the ingest ring buffers into ClickHouse
#[derive(Debug)]
pub struct WriterPool {
    threads: Vec<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    stats: Arc<WriterStats>,
}

impl WriterPool {
    /// Start one worker per ring buffer.
    ///
    /// `on_flush` receives the upstream ids of every batch the database
    /// accepted; it runs on the worker threads, after the insert and never
    /// before.
    pub fn start(
        config: WriterConfig,
        buffers: Vec<Arc<RingBuffer<LogEntry>>>,
        on_flush: FlushCallback,
    ) -> Result<Self> {
        if buffers.len() != config.writer_threads {
            return Err(WriterError::BufferCount {
                buffers: buffers.len(),
                threads: config.writer_threads,
            });
        }

        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(WriterStats::new());
        let config = Arc::new(config);

        let mut threads = Vec::with_capacity(buffers.len());
        for (thread_id, buffer) in buffers.into_iter().enumerate() {
            let worker = Worker::new(
                thread_id,
                Arc::clone(&config),
                Arc::clone(&stats),
                Arc::clone(&on_flush),
            )?;
            let running = Arc::clone(&running);
            let handle = thread::Builder::new()
                .name(format!("writer-{thread_id}"))
                .spawn(move || worker.run(&buffer, &running))
                .map_err(WriterError::Spawn)?;
            threads.push(handle);
        }

        tracing::info!(threads = config.writer_threads, "writer pool started");
        Ok(Self {
            threads,
            running,
            stats,
        })
    }

    /// Stop the pool: clear the running flag and wait for every worker to
    /// drain its ring buffer and flush its residual batch.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                tracing::error!("writer thread panicked");
            }
        }
    }

    /// Shared counter block; stays valid while workers run
    pub fn stats(&self) -> Arc<WriterStats> {
        Arc::clone(&self.stats)
    }
}

impl Drop for WriterPool {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Worker
// =============================================================================

/// One writer thread: a ring buffer consumer end, a dedicated database
/// connection, and a local batch.
struct Worker {
    thread_id: usize,
    config: Arc<WriterConfig>,
    stats: Arc<WriterStats>,
    on_flush: FlushCallback,
    rt: tokio::runtime::Runtime,
    pool: Pool,
    client: Option<ClientHandle>,
}

impl Worker {
    fn new(
        thread_id: usize,
        config: Arc<WriterConfig>,
        stats: Arc<WriterStats>,
        on_flush: FlushCallback,
    ) -> Result<Self> {
        // The native client is async; each worker drives its own connection
        // on a private single-threaded runtime.
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(WriterError::Runtime)?;
        let pool = Pool::new(config.database_url());

        Ok(Self {
            thread_id,
            config,
            stats,
            on_flush,
            rt,
            pool,
            client: None,
        })
    }

    fn run(mut self, buffer: &RingBuffer<LogEntry>, running: &AtomicBool) {
        // Connection failures here are not fatal: the flush path reconnects,
        // and until then the ring buffer backs pressure up to the reader.
        self.reconnect();

        let mut local: Vec<LogEntry> = Vec::with_capacity(self.config.batch_size);

        loop {
            if !running.load(Ordering::Acquire) && buffer.is_empty() {
                break;
            }

            let want = self.config.batch_size.saturating_sub(local.len());
            let popped = buffer.pop_batch(&mut local, want);

            if local.len() >= self.config.batch_size {
                self.flush(&mut local);
            } else if popped == 0 {
                thread::sleep(IDLE_SLEEP);
                if !local.is_empty() {
                    self.flush(&mut local);
                }
            }
        }

        // Residual partial batch after drain.
        if !local.is_empty() {
            self.flush(&mut local);
        }
        tracing::debug!(thread = self.thread_id, "writer thread exiting");
    }

    /// Insert `local` as one block, acknowledge on success, and clear it.
    ///
    /// On failure: drop the connection, reconnect, wait, retry. A batch that
    /// exhausts the retry budget is discarded unacknowledged so the upstream
    /// queue re-delivers it.
    fn flush(&mut self, local: &mut Vec<LogEntry>) {
        if local.is_empty() {
            return;
        }
        let count = local.len();

        for attempt in 1..=self.config.retry_attempts {
            let block = build_block(local);
            match self.try_insert(block) {
                Ok(()) => {
                    self.stats.record_logs_written(count as u64);
                    self.stats.record_batch_written();
                    let ids = collect_ack_ids(local);
                    (self.on_flush)(&ids);
                    tracing::debug!(thread = self.thread_id, count, "batch inserted");
                    local.clear();
                    return;
                }
                Err(e) => {
                    self.stats.record_write_error();
                    tracing::warn!(
                        thread = self.thread_id,
                        attempt,
                        max_attempts = self.config.retry_attempts,
                        error = %e,
                        "insert failed"
                    );
                    self.client = None;
                    if attempt < self.config.retry_attempts {
                        self.reconnect();
                        thread::sleep(RETRY_DELAY);
                    }
                }
            }
        }

        tracing::error!(
            thread = self.thread_id,
            count,
            "discarding batch after retries; entries remain pending upstream"
        );
        local.clear();
    }

    fn try_insert(&mut self, block: clickhouse_rs::types::Block) -> clickhouse_rs::errors::Result<()> {
        let client = match &mut self.client {
            Some(client) => client,
            slot @ None => {
                let handle = self.rt.block_on(self.pool.get_handle())?;
                tracing::info!(thread = self.thread_id, "connected to clickhouse");
                slot.insert(handle)
            }
        };
        self.rt.block_on(client.insert(self.config.table.as_str(), block))
    }

    fn reconnect(&mut self) {
        match self.rt.block_on(self.pool.get_handle()) {
            Ok(handle) => {
                tracing::info!(thread = self.thread_id, "connected to clickhouse");
                self.client = Some(handle);
            }
            Err(e) => {
                tracing::warn!(thread = self.thread_id, error = %e, "clickhouse connection failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = WriterConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 9000);
        assert_eq!(config.database, "logs_db");
        assert_eq!(config.table, "logs");
        assert_eq!(config.batch_size, 10_000);
        assert_eq!(config.writer_threads, 4);
        assert_eq!(config.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
    }

    #[test]
    fn test_config_builders() {
        let config = WriterConfig::default()
            .with_addr("ch.internal", 9440)
            .with_table("telemetry", "app_logs")
            .with_credentials("ingest", "secret")
            .with_batch_size(5_000)
            .with_writer_threads(2);

        assert_eq!(config.host, "ch.internal");
        assert_eq!(config.port, 9440);
        assert_eq!(config.database, "telemetry");
        assert_eq!(config.table, "app_logs");
        assert_eq!(config.user, "ingest");
        assert_eq!(config.batch_size, 5_000);
        assert_eq!(config.writer_threads, 2);
    }

    #[test]
    fn test_database_url() {
        let config = WriterConfig::default();
        assert_eq!(
            config.database_url(),
            "tcp://default@localhost:9000/logs_db?compression=lz4&connection_timeout=5000ms&insert_timeout=5000ms&pool_min=1&pool_max=1"
        );
    }

    #[test]
    fn test_database_url_with_password() {
        let config = WriterConfig::default().with_credentials("ingest", "secret");
        assert!(config.database_url().starts_with("tcp://ingest:secret@"));
    }

    #[test]
    fn test_start_rejects_buffer_mismatch() {
        let config = WriterConfig::default().with_writer_threads(2);
        let buffers = vec![Arc::new(RingBuffer::new(16))];
        let on_flush: FlushCallback = Arc::new(|_| {});

        let err = WriterPool::start(config, buffers, on_flush).unwrap_err();
        assert!(matches!(
            err,
            WriterError::BufferCount {
                buffers: 1,
                threads: 2
            }
        ));
    }
}

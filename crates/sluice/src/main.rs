//! Sluice - Redis Streams to ClickHouse log ingestion daemon
//!
//! Drains a log stream through a consumer group and writes the entries into
//! ClickHouse in large column-oriented batches, acknowledging each message
//! only after the database accepted it.
//!
//! # Usage
//!
//! ```bash
//! # Run against localhost Redis/ClickHouse with defaults
//! sluice
//!
//! # Benchmark: exit once 200k logs are written
//! sluice --benchmark --count 200000 --threads 8 --batch 20000
//! ```
//!
//! Configuration comes from the environment (see `sluice-config`); flags
//! override it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sluice_config::Config;
use sluice_consumer::{ConsumerConfig, StreamConsumer};
use sluice_protocol::LogEntry;
use sluice_ring::RingBuffer;
use sluice_writer::{FlushCallback, WriterConfig, WriterPool};

/// Pause after a read that produced nothing (timeout or transport error) so
/// a failing connection cannot spin the loop
const READ_RETRY_BACKOFF: Duration = Duration::from_millis(10);

/// Sluice - Redis Streams to ClickHouse log ingester
#[derive(Parser, Debug)]
#[command(name = "sluice")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Run in benchmark mode (exit after --count logs are written)
    #[arg(long)]
    benchmark: bool,

    /// Number of logs to write before exiting in benchmark mode
    #[arg(long, value_name = "N")]
    count: Option<u64>,

    /// Number of writer threads (one ring buffer and one database
    /// connection each)
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// Entries per database insert
    #[arg(long, value_name = "N")]
    batch: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let mut config = Config::from_env().context("failed to load configuration")?;
    if cli.benchmark {
        config.benchmark.enabled = true;
    }
    if let Some(count) = cli.count {
        config.benchmark.count = count;
    }
    if let Some(threads) = cli.threads {
        config.ingest.writer_threads = threads;
    }
    if let Some(batch) = cli.batch {
        config.ingest.batch_size = batch;
    }

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            flag.store(false, Ordering::Release);
        }
    });

    tokio::task::spawn_blocking(move || run(config, running))
        .await
        .context("ingest loop panicked")?
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();

    Ok(())
}

/// Wire the pipeline together and drive the main read loop until shutdown
/// or the benchmark target.
fn run(config: Config, running: Arc<AtomicBool>) -> Result<()> {
    tracing::info!(
        redis = %format!("{}:{}", config.redis.host, config.redis.port),
        stream = %config.redis.stream_key,
        group = %config.redis.group_name,
        clickhouse = %format!("{}:{}", config.clickhouse.host, config.clickhouse.native_port),
        table = %format!("{}.{}", config.clickhouse.database, config.clickhouse.table),
        writer_threads = config.ingest.writer_threads,
        batch_size = config.ingest.batch_size,
        ring_buffer_size = config.ingest.ring_buffer_size,
        "starting ingester"
    );
    if config.benchmark.enabled {
        tracing::info!(count = config.benchmark.count, "benchmark mode");
    }

    let buffers: Vec<Arc<RingBuffer<LogEntry>>> = (0..config.ingest.writer_threads)
        .map(|_| Arc::new(RingBuffer::new(config.ingest.ring_buffer_size)))
        .collect();

    let consumer = Arc::new(StreamConsumer::new(ConsumerConfig {
        host: config.redis.host.clone(),
        port: config.redis.port,
        stream_key: config.redis.stream_key.clone(),
        group_name: config.redis.group_name.clone(),
        consumer_name: config.redis.consumer_name.clone(),
        read_batch_size: config.ingest.read_batch_size,
        block_ms: config.ingest.block_ms,
        blocking: config.ingest.polling_interval_ms == 0,
    }));
    consumer.connect().context("failed to connect to redis")?;

    // Acks close the loop: a batch's ids reach the consumer only after the
    // database accepted the insert.
    let ack: FlushCallback = {
        let consumer = Arc::clone(&consumer);
        Arc::new(move |ids: &[String]| consumer.ack_batch(ids))
    };

    let writer_config = WriterConfig::default()
        .with_addr(config.clickhouse.host.clone(), config.clickhouse.native_port)
        .with_table(
            config.clickhouse.database.clone(),
            config.clickhouse.table.clone(),
        )
        .with_credentials(
            config.clickhouse.user.clone(),
            config.clickhouse.password.clone(),
        )
        .with_batch_size(config.ingest.batch_size)
        .with_writer_threads(config.ingest.writer_threads);
    let mut pool = WriterPool::start(writer_config, buffers.clone(), ack)
        .context("failed to start writer pool")?;
    let writer_stats = pool.stats();

    // Crash recovery: re-fetch anything delivered to this consumer name but
    // never acknowledged.
    let recovered = consumer.recover_pending(&buffers);
    if recovered > 0 {
        tracing::info!(recovered, "recovered pending messages");
    }

    let started = Instant::now();
    let mut total_read = recovered as u64;

    tracing::info!("starting ingestion");
    while running.load(Ordering::Acquire) && consumer.is_running() {
        let read = consumer.read_batch(&buffers) as u64;
        total_read += read;

        if config.benchmark.enabled && writer_stats.logs_written() >= config.benchmark.count {
            tracing::info!("benchmark target reached");
            break;
        }

        if read > 0 && total_read % 10_000 < config.ingest.read_batch_size as u64 {
            let buffered: usize = buffers.iter().map(|b| b.len()).sum();
            tracing::info!(
                read = total_read,
                written = writer_stats.logs_written(),
                buffered,
                "progress"
            );
        }

        if config.ingest.polling_interval_ms > 0 {
            std::thread::sleep(Duration::from_millis(config.ingest.polling_interval_ms));
        } else if read == 0 {
            std::thread::sleep(READ_RETRY_BACKOFF);
        }
    }

    consumer.stop();
    tracing::info!("waiting for writers to drain");
    pool.stop();

    let elapsed = started.elapsed();
    let writers = writer_stats.snapshot();
    let readers = consumer.stats().snapshot();
    let throughput = if elapsed.as_millis() > 0 {
        writers.logs_written * 1000 / elapsed.as_millis() as u64
    } else {
        0
    };

    tracing::info!(
        total_read,
        total_written = writers.logs_written,
        batches = writers.batches_written,
        write_errors = writers.write_errors,
        parse_errors = readers.parse_errors,
        duration_ms = elapsed.as_millis() as u64,
        logs_per_sec = throughput,
        stream_len = consumer.stream_len().unwrap_or(0),
        "ingestion finished"
    );

    Ok(())
}

//! Sluice Configuration
//!
//! Environment-driven configuration with sensible defaults. A bare
//! `Config::from_env()` against an empty environment yields a config that
//! talks to Redis and ClickHouse on localhost; only set what you need to
//! change. Command-line flags (parsed by the binary) override the
//! environment.
//!
//! # Environment surface
//!
//! | Variable | Default |
//! |---|---|
//! | `REDIS_HOST` / `REDIS_PORT` | `localhost` / `6379` |
//! | `STREAM_KEY` | `logs:stream` |
//! | `GROUP_NAME` | `log-processors` |
//! | `CONSUMER_NAME` | `sluice` |
//! | `CLICKHOUSE_HOST` / `CLICKHOUSE_NATIVE_PORT` | `localhost` / `9000` |
//! | `CLICKHOUSE_DATABASE` / `CLICKHOUSE_TABLE` | `logs_db` / `logs` |
//! | `CLICKHOUSE_USER` / `CLICKHOUSE_PASSWORD` | `default` / empty |
//! | `BATCH_SIZE` | `10000` |
//! | `READ_BATCH_SIZE` | `1000` |
//! | `WRITER_THREADS` | `4` |
//! | `BLOCK_MS` | `100` |
//! | `RING_BUFFER_SIZE` | `100000` |
//! | `POLLING_INTERVAL_MS` | `0` (blocking reads) |
//! | `BENCHMARK_MODE` / `BENCHMARK_COUNT` | `false` / `50000` |

mod error;

pub use error::ConfigError;

/// Result type for configuration loading
pub type Result<T> = std::result::Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// Upstream stream addressing
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis host
    /// Default: "localhost"
    pub host: String,

    /// Redis port
    /// Default: 6379
    pub port: u16,

    /// Stream key holding incoming log messages
    /// Default: "logs:stream"
    pub stream_key: String,

    /// Consumer group name
    /// Default: "log-processors"
    pub group_name: String,

    /// Consumer name within the group; pending messages are tracked per
    /// consumer name, so keep it stable across restarts
    /// Default: "sluice"
    pub consumer_name: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 6379,
            stream_key: "logs:stream".into(),
            group_name: "log-processors".into(),
            consumer_name: "sluice".into(),
        }
    }
}

/// Downstream database addressing
#[derive(Debug, Clone)]
pub struct ClickHouseConfig {
    /// ClickHouse host
    /// Default: "localhost"
    pub host: String,

    /// Native protocol port
    /// Default: 9000
    pub native_port: u16,

    /// Database name
    /// Default: "logs_db"
    pub database: String,

    /// Target table
    /// Default: "logs"
    pub table: String,

    /// Username
    /// Default: "default"
    pub user: String,

    /// Password
    /// Default: empty
    pub password: String,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            native_port: 9000,
            database: "logs_db".into(),
            table: "logs".into(),
            user: "default".into(),
            password: String::new(),
        }
    }
}

/// Throughput and concurrency tuning
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Entries per database insert
    /// Default: 10000
    pub batch_size: usize,

    /// Messages per upstream read
    /// Default: 1000
    pub read_batch_size: usize,

    /// Writer threads; one ring buffer and one database connection each
    /// Default: 4
    pub writer_threads: usize,

    /// Upstream blocking-read timeout in milliseconds
    /// Default: 100
    pub block_ms: u64,

    /// Ring buffer capacity per writer (rounded up to a power of two)
    /// Default: 100000
    pub ring_buffer_size: usize,

    /// When > 0, use non-blocking reads and sleep this long between rounds
    /// Default: 0 (blocking reads with `block_ms`)
    pub polling_interval_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: 10_000,
            read_batch_size: 1_000,
            writer_threads: 4,
            block_ms: 100,
            ring_buffer_size: 100_000,
            polling_interval_ms: 0,
        }
    }
}

/// Benchmark mode: exit once a target number of logs has been written
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Whether benchmark mode is active
    /// Default: false
    pub enabled: bool,

    /// Logs to write before exiting
    /// Default: 50000
    pub count: u64,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            count: 50_000,
        }
    }
}

// =============================================================================
// Top-level config
// =============================================================================

/// Main configuration structure
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Upstream stream settings
    pub redis: RedisConfig,

    /// Downstream database settings
    pub clickhouse: ClickHouseConfig,

    /// Batching and concurrency settings
    pub ingest: IngestConfig,

    /// Benchmark mode settings
    pub benchmark: BenchmarkConfig,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an injectable variable lookup.
    ///
    /// `from_env` delegates here; tests pass a closure over a map instead of
    /// mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("REDIS_HOST") {
            config.redis.host = v;
        }
        config.redis.port = parse_or("REDIS_PORT", &lookup, config.redis.port)?;
        if let Some(v) = lookup("STREAM_KEY") {
            config.redis.stream_key = v;
        }
        if let Some(v) = lookup("GROUP_NAME") {
            config.redis.group_name = v;
        }
        if let Some(v) = lookup("CONSUMER_NAME") {
            config.redis.consumer_name = v;
        }

        if let Some(v) = lookup("CLICKHOUSE_HOST") {
            config.clickhouse.host = v;
        }
        config.clickhouse.native_port = parse_or(
            "CLICKHOUSE_NATIVE_PORT",
            &lookup,
            config.clickhouse.native_port,
        )?;
        if let Some(v) = lookup("CLICKHOUSE_DATABASE") {
            config.clickhouse.database = v;
        }
        if let Some(v) = lookup("CLICKHOUSE_TABLE") {
            config.clickhouse.table = v;
        }
        if let Some(v) = lookup("CLICKHOUSE_USER") {
            config.clickhouse.user = v;
        }
        if let Some(v) = lookup("CLICKHOUSE_PASSWORD") {
            config.clickhouse.password = v;
        }

        config.ingest.batch_size = parse_or("BATCH_SIZE", &lookup, config.ingest.batch_size)?;
        config.ingest.read_batch_size =
            parse_or("READ_BATCH_SIZE", &lookup, config.ingest.read_batch_size)?;
        config.ingest.writer_threads =
            parse_or("WRITER_THREADS", &lookup, config.ingest.writer_threads)?;
        config.ingest.block_ms = parse_or("BLOCK_MS", &lookup, config.ingest.block_ms)?;
        config.ingest.ring_buffer_size =
            parse_or("RING_BUFFER_SIZE", &lookup, config.ingest.ring_buffer_size)?;
        config.ingest.polling_interval_ms = parse_or(
            "POLLING_INTERVAL_MS",
            &lookup,
            config.ingest.polling_interval_ms,
        )?;

        if let Some(v) = lookup("BENCHMARK_MODE") {
            config.benchmark.enabled = parse_bool("BENCHMARK_MODE", &v)?;
        }
        config.benchmark.count = parse_or("BENCHMARK_COUNT", &lookup, config.benchmark.count)?;

        Ok(config)
    }
}

fn parse_or<T, F>(name: &'static str, lookup: &F, default: T) -> Result<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
        }),
        None => Ok(default),
    }
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: raw.to_string(),
        }),
    }
}

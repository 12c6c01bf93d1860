//! Column block construction
//!
//! The `logs` table takes eight string columns. Column storage is sized to
//! the batch up front so filling is a straight copy per entry.

use clickhouse_rs::types::Block;

use sluice_protocol::LogEntry;

/// Build a native-protocol block from a batch of entries.
///
/// Columns appear in the table's declaration order: `app_id, message,
/// source, level, environment, metadata, trace_id, user_id`.
pub(crate) fn build_block(entries: &[LogEntry]) -> Block {
    let n = entries.len();
    let mut app_id = Vec::with_capacity(n);
    let mut message = Vec::with_capacity(n);
    let mut source = Vec::with_capacity(n);
    let mut level = Vec::with_capacity(n);
    let mut environment = Vec::with_capacity(n);
    let mut metadata = Vec::with_capacity(n);
    let mut trace_id = Vec::with_capacity(n);
    let mut user_id = Vec::with_capacity(n);

    for entry in entries {
        app_id.push(entry.app_id.clone());
        message.push(entry.message.clone());
        source.push(entry.source.clone());
        level.push(entry.level.as_str().to_string());
        environment.push(entry.environment.clone());
        metadata.push(entry.metadata.clone());
        trace_id.push(entry.trace_id.clone());
        user_id.push(entry.user_id.clone());
    }

    Block::new()
        .column("app_id", app_id)
        .column("message", message)
        .column("source", source)
        .column("level", level)
        .column("environment", environment)
        .column("metadata", metadata)
        .column("trace_id", trace_id)
        .column("user_id", user_id)
}

/// Collect the upstream ids of a batch for acknowledgment.
///
/// Entries without an id (recovered from sources that never set one) are
/// written but cannot be acked; they are skipped here.
pub(crate) fn collect_ack_ids(entries: &[LogEntry]) -> Vec<String> {
    entries
        .iter()
        .filter(|entry| !entry.upstream_id.is_empty())
        .map(|entry| entry.upstream_id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_protocol::LogLevel;

    fn entry(n: usize) -> LogEntry {
        LogEntry {
            app_id: format!("app-{n}"),
            message: format!("message {n}"),
            source: "api".into(),
            level: LogLevel::Warn,
            environment: "production".into(),
            metadata: "{}".into(),
            trace_id: String::new(),
            user_id: format!("u-{n}"),
            upstream_id: format!("17000-{n}"),
        }
    }

    #[test]
    fn test_block_shape() {
        let entries: Vec<LogEntry> = (0..3).map(entry).collect();
        let block = build_block(&entries);

        assert_eq!(block.row_count(), 3);
        assert_eq!(block.column_count(), 8);
    }

    #[test]
    fn test_block_column_order() {
        let entries = vec![entry(0)];
        let block = build_block(&entries);

        let names: Vec<&str> = block.columns().iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            [
                "app_id",
                "message",
                "source",
                "level",
                "environment",
                "metadata",
                "trace_id",
                "user_id",
            ]
        );
    }

    #[test]
    fn test_empty_batch_builds_empty_block() {
        let block = build_block(&[]);
        assert_eq!(block.row_count(), 0);
    }

    #[test]
    fn test_collect_ack_ids_skips_empty() {
        let mut entries: Vec<LogEntry> = (0..3).map(entry).collect();
        entries[1].upstream_id = String::new();

        let ids = collect_ack_ids(&entries);
        assert_eq!(ids, vec!["17000-0".to_string(), "17000-2".to_string()]);
    }

    #[test]
    fn test_collect_ack_ids_empty_batch() {
        assert!(collect_ack_ids(&[]).is_empty());
    }
}

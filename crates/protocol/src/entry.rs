//! Log entry and severity types

// =============================================================================
// Log Levels
// =============================================================================

/// Log severity levels matching the downstream `logs` table enum
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// Parse the upstream spelling of a level.
    ///
    /// Anything outside the allowed set (including an empty string) coerces
    /// to `Info` so every entry stays insertable. This coercion is not a
    /// decode error.
    #[inline]
    pub fn from_upstream(value: &str) -> Self {
        match value {
            "DEBUG" => Self::Debug,
            "INFO" => Self::Info,
            "WARN" => Self::Warn,
            "ERROR" => Self::Error,
            "FATAL" => Self::Fatal,
            _ => Self::Info,
        }
    }

    /// Get the string representation used in the downstream column
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Log Entry
// =============================================================================

/// A decoded log record crossing a ring buffer.
///
/// Field order matches the downstream `logs` table column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogEntry {
    /// Application identifier
    pub app_id: String,

    /// Log message body
    pub message: String,

    /// Originating host or service instance
    pub source: String,

    /// Severity level
    pub level: LogLevel,

    /// Deployment environment (development, staging, production, ...)
    pub environment: String,

    /// Opaque metadata as JSON text
    pub metadata: String,

    /// Distributed trace id, empty when absent
    pub trace_id: String,

    /// User id, empty when absent
    pub user_id: String,

    /// Upstream stream message id, required for acknowledgment.
    ///
    /// An entry with an empty id is written but never acknowledged; the
    /// upstream copy stays pending and is re-delivered later.
    pub upstream_id: String,
}

impl LogEntry {
    /// Rough wire size of this entry, used for buffer sizing heuristics
    pub fn estimated_size(&self) -> usize {
        self.app_id.len()
            + self.message.len()
            + self.source.len()
            + self.level.as_str().len()
            + self.environment.len()
            + self.metadata.len()
            + self.trace_id.len()
            + self.user_id.len()
            + 64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_upstream_known() {
        assert_eq!(LogLevel::from_upstream("DEBUG"), LogLevel::Debug);
        assert_eq!(LogLevel::from_upstream("INFO"), LogLevel::Info);
        assert_eq!(LogLevel::from_upstream("WARN"), LogLevel::Warn);
        assert_eq!(LogLevel::from_upstream("ERROR"), LogLevel::Error);
        assert_eq!(LogLevel::from_upstream("FATAL"), LogLevel::Fatal);
    }

    #[test]
    fn test_level_from_upstream_coerces_unknown() {
        assert_eq!(LogLevel::from_upstream("VERBOSE"), LogLevel::Info);
        assert_eq!(LogLevel::from_upstream("warn"), LogLevel::Info);
        assert_eq!(LogLevel::from_upstream(""), LogLevel::Info);
    }

    #[test]
    fn test_level_as_str_round_trip() {
        for level in [
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
            LogLevel::Fatal,
        ] {
            assert_eq!(LogLevel::from_upstream(level.as_str()), level);
        }
    }

    #[test]
    fn test_estimated_size_counts_fields() {
        let entry = LogEntry {
            app_id: "app".into(),
            message: "hello".into(),
            ..Default::default()
        };
        assert!(entry.estimated_size() >= 64 + 3 + 5);
    }
}

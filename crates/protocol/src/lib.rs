//! Sluice - Protocol
//!
//! Shared log entry types and upstream payload decoding.
//!
//! Messages arrive from the upstream stream with a single `data` field whose
//! value is a flat JSON object of string fields. [`decode_payload`] turns that
//! payload into a [`LogEntry`], applying the field defaults the downstream
//! schema expects. Entries carry the upstream message id so a writer can
//! acknowledge them once they are durably stored.

mod decode;
mod entry;
mod error;

pub use decode::decode_payload;
pub use entry::{LogEntry, LogLevel};
pub use error::DecodeError;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, DecodeError>;

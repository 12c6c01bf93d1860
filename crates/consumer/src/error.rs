//! Consumer error types

use thiserror::Error;

/// Errors from the stream consumer
#[derive(Debug, Error)]
pub enum ConsumerError {
    /// Could not open a connection to the upstream queue
    #[error("redis connection failed: {0}")]
    Connect(#[source] redis::RedisError),

    /// Consumer group creation failed for a reason other than the group
    /// already existing
    #[error("consumer group setup failed: {0}")]
    GroupSetup(#[source] redis::RedisError),

    /// An operation was attempted before `connect()`
    #[error("not connected")]
    NotConnected,
}

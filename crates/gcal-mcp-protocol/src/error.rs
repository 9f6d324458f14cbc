//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while reading or writing protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A line exceeded the maximum message size. The rest of the line has
    /// been discarded.
    #[error("message too large: more than {max} bytes")]
    MessageTooLarge { max: usize },

    /// Failed to serialize or deserialize a message.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error during read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

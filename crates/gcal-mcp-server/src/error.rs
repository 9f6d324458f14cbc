//! Server error types.

use std::io;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error on stdin/stdout.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Protocol error (framing, encoding, etc.).
    #[error("Protocol error: {0}")]
    Protocol(#[from] gcal_mcp_protocol::ProtocolError),

    /// The tool catalog could not be built.
    #[error("Registry error: {0}")]
    Registry(#[from] gcal_mcp_core::RegistryError),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The response writer stopped before the server did.
    #[error("Response writer stopped unexpectedly")]
    WriterClosed,
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

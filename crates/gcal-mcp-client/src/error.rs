//! Client error types.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the CLI.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Backend error, including authorization failures.
    #[error("provider error: {0}")]
    Provider(String),

    /// Server error.
    #[error("server error: {0}")]
    Server(#[from] gcal_mcp_server::ServerError),

    /// Tracing could not be initialized.
    #[error("logging error: {0}")]
    Tracing(#[from] gcal_mcp_core::TracingError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<gcal_mcp_providers::ProviderError> for ClientError {
    fn from(err: gcal_mcp_providers::ProviderError) -> Self {
        Self::Provider(err.to_string())
    }
}

impl From<gcal_mcp_core::RegistryError> for ClientError {
    fn from(err: gcal_mcp_core::RegistryError) -> Self {
        Self::Server(err.into())
    }
}

//! Server configuration.

use std::time::Duration;

use gcal_mcp_protocol::MAX_MESSAGE_SIZE;

use crate::error::{ServerError, ServerResult};

/// Default bound on one backend call.
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of requests handled concurrently.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Configuration for the MCP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Name reported in `serverInfo`.
    pub name: String,
    /// Version reported in `serverInfo`.
    pub version: String,
    /// Check free/busy before create-event and update-event.
    pub availability_precheck: bool,
    /// Bound on each backend call.
    pub backend_timeout: Duration,
    /// Maximum number of requests handled concurrently.
    pub max_in_flight: usize,
    /// Longest accepted input line, in bytes.
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "mcp_server_google_calendar".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            availability_precheck: true,
            backend_timeout: DEFAULT_BACKEND_TIMEOUT,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

impl ServerConfig {
    /// Creates a new server config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name and version reported to clients.
    pub fn with_server_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.name = name.into();
        self.version = version.into();
        self
    }

    /// Enables or disables the availability precheck.
    pub fn with_availability_precheck(mut self, enabled: bool) -> Self {
        self.availability_precheck = enabled;
        self
    }

    /// Sets the backend call timeout.
    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    /// Sets the maximum number of concurrently handled requests.
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max;
        self
    }

    /// Sets the longest accepted input line.
    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = max;
        self
    }

    /// Checks that the limits are usable.
    pub fn validate(&self) -> ServerResult<()> {
        if self.max_in_flight == 0 {
            return Err(ServerError::config("max_in_flight must be at least 1"));
        }
        if self.max_message_size == 0 {
            return Err(ServerError::config("max_message_size must be at least 1"));
        }
        if self.backend_timeout.is_zero() {
            return Err(ServerError::config("backend timeout must be greater than zero"));
        }
        Ok(())
    }
}

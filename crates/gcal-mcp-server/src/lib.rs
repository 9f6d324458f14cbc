//! MCP stdio server for Google Calendar.
//!
//! This crate provides:
//! - The validated dispatcher routing tool calls to a calendar backend
//! - Availability prechecks for scheduling calls
//! - The MCP request handler and the stdio transport
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use gcal_mcp_core::{CatalogOptions, Registry};
//! use gcal_mcp_providers::CalendarBackend;
//! use gcal_mcp_server::{
//!     Dispatcher, DispatcherConfig, RequestHandler, ServerConfig, SignalHandler, StdioServer,
//! };
//!
//! async fn serve(backend: Arc<dyn CalendarBackend>) -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let registry = Arc::new(Registry::google_calendar(&CatalogOptions::default())?);
//!     let dispatcher = Dispatcher::new(registry, backend, DispatcherConfig::from(&config));
//!     let handler = RequestHandler::from_config(dispatcher, &config);
//!
//!     let signals = SignalHandler::new();
//!     signals.spawn_listener();
//!     StdioServer::new(handler, config)?.run(signals.shutdown()).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod dispatcher;
mod error;
mod handler;
mod signals;
mod stdio;
#[cfg(test)]
mod test_support;

pub use config::{DEFAULT_BACKEND_TIMEOUT, DEFAULT_MAX_IN_FLIGHT, ServerConfig};
pub use dispatcher::{
    CONFLICT_STATUS, ConflictPayload, DispatchError, DispatchStage, Dispatcher, DispatcherConfig,
    ToolCallRequest, ToolCallResult,
};
pub use error::{ServerError, ServerResult};
pub use handler::{RequestHandler, list_tools_result};
pub use signals::{ShutdownHandle, ShutdownSignal, SignalHandler};
pub use stdio::StdioServer;

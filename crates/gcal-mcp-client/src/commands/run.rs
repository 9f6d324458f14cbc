//! The `run` command: serve MCP on stdio.

use std::sync::Arc;

use gcal_mcp_core::Registry;
use gcal_mcp_providers::google::{AuthMode, GoogleBackend};
use gcal_mcp_server::{Dispatcher, DispatcherConfig, RequestHandler, SignalHandler, StdioServer};
use tracing::info;

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Authorizes against Google, then serves until stdin closes or a
/// termination signal arrives.
///
/// Authorization failure ends the command before anything is served.
pub async fn run(config: &ClientConfig) -> ClientResult<()> {
    let google_config = config.google_settings()?.to_provider_config()?;
    let backend = GoogleBackend::new(google_config)?;
    backend.authorize(AuthMode::Interactive).await?;
    info!(tokens = %backend.token_path().display(), "Google Calendar authorized");

    let server_config = config.server_config();
    let registry = Arc::new(Registry::google_calendar(&config.catalog_options())?);
    let dispatcher = Dispatcher::new(
        registry,
        Arc::new(backend),
        DispatcherConfig::from(&server_config),
    );
    let handler = RequestHandler::from_config(dispatcher, &server_config);
    let server = StdioServer::new(handler, server_config)?;

    let signals = SignalHandler::new();
    signals.spawn_listener();

    server.run(signals.shutdown()).await?;
    info!("Server stopped");
    Ok(())
}

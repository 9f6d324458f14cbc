//! The stdio transport.
//!
//! Reads newline-delimited JSON-RPC messages, handles up to
//! `max_in_flight` of them concurrently, and funnels every response through
//! a single writer task so lines never interleave.

use std::sync::Arc;

use gcal_mcp_protocol::{
    FrameReader, FrameWriter, JsonRpcError, JsonRpcResponse, ProtocolError, encode_message,
};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::RequestHandler;
use crate::signals::ShutdownSignal;

/// MCP server over a pair of byte streams.
pub struct StdioServer {
    handler: RequestHandler,
    config: ServerConfig,
}

impl StdioServer {
    /// Creates a server after checking the config.
    pub fn new(handler: RequestHandler, config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        Ok(Self { handler, config })
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serves the process's stdin and stdout.
    pub async fn run(&self, shutdown: ShutdownSignal) -> ServerResult<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout(), shutdown)
            .await
    }

    /// Serves until the input ends or shutdown is signaled.
    ///
    /// Requests already being handled are allowed to finish and their
    /// responses are written before this returns.
    pub async fn serve<R, W>(&self, reader: R, writer: W, shutdown: ShutdownSignal) -> ServerResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut frames =
            FrameReader::with_max_size(BufReader::new(reader), self.config.max_message_size);
        let (tx, rx) = mpsc::channel::<JsonRpcResponse>(self.config.max_in_flight * 2);
        let writer_task = tokio::spawn(write_responses(FrameWriter::new(writer), rx));

        let semaphore = Arc::new(Semaphore::new(self.config.max_in_flight));
        let mut tasks = JoinSet::new();

        info!(
            max_in_flight = self.config.max_in_flight,
            "Serving MCP on stdio"
        );

        let shutdown = shutdown.wait();
        tokio::pin!(shutdown);

        let read_result = loop {
            // Permit first, so a saturated server stops reading.
            let permit = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received, stopping");
                    break Ok(());
                }
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break Ok(()),
                },
            };

            let frame = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received, stopping");
                    break Ok(());
                }
                frame = frames.read_frame() => frame,
            };

            match frame {
                Ok(Some(frame)) => {
                    let handler = self.handler.clone();
                    let tx = tx.clone();
                    tasks.spawn(async move {
                        let _permit = permit;
                        if let Some(response) = handler.handle_frame(&frame).await
                            && tx.send(response).await.is_err()
                        {
                            warn!("Response dropped, writer has stopped");
                        }
                    });
                }
                Ok(None) => {
                    info!("Input closed, stopping");
                    break Ok(());
                }
                Err(ProtocolError::MessageTooLarge { max }) => {
                    warn!(max, "Discarded oversized message");
                    let error = JsonRpcError::invalid_request(format!(
                        "Invalid request: message exceeds {max} bytes"
                    ));
                    let _ = tx.send(JsonRpcResponse::error(None, error)).await;
                }
                Err(e) => {
                    error!(error = %e, "Failed to read input");
                    break Err(ServerError::from(e));
                }
            }

            while let Some(joined) = tasks.try_join_next() {
                log_join(joined);
            }
        };

        if !tasks.is_empty() {
            debug!(in_flight = tasks.len(), "Waiting for in-flight requests");
        }
        while let Some(joined) = tasks.join_next().await {
            log_join(joined);
        }

        drop(tx);
        let write_result = match writer_task.await {
            Ok(result) => result.map_err(ServerError::from),
            Err(e) => {
                error!(error = %e, "Response writer task failed");
                Err(ServerError::WriterClosed)
            }
        };

        read_result.and(write_result)
    }
}

async fn write_responses<W>(
    mut writer: FrameWriter<W>,
    mut rx: mpsc::Receiver<JsonRpcResponse>,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let line = match encode_message(&response) {
            Ok(line) => line,
            Err(e) => {
                // The peer still gets an answer for this id.
                error!(error = %e, "Failed to encode response");
                let fallback = JsonRpcResponse::error(
                    response.id.clone(),
                    JsonRpcError::internal(format!("Internal error: {e}")),
                );
                encode_message(&fallback)?
            }
        };
        writer.write_frame(&line).await?;
    }
    debug!("Response writer stopped");
    Ok(())
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "Request task failed");
    }
}

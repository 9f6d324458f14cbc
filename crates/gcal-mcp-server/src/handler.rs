//! MCP request handling.
//!
//! Maps JSON-RPC methods onto the dispatcher and dispatch outcomes onto MCP
//! results. Backend failures are reported to the model as tool errors;
//! unknown tools and bad arguments are protocol errors.

use gcal_mcp_core::Registry;
use gcal_mcp_protocol::{
    CallToolParams, CallToolResult, Implementation, Incoming, InitializeParams, InitializeResult,
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult, McpMethod, PROTOCOL_VERSION,
    ServerCapabilities, Tool, ToolsCapability,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{Span, debug, error, info, warn};

use crate::config::ServerConfig;
use crate::dispatcher::{DispatchError, Dispatcher, ToolCallRequest};

/// Request handler that turns incoming frames into responses.
#[derive(Clone)]
pub struct RequestHandler {
    dispatcher: Dispatcher,
    server_info: Implementation,
}

impl RequestHandler {
    /// Creates a handler reporting the given server identity.
    pub fn new(dispatcher: Dispatcher, server_info: Implementation) -> Self {
        Self {
            dispatcher,
            server_info,
        }
    }

    /// Creates a handler identified by the server config.
    pub fn from_config(dispatcher: Dispatcher, config: &ServerConfig) -> Self {
        Self::new(
            dispatcher,
            Implementation {
                name: config.name.clone(),
                version: config.version.clone(),
            },
        )
    }

    /// Handles one frame. Returns `None` when nothing should be written.
    pub async fn handle_frame(&self, frame: &[u8]) -> Option<JsonRpcResponse> {
        match Incoming::decode(frame) {
            Incoming::Request(request) | Incoming::Notification(request) => {
                self.handle_request(request).await
            }
            Incoming::Response(value) => {
                debug!(response = %value, "Ignoring response from client");
                None
            }
            Incoming::Invalid { id, error } => {
                warn!(id = ?id, error = %error, "Rejecting invalid message");
                Some(JsonRpcResponse::error(id, error))
            }
        }
    }

    /// Handles a request or notification.
    #[tracing::instrument(skip(self, request), fields(method = %request.method, id, duration_ms))]
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let start = std::time::Instant::now();
        let method = McpMethod::parse(&request.method);

        let Some(id) = request.id else {
            self.handle_notification(&method);
            return None;
        };
        Span::current().record("id", tracing::field::display(&id));

        let outcome = match method {
            McpMethod::Initialize => self.initialize(request.params),
            McpMethod::Ping => Ok(json!({})),
            McpMethod::ListTools => self.list_tools(),
            McpMethod::CallTool => self.call_tool(request.params).await,
            // Notification methods sent as requests get an empty ack.
            McpMethod::Initialized | McpMethod::Cancelled => Ok(json!({})),
            McpMethod::Other(name) => {
                debug!(method = %name, "Unknown method");
                Err(JsonRpcError::method_not_found(&name))
            }
        };

        let duration = start.elapsed();
        if tracing::enabled!(tracing::Level::DEBUG) {
            Span::current().record("duration_ms", duration.as_millis());
            debug!(duration_ms = duration.as_millis(), "Request handled");
        }

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(Some(id), error),
        })
    }

    fn handle_notification(&self, method: &McpMethod) {
        match method {
            McpMethod::Initialized => info!("Client finished initialization"),
            McpMethod::Cancelled => debug!("Client cancelled a request"),
            other => debug!(method = ?other, "Ignoring notification"),
        }
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        match params.map(serde_json::from_value::<InitializeParams>) {
            Some(Ok(params)) => {
                let client = params.client_info.as_ref();
                info!(
                    client = client.map(|c| c.name.as_str()).unwrap_or("unknown"),
                    client_version = client.map(|c| c.version.as_str()).unwrap_or("unknown"),
                    protocol_version = %params.protocol_version,
                    "Client connected"
                );
            }
            Some(Err(e)) => debug!(error = %e, "Unreadable initialize params"),
            None => debug!("Initialize without params"),
        }

        to_result(&InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
            },
            server_info: self.server_info.clone(),
            instructions: None,
        })
    }

    fn list_tools(&self) -> Result<Value, JsonRpcError> {
        to_result(&list_tools_result(self.dispatcher.registry()))
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = parse_params(params)?;
        let request = ToolCallRequest::new(params.name, params.arguments);

        let result = match self.dispatcher.dispatch(request).await {
            Ok(result) => {
                let payload = result
                    .payload()
                    .map_err(|e| internal(&DispatchError::Internal(e.to_string())))?;
                CallToolResult::text(payload.to_string())
            }
            Err(DispatchError::Backend(e)) => CallToolResult::error(e.to_string()),
            Err(e) => return Err(protocol_error(e)),
        };
        to_result(&result)
    }
}

/// Maps the failures that are not reported as tool errors.
fn protocol_error(e: DispatchError) -> JsonRpcError {
    match &e {
        DispatchError::InvalidArguments(violations) => {
            let data = json!({ "violations": violations });
            JsonRpcError::invalid_params(e.to_string()).with_data(data)
        }
        DispatchError::UnknownOperation(_) => JsonRpcError::invalid_params(e.to_string()),
        DispatchError::Backend(_) | DispatchError::Internal(_) => internal(&e),
    }
}

/// The `tools/list` result for a registry, in declaration order.
pub fn list_tools_result(registry: &Registry) -> ListToolsResult {
    ListToolsResult {
        tools: registry
            .list()
            .iter()
            .map(|descriptor| Tool {
                name: descriptor.name().to_string(),
                description: descriptor.description().to_string(),
                input_schema: descriptor.input_schema(),
            })
            .collect(),
        next_cursor: None,
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError::invalid_params("Missing params"))?;
    serde_json::from_value(params)
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {e}")))
}

fn to_result<T: Serialize>(result: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(result).map_err(|e| internal(&DispatchError::Internal(e.to_string())))
}

fn internal(e: &DispatchError) -> JsonRpcError {
    error!(error = %e, "Internal error while handling request");
    JsonRpcError::internal(e.to_string())
}

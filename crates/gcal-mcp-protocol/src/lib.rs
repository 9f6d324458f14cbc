//! Wire types and framing for the gcal-mcp stdio server.
//!
//! The server speaks JSON-RPC 2.0 with the Model Context Protocol method
//! set, one message per line on stdin/stdout.
//!
//! # Example
//!
//! ```rust
//! use gcal_mcp_protocol::{Incoming, JsonRpcRequest, RequestId, encode_message};
//!
//! let request = JsonRpcRequest::new(RequestId::Number(1), "tools/list", None);
//! let line = encode_message(&request).unwrap();
//! assert!(matches!(Incoming::decode(&line[..line.len() - 1]), Incoming::Request(_)));
//! ```

mod error;
mod framing;
mod mcp;
mod types;

pub use error::{ProtocolError, ProtocolResult};
pub use framing::{FrameReader, FrameWriter, decode_message, encode_message};
pub use mcp::{
    CallToolParams, CallToolResult, Content, Implementation, InitializeParams, InitializeResult,
    ListToolsResult, McpMethod, ServerCapabilities, Tool, ToolsCapability,
};
pub use types::{
    ErrorCode, Incoming, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId,
    ResponseOutcome,
};

/// MCP protocol revision implemented by the server.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC version string.
pub const JSONRPC_VERSION: &str = "2.0";

/// Maximum size of one incoming line (4 MiB).
pub const MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

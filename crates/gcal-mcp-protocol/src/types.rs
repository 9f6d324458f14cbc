//! JSON-RPC 2.0 message types.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::JSONRPC_VERSION;

/// Identifier correlating a request with its response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// A request or notification. Notifications carry no `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a request expecting a response.
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            method: method.into(),
            params,
        }
    }

    /// Creates a notification.
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: None,
            method: method.into(),
            params,
        }
    }

    /// Returns true if no response is expected.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Either a result or an error, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseOutcome {
    Result(Value),
    Error(JsonRpcError),
}

/// A response. `id` is `null` when the request id could not be read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<RequestId>,
    #[serde(flatten)]
    pub outcome: ResponseOutcome,
}

impl JsonRpcResponse {
    /// Creates a success response.
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            outcome: ResponseOutcome::Result(result),
        }
    }

    /// Creates an error response.
    pub fn error(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            outcome: ResponseOutcome::Error(error),
        }
    }

    /// Returns the result, if this is a success response.
    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            ResponseOutcome::Result(value) => Some(value),
            ResponseOutcome::Error(_) => None,
        }
    }

    /// Returns the error, if this is an error response.
    pub fn error_object(&self) -> Option<&JsonRpcError> {
        match &self.outcome {
            ResponseOutcome::Result(_) => None,
            ResponseOutcome::Error(error) => Some(error),
        }
    }
}

/// Standard JSON-RPC error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The line was not valid JSON.
    ParseError,
    /// The JSON was not a valid request object.
    InvalidRequest,
    /// The method does not exist.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal error.
    InternalError,
}

impl ErrorCode {
    /// The numeric code sent on the wire.
    pub fn code(&self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
        }
    }

    /// Maps a numeric code back to a known variant.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -32700 => Some(Self::ParseError),
            -32600 => Some(Self::InvalidRequest),
            -32601 => Some(Self::MethodNotFound),
            -32602 => Some(Self::InvalidParams),
            -32603 => Some(Self::InternalError),
            _ => None,
        }
    }
}

/// The `error` member of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Creates an error with a standard code.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Attaches structured data.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(ErrorCode::MethodNotFound, format!("Method not found: {method}"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParams, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Returns the known code, if any.
    pub fn error_code(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// A classified incoming line.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// A request expecting a response.
    Request(JsonRpcRequest),
    /// A notification.
    Notification(JsonRpcRequest),
    /// A response to something we sent. The server never sends requests,
    /// so these are only logged.
    Response(Value),
    /// Not a usable message. `id` is set when it could be recovered.
    Invalid {
        id: Option<RequestId>,
        error: JsonRpcError,
    },
}

impl Incoming {
    /// Classifies one frame.
    pub fn decode(frame: &[u8]) -> Self {
        let value: Value = match serde_json::from_slice(frame) {
            Ok(value) => value,
            Err(e) => {
                return Self::Invalid {
                    id: None,
                    error: JsonRpcError::parse_error(format!("Parse error: {e}")),
                };
            }
        };

        let Some(object) = value.as_object() else {
            let message = if value.is_array() {
                "Batch requests are not supported"
            } else {
                "Invalid request: expected a JSON object"
            };
            return Self::Invalid {
                id: None,
                error: JsonRpcError::invalid_request(message),
            };
        };

        let id = object
            .get("id")
            .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());

        if !object.contains_key("method")
            && (object.contains_key("result") || object.contains_key("error"))
        {
            return Self::Response(value);
        }

        if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Self::Invalid {
                id,
                error: JsonRpcError::invalid_request("Invalid request: jsonrpc must be \"2.0\""),
            };
        }

        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) if request.is_notification() => Self::Notification(request),
            Ok(request) => Self::Request(request),
            Err(e) => Self::Invalid {
                id,
                error: JsonRpcError::invalid_request(format!("Invalid request: {e}")),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_id_accepts_numbers_and_strings() {
        let n: RequestId = serde_json::from_value(json!(5)).unwrap();
        let s: RequestId = serde_json::from_value(json!("req-5")).unwrap();
        assert_eq!(n, RequestId::Number(5));
        assert_eq!(s, RequestId::String("req-5".into()));
        assert_eq!(n.to_string(), "5");
    }

    #[test]
    fn success_response_shape() {
        let response = JsonRpcResponse::success(RequestId::Number(1), json!({}));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"jsonrpc": "2.0", "id": 1, "result": {}})
        );
    }

    #[test]
    fn error_response_with_null_id() {
        let response = JsonRpcResponse::error(None, JsonRpcError::parse_error("Parse error"));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"jsonrpc": "2.0", "id": null, "error": {"code": -32700, "message": "Parse error"}})
        );
    }

    #[test]
    fn error_codes_round_trip() {
        for code in [
            ErrorCode::ParseError,
            ErrorCode::InvalidRequest,
            ErrorCode::MethodNotFound,
            ErrorCode::InvalidParams,
            ErrorCode::InternalError,
        ] {
            assert_eq!(ErrorCode::from_code(code.code()), Some(code));
        }
        assert_eq!(ErrorCode::from_code(-1), None);
    }

    #[test]
    fn decode_request_and_notification() {
        let request = Incoming::decode(br#"{"jsonrpc":"2.0","id":3,"method":"tools/list"}"#);
        assert!(matches!(request, Incoming::Request(ref r) if r.method == "tools/list"));

        let notification =
            Incoming::decode(br#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#);
        assert!(matches!(notification, Incoming::Notification(_)));
    }

    #[test]
    fn decode_garbage_is_parse_error() {
        let Incoming::Invalid { id, error } = Incoming::decode(b"{not json") else {
            panic!("expected invalid");
        };
        assert!(id.is_none());
        assert_eq!(error.error_code(), Some(ErrorCode::ParseError));
    }

    #[test]
    fn decode_keeps_id_of_invalid_request() {
        let Incoming::Invalid { id, error } =
            Incoming::decode(br#"{"jsonrpc":"1.0","id":"x","method":"ping"}"#)
        else {
            panic!("expected invalid");
        };
        assert_eq!(id, Some(RequestId::String("x".into())));
        assert_eq!(error.error_code(), Some(ErrorCode::InvalidRequest));

        let Incoming::Invalid { id, .. } = Incoming::decode(br#"{"jsonrpc":"2.0","id":9}"#) else {
            panic!("expected invalid");
        };
        assert_eq!(id, Some(RequestId::Number(9)));
    }

    #[test]
    fn decode_batch_is_rejected() {
        let Incoming::Invalid { error, .. } = Incoming::decode(b"[]") else {
            panic!("expected invalid");
        };
        assert_eq!(error.error_code(), Some(ErrorCode::InvalidRequest));
    }

    #[test]
    fn decode_response_from_peer() {
        let incoming = Incoming::decode(br#"{"jsonrpc":"2.0","id":1,"result":{}}"#);
        assert!(matches!(incoming, Incoming::Response(_)));
    }
}

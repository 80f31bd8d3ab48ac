use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::error_codes;
use crate::types::RequestId;

/// Error categories carried in `error.code`.
///
/// The first five are the JSON-RPC 2.0 reserved codes; the rest are the
/// application codes MCP servers built on this crate emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    Unauthorized,
    ResourceNotFound,
    Forbidden,
    ToolNotFound,
    ToolExecution,
    /// Any other code in the -32099..=-32000 application range
    Application(i64),
}

impl JsonRpcErrorCode {
    /// Category for a numeric code; unknown codes land in [`Self::Application`].
    pub fn from_code(code: i64) -> Self {
        match code {
            error_codes::PARSE_ERROR => Self::ParseError,
            error_codes::INVALID_REQUEST => Self::InvalidRequest,
            error_codes::METHOD_NOT_FOUND => Self::MethodNotFound,
            error_codes::INVALID_PARAMS => Self::InvalidParams,
            error_codes::INTERNAL_ERROR => Self::InternalError,
            error_codes::UNAUTHORIZED => Self::Unauthorized,
            error_codes::RESOURCE_NOT_FOUND => Self::ResourceNotFound,
            error_codes::FORBIDDEN => Self::Forbidden,
            error_codes::TOOL_NOT_FOUND => Self::ToolNotFound,
            error_codes::TOOL_EXECUTION => Self::ToolExecution,
            other => Self::Application(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::ParseError => error_codes::PARSE_ERROR,
            Self::InvalidRequest => error_codes::INVALID_REQUEST,
            Self::MethodNotFound => error_codes::METHOD_NOT_FOUND,
            Self::InvalidParams => error_codes::INVALID_PARAMS,
            Self::InternalError => error_codes::INTERNAL_ERROR,
            Self::Unauthorized => error_codes::UNAUTHORIZED,
            Self::ResourceNotFound => error_codes::RESOURCE_NOT_FOUND,
            Self::Forbidden => error_codes::FORBIDDEN,
            Self::ToolNotFound => error_codes::TOOL_NOT_FOUND,
            Self::ToolExecution => error_codes::TOOL_EXECUTION,
            Self::Application(code) => *code,
        }
    }

    /// Default message when the caller supplies none
    pub fn message(&self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::Unauthorized => "Authentication failed",
            Self::ResourceNotFound => "Resource not found",
            Self::Forbidden => "Access denied",
            Self::ToolNotFound => "Tool not found",
            Self::ToolExecution => "Tool execution failed",
            Self::Application(_) => "Server error",
        }
    }

    pub fn is_application(&self) -> bool {
        (error_codes::SERVER_ERROR_START..=error_codes::SERVER_ERROR_END).contains(&self.code())
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}

/// The `error` member of an error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub fn new(code: JsonRpcErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_string()),
            data,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(JsonRpcErrorCode::ParseError, None, None)
    }

    pub fn invalid_request(message: Option<String>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidRequest, message, None)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::MethodNotFound,
            Some(format!("Method '{}' not found", method)),
            None,
        )
    }

    pub fn invalid_params(message: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::InvalidParams,
            Some(message.to_string()),
            None,
        )
    }

    pub fn internal_error(message: Option<String>) -> Self {
        Self::new(JsonRpcErrorCode::InternalError, message, None)
    }

    /// Application error in the -32099..=-32000 range; other codes become -32000.
    pub fn server_error(code: i64, message: &str, data: Option<Value>) -> Self {
        let category = match JsonRpcErrorCode::from_code(code) {
            category if category.is_application() => category,
            _ => JsonRpcErrorCode::Application(error_codes::SERVER_ERROR_END),
        };
        Self::new(category, Some(message.to_string()), data)
    }

    /// Category of this error's code
    pub fn category(&self) -> JsonRpcErrorCode {
        JsonRpcErrorCode::from_code(self.code)
    }
}

/// JSON-RPC error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    #[serde(rename = "jsonrpc")]
    pub version: String,
    pub id: Option<RequestId>,
    pub error: JsonRpcErrorObject,
}

impl JsonRpcError {
    pub fn new(id: Option<RequestId>, error: JsonRpcErrorObject) -> Self {
        Self {
            version: crate::JSONRPC_VERSION.to_string(),
            id,
            error,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(None, JsonRpcErrorObject::parse_error())
    }

    pub fn invalid_request(id: Option<RequestId>) -> Self {
        Self::new(id, JsonRpcErrorObject::invalid_request(None))
    }

    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::new(Some(id), JsonRpcErrorObject::method_not_found(method))
    }

    pub fn invalid_params(id: RequestId, message: &str) -> Self {
        Self::new(Some(id), JsonRpcErrorObject::invalid_params(message))
    }

    pub fn internal_error(id: Option<RequestId>, message: Option<String>) -> Self {
        Self::new(id, JsonRpcErrorObject::internal_error(message))
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JSON-RPC Error {}: {}",
            self.error.code, self.error.message
        )
    }
}

impl std::error::Error for JsonRpcError {}

/// Errors raised while moving JSON-RPC payloads, not by method handlers.
#[derive(Debug, Error)]
pub enum JsonRpcTransportError {
    #[error("JSON parse error: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    ProtocolError(String),
}

//! MCP dispatch errors and their JSON-RPC mapping

use kestrel_mcp_json_rpc_server::error::JsonRpcErrorObject;
use kestrel_mcp_json_rpc_server::r#async::ToJsonRpcError;
use kestrel_mcp_json_rpc_server::{JsonRpcError, RequestId, error_codes};

use crate::uri_template::TemplateError;

/// Common result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;

/// Errors produced while serving an MCP method.
///
/// Cloneable so one failure can be handed to every waiter of a collapsed
/// resource read.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum McpError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Authentication failed")]
    Unauthorized,

    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Handler-supplied code and message, passed through unchanged
    #[error("{message}")]
    Handler { code: i64, message: String },
}

impl McpError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParameters(message.into())
    }

    pub fn missing_param(param: &str) -> Self {
        Self::MissingParameter(param.to_string())
    }

    pub fn tool_execution(message: impl Into<String>) -> Self {
        Self::ToolExecution(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn handler(code: i64, message: impl Into<String>) -> Self {
        Self::Handler {
            code,
            message: message.into(),
        }
    }

    /// JSON-RPC error code this error surfaces as
    pub fn code(&self) -> i64 {
        match self {
            McpError::InvalidParameters(_)
            | McpError::MissingParameter(_)
            | McpError::Template(_) => error_codes::INVALID_PARAMS,
            McpError::ResourceNotFound(_) => error_codes::RESOURCE_NOT_FOUND,
            McpError::ToolNotFound(_) => error_codes::TOOL_NOT_FOUND,
            McpError::Forbidden(_) => error_codes::FORBIDDEN,
            McpError::Unauthorized => error_codes::UNAUTHORIZED,
            McpError::ToolExecution(_) => error_codes::TOOL_EXECUTION,
            McpError::Internal(_) => error_codes::INTERNAL_ERROR,
            McpError::Handler { code, .. } => *code,
        }
    }

    /// Convert to a JsonRpcErrorObject for JSON-RPC 2.0 responses
    pub fn to_error_object(&self) -> JsonRpcErrorObject {
        match self {
            McpError::InvalidParameters(msg) => JsonRpcErrorObject::invalid_params(msg),
            McpError::MissingParameter(_) | McpError::Template(_) => {
                JsonRpcErrorObject::invalid_params(&self.to_string())
            }
            // Internal details stay in the log; clients get the category only.
            McpError::Internal(_) => {
                JsonRpcErrorObject::internal_error(Some("Internal error".to_string()))
            }
            McpError::Handler { code, message } => JsonRpcErrorObject {
                code: *code,
                message: message.clone(),
                data: None,
            },
            other => JsonRpcErrorObject::server_error(other.code(), &other.to_string(), None),
        }
    }

    /// Create a JSON-RPC error response for this MCP error
    pub fn to_json_rpc_response(&self, id: Option<RequestId>) -> JsonRpcError {
        JsonRpcError::new(id, self.to_error_object())
    }
}

impl ToJsonRpcError for McpError {
    fn to_error_object(&self) -> JsonRpcErrorObject {
        McpError::to_error_object(self)
    }
}

impl From<serde_json::Error> for McpError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("Serialization error: {}", err))
    }
}

//! Error types for the kestrel client

use serde_json::Value;
use thiserror::Error;

use crate::http_parser::HttpParseError;

/// Result type for client operations
pub type McpClientResult<T> = Result<T, McpClientError>;

#[derive(Error, Debug)]
pub enum McpClientError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation timed out")]
    Timeout,

    /// The server answered with a JSON-RPC error object
    #[error("Server error (code {code}): {message}")]
    ServerError {
        code: i64,
        message: String,
        data: Option<Value>,
    },
}

/// Failures below the JSON-RPC layer
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(#[from] std::io::Error),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Malformed HTTP response: {0}")]
    Parse(#[from] HttpParseError),

    #[error("Transport closed unexpectedly")]
    Closed,
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid JSON-RPC response: {0}")]
    InvalidResponse(String),

    #[error("Response id {actual} does not match request id {expected}")]
    IdMismatch { expected: i64, actual: String },
}

impl McpClientError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn server_error(code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self::ServerError {
            code,
            message: message.into(),
            data,
        }
    }

    /// Whether a later attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(TransportError::ConnectionFailed(_)) => true,
            Self::Transport(TransportError::Closed) => true,
            Self::Transport(TransportError::Http { status, .. }) => *status >= 500,
            Self::Timeout => true,
            _ => false,
        }
    }

    pub fn error_code(&self) -> Option<i64> {
        match self {
            Self::ServerError { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<std::io::Error> for McpClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(TransportError::ConnectionFailed(err))
    }
}

impl From<HttpParseError> for McpClientError {
    fn from(err: HttpParseError) -> Self {
        Self::Transport(TransportError::Parse(err))
    }
}

impl From<tokio::time::error::Elapsed> for McpClientError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::Timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(McpClientError::from(refused).is_retryable());
        assert!(McpClientError::Timeout.is_retryable());
        assert!(
            McpClientError::Transport(TransportError::Http {
                status: 503,
                body: String::new()
            })
            .is_retryable()
        );
        assert!(
            !McpClientError::Transport(TransportError::Http {
                status: 404,
                body: "Session not found".into()
            })
            .is_retryable()
        );
        assert!(!McpClientError::server_error(-32601, "Method not found", None).is_retryable());
    }

    #[test]
    fn test_error_code() {
        let err = McpClientError::server_error(-32003, "Forbidden", None);
        assert_eq!(err.error_code(), Some(-32003));
        assert_eq!(err.to_string(), "Server error (code -32003): Forbidden");
        assert_eq!(McpClientError::Timeout.error_code(), None);
    }
}

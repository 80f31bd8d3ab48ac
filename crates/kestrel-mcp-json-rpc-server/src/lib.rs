//! # JSON-RPC 2.0 layer for kestrel
//!
//! Transport-agnostic envelope types, message recognition and an async
//! method dispatcher. The MCP method surface is built on top of this crate;
//! nothing here knows about HTTP or sessions beyond an opaque context.
//!
//! ## Features
//! - Request / notification / response recognition with the standard error codes
//! - `JsonRpcHandler` trait and `JsonRpcDispatcher` (feature `async`, on by default)
//! - One error-code table shared by every kestrel crate ([`error_codes`])

pub mod dispatch;
pub mod error;
pub mod notification;
pub mod request;
pub mod response;
pub mod types;

#[cfg(feature = "async")]
pub mod r#async;

pub mod prelude;

pub use dispatch::{JsonRpcMessage, JsonRpcMessageResult, parse_json_rpc_message};
pub use error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject, JsonRpcTransportError};
pub use notification::JsonRpcNotification;
pub use request::{JsonRpcRequest, RequestParams};
pub use response::{JsonRpcReply, JsonRpcResponse};
pub use types::{JsonRpcVersion, RequestId};

#[cfg(feature = "async")]
pub use r#async::{JsonRpcDispatcher, JsonRpcHandler, SessionContext, ToJsonRpcError};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Error codes used on the wire.
///
/// The standard JSON-RPC codes plus the application range -32001..=-32005.
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    pub const UNAUTHORIZED: i64 = -32001;
    pub const RESOURCE_NOT_FOUND: i64 = -32002;
    pub const FORBIDDEN: i64 = -32003;
    pub const TOOL_NOT_FOUND: i64 = -32004;
    pub const TOOL_EXECUTION: i64 = -32005;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;
}

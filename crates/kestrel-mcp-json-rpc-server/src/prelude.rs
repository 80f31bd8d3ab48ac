//! Common re-exports.
//!
//! ```rust
//! use kestrel_mcp_json_rpc_server::prelude::*;
//! ```

pub use crate::dispatch::{JsonRpcMessage, JsonRpcMessageResult, parse_json_rpc_message};
pub use crate::error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject};
pub use crate::notification::JsonRpcNotification;
pub use crate::request::{JsonRpcRequest, RequestParams};
pub use crate::response::{JsonRpcReply, JsonRpcResponse};
pub use crate::types::{JsonRpcVersion, RequestId};

#[cfg(feature = "async")]
pub use crate::r#async::{JsonRpcDispatcher, JsonRpcHandler, SessionContext, ToJsonRpcError};

pub use crate::error_codes::*;

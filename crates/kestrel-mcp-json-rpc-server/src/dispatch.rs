use serde_json::Value;

use crate::{
    error::{JsonRpcError, JsonRpcErrorObject},
    notification::JsonRpcNotification,
    request::JsonRpcRequest,
    response::{JsonRpcReply, JsonRpcResponse},
    types::RequestId,
};

/// An inbound JSON-RPC message, classified by shape.
#[derive(Debug, Clone)]
pub enum JsonRpcMessage {
    /// Has `id` and `method`
    Request(JsonRpcRequest),
    /// Has `method` but no `id`
    Notification(JsonRpcNotification),
    /// Has `result` or `error`; servers accept and ignore these
    Response(JsonRpcReply),
}

/// Outcome of processing one message
#[derive(Debug, Clone)]
pub enum JsonRpcMessageResult {
    /// A response to a request
    Response(JsonRpcResponse),
    /// An error response
    Error(JsonRpcError),
    /// No response needed (notifications, stray responses)
    NoResponse,
}

impl JsonRpcMessageResult {
    /// Convert to JSON string if there's a response to send
    pub fn to_json_string(&self) -> Option<String> {
        let encoded = match self {
            JsonRpcMessageResult::Response(response) => serde_json::to_string(response),
            JsonRpcMessageResult::Error(error) => serde_json::to_string(error),
            JsonRpcMessageResult::NoResponse => return None,
        };
        match encoded {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::error!("Failed to serialize JSON-RPC response: {}", e);
                None
            }
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, JsonRpcMessageResult::Error(_))
    }

    pub fn needs_response(&self) -> bool {
        !matches!(self, JsonRpcMessageResult::NoResponse)
    }
}

impl From<JsonRpcReply> for JsonRpcMessageResult {
    fn from(reply: JsonRpcReply) -> Self {
        match reply {
            JsonRpcReply::Response(response) => JsonRpcMessageResult::Response(response),
            JsonRpcReply::Error(error) => JsonRpcMessageResult::Error(error),
        }
    }
}

/// Parse a JSON string into a JSON-RPC message.
///
/// Malformed JSON yields a parse error (-32700). A JSON value that is not a
/// well-formed 2.0 envelope yields an invalid request (-32600) carrying the
/// request id whenever one can be recovered.
pub fn parse_json_rpc_message(json_str: &str) -> Result<JsonRpcMessage, JsonRpcError> {
    let value: Value = serde_json::from_str(json_str).map_err(|_| JsonRpcError::parse_error())?;
    classify(value)
}

/// Classify an already-parsed JSON value.
pub fn classify(value: Value) -> Result<JsonRpcMessage, JsonRpcError> {
    let Some(obj) = value.as_object() else {
        return Err(JsonRpcError::invalid_request(None));
    };

    let id = obj.get("id").and_then(RequestId::from_value);

    match obj.get("jsonrpc") {
        Some(version) if version == "2.0" => {}
        _ => return Err(JsonRpcError::invalid_request(id)),
    }

    if !obj.contains_key("method") {
        if obj.contains_key("result") || obj.contains_key("error") {
            return serde_json::from_value::<JsonRpcReply>(value)
                .map(JsonRpcMessage::Response)
                .map_err(|_| JsonRpcError::invalid_request(id));
        }
        return Err(JsonRpcError::new(
            id,
            JsonRpcErrorObject::invalid_request(Some("Missing method".to_string())),
        ));
    }

    if obj.contains_key("id") {
        serde_json::from_value::<JsonRpcRequest>(value)
            .map(JsonRpcMessage::Request)
            .map_err(|_| JsonRpcError::invalid_request(id))
    } else {
        serde_json::from_value::<JsonRpcNotification>(value)
            .map(JsonRpcMessage::Notification)
            .map_err(|_| JsonRpcError::invalid_request(None))
    }
}

impl JsonRpcMessage {
    /// Method name, if the message carries one
    pub fn method(&self) -> Option<&str> {
        match self {
            JsonRpcMessage::Request(req) => Some(&req.method),
            JsonRpcMessage::Notification(notif) => Some(&notif.method),
            JsonRpcMessage::Response(_) => None,
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self, JsonRpcMessage::Request(_))
    }

    pub fn is_notification(&self) -> bool {
        matches!(self, JsonRpcMessage::Notification(_))
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            JsonRpcMessage::Request(req) => Some(&req.id),
            JsonRpcMessage::Notification(_) => None,
            JsonRpcMessage::Response(reply) => reply.id(),
        }
    }
}

pub fn create_success_response(id: RequestId, result: Value) -> JsonRpcMessageResult {
    JsonRpcMessageResult::Response(JsonRpcResponse::success(id, result))
}

pub fn create_error_response(
    id: Option<RequestId>,
    code: i64,
    message: &str,
) -> JsonRpcMessageResult {
    let error_obj = JsonRpcErrorObject {
        code,
        message: message.to_string(),
        data: None,
    };
    JsonRpcMessageResult::Error(JsonRpcError::new(id, error_obj))
}

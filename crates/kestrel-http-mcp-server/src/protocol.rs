//! Header helpers for the Streamable HTTP wire format

use http::header::{ACCEPT, ORIGIN};
use http::{HeaderMap, HeaderName};
use serde::Deserialize;

pub const MCP_SESSION_ID_HEADER: &str = "Mcp-Session-Id";
/// `Mcp-Session-Id` in the lowercase form `HeaderMap` inserts require
pub const MCP_SESSION_ID: HeaderName = HeaderName::from_static("mcp-session-id");
pub const LAST_EVENT_ID_HEADER: &str = "Last-Event-ID";
pub const EVENT_STREAM_MIME: &str = "text/event-stream";
pub const JSON_MIME: &str = "application/json";

/// Extract MCP session ID from HTTP request headers
///
/// Header name lookup is ASCII case-insensitive.
pub fn extract_session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(MCP_SESSION_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Extract Last-Event-ID for SSE resumability.
///
/// Ids outside `[A-Za-z0-9_-]` are ignored.
pub fn extract_last_event_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(LAST_EVENT_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| is_valid_event_id(s))
        .map(|s| s.to_string())
}

pub fn is_valid_event_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

pub fn extract_origin(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ORIGIN)
        .and_then(|h| h.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Whether any `Accept` header lists `text/event-stream`
pub fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .any(|accept| {
            accept
                .split(',')
                .any(|part| part.trim().to_ascii_lowercase().starts_with(EVENT_STREAM_MIME))
        })
}

#[derive(Deserialize)]
struct MessageShape {
    method: Option<String>,
}

/// The `method` of a JSON-RPC body, if it is an object carrying one
pub fn peek_method(body: &str) -> Option<String> {
    serde_json::from_str::<MessageShape>(body)
        .ok()
        .and_then(|shape| shape.method)
}

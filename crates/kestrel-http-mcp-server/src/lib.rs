//! # Streamable HTTP transport
//!
//! This crate carries MCP JSON-RPC traffic over a single HTTP endpoint
//! (protocol revision 2025-03-26). POST delivers one message and receives
//! either a JSON body or a single SSE event; GET opens a long-lived SSE
//! stream; DELETE terminates a session; OPTIONS answers CORS preflight.
//!
//! ## Features
//! - Session binding through the `Mcp-Session-Id` header
//! - Bounded per-session event buffers with `Last-Event-ID` replay
//! - Heartbeat comments and broadcast fan-out to connected SSE clients
//! - Origin validation with `host:*` wildcards and a cached CORS header set
//! - Optional legacy routes and a static file mount
//!
//! Message semantics live behind [`MessageHandler`]; the transport only
//! moves bytes and manages connection state.

pub mod client_registry;
pub mod config;
pub mod cors;
pub mod handler;
pub mod origin;
pub mod protocol;
pub mod sse;
pub mod static_files;
pub mod stream_context;
pub mod transport;

#[cfg(test)]
mod tests;

pub use client_registry::{ClientRegistry, ConnectionId, SseConnection};
pub use config::TransportConfig;
pub use cors::{CorsHeaderCache, CorsSettings};
pub use handler::MessageHandler;
pub use origin::AllowedOrigins;
pub use protocol::{
    MCP_SESSION_ID, MCP_SESSION_ID_HEADER, accepts_event_stream, extract_last_event_id, extract_origin,
    extract_session_id,
};
pub use sse::{HEARTBEAT_FRAME, SseBody, SseEvent};
pub use static_files::StaticFiles;
pub use stream_context::SseStreamContext;
pub use transport::{StreamableHttpTransport, TransportStats};

pub use kestrel_mcp_session_storage::{SessionManager, SessionState};

/// Result type for HTTP transport operations
pub type Result<T> = std::result::Result<T, HttpMcpError>;

/// HTTP transport errors
#[derive(Debug, thiserror::Error)]
pub enum HttpMcpError {
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport already running on {0}")]
    AlreadyRunning(std::net::SocketAddr),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

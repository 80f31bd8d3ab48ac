//! Client connection state

use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    /// Requests succeed; no event stream is open
    Connected,
    SseConnecting,
    SseConnected,
    /// Waiting out the backoff before reopening the event stream
    Reconnecting,
    Error,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected | Self::SseConnected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::SseConnecting => "sse_connecting",
            Self::SseConnected => "sse_connected",
            Self::Reconnecting => "reconnecting",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Called with `(previous, current)` on every state change
pub type StateCallback = Arc<dyn Fn(ConnectionState, ConnectionState) + Send + Sync>;

//! The seam between the transport and the MCP method layer

use async_trait::async_trait;
use serde_json::Value;

/// Processes JSON-RPC bodies delivered by the transport.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Handle one raw message body.
    ///
    /// Returns the serialized response, or `None` for notifications.
    async fn handle_message(&self, body: &str, session_id: Option<&str>) -> Option<String>;

    /// The `list_tools` result served on the legacy `/tools` route
    async fn list_tools(&self) -> Value;
}

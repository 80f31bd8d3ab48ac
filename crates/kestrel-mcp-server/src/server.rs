//! MCP Server Core
//!
//! Ties the registry and the JSON-RPC dispatcher together and exposes the
//! result to the HTTP transport through [`MessageHandler`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use kestrel_http_mcp_server::{MessageHandler, StreamableHttpTransport, TransportConfig};
use kestrel_mcp_json_rpc_server::dispatch::classify;
use kestrel_mcp_json_rpc_server::{
    JsonRpcDispatcher, JsonRpcError, JsonRpcMessageResult, RequestId, SessionContext,
};

use crate::auth::{AuthContext, api_key_matches, extract_api_key};
use crate::builder::McpServerBuilder;
use crate::context::RequestContext;
use crate::error::McpError;
use crate::registry::ServerRegistry;
use crate::Result;

/// A built MCP server, ready to be mounted on a transport
pub struct McpServer {
    name: String,
    version: String,
    registry: Arc<ServerRegistry>,
    dispatcher: Arc<JsonRpcDispatcher<McpError>>,
    api_key: Option<String>,
    api_key_roles: Vec<String>,
}

impl McpServer {
    pub(crate) fn new(
        name: String,
        version: String,
        registry: Arc<ServerRegistry>,
        dispatcher: JsonRpcDispatcher<McpError>,
        api_key: Option<String>,
        api_key_roles: Vec<String>,
    ) -> Self {
        Self {
            name,
            version,
            registry,
            dispatcher: Arc::new(dispatcher),
            api_key,
            api_key_roles,
        }
    }

    /// Create a new server builder
    pub fn builder() -> McpServerBuilder {
        McpServerBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn registry(&self) -> &Arc<ServerRegistry> {
        &self.registry
    }

    pub fn registered_methods(&self) -> Vec<String> {
        let mut methods = self.dispatcher.registered_methods();
        methods.sort();
        methods
    }

    /// Resolve the caller's identity from a raw envelope.
    pub fn authenticate(&self, message: &Value) -> std::result::Result<AuthContext, McpError> {
        let Some(expected) = &self.api_key else {
            return Ok(AuthContext::anonymous());
        };
        match extract_api_key(message) {
            Some(presented) if api_key_matches(expected, presented) => {
                Ok(AuthContext::authenticated(self.api_key_roles.clone()))
            }
            _ => Err(McpError::Unauthorized),
        }
    }

    /// Process one already-parsed message.
    pub async fn handle_value(&self, message: Value, session_id: Option<String>) -> JsonRpcMessageResult {
        let auth = match self.authenticate(&message) {
            Ok(auth) => auth,
            Err(err) => {
                let id = message.get("id").and_then(RequestId::from_value);
                if id.is_none() && message.get("method").is_some() {
                    warn!("Dropping unauthenticated notification");
                    return JsonRpcMessageResult::NoResponse;
                }
                info!(session_id = ?session_id, "Rejected request with bad API key");
                return JsonRpcMessageResult::Error(err.to_json_rpc_response(id));
            }
        };

        let parsed = match classify(message) {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!(code = err.error.code, "Invalid JSON-RPC envelope");
                return JsonRpcMessageResult::Error(err);
            }
        };

        let context = SessionContext::new(session_id).with_extension(auth);
        self.dispatcher.handle_message(parsed, context).await
    }

    /// Process one message body; `None` when no response is due.
    pub async fn handle_str(&self, body: &str, session_id: Option<String>) -> Option<String> {
        let result = match serde_json::from_str::<Value>(body) {
            Ok(message) => self.handle_value(message, session_id).await,
            Err(err) => {
                debug!("Malformed JSON body: {}", err);
                JsonRpcMessageResult::Error(JsonRpcError::parse_error())
            }
        };
        result.to_json_string()
    }

    /// The `list_tools` result for an unrestricted caller
    pub fn tools_listing(&self) -> Value {
        let ctx = RequestContext::default();
        let tools: Vec<Value> = self
            .registry
            .list_tools(&ctx)
            .iter()
            .map(|t| t.to_json())
            .collect();
        json!({"tools": tools})
    }

    /// Mount this server on a Streamable HTTP transport.
    pub fn transport(self, config: TransportConfig) -> StreamableHttpTransport {
        StreamableHttpTransport::new(config, Arc::new(self))
    }

    /// Serve on `config` until Ctrl-C.
    pub async fn run(self, config: TransportConfig) -> Result<()> {
        info!("Starting MCP server: {} v{}", self.name, self.version);
        let transport = self.transport(config);
        let addr = transport.start().await?;
        info!("MCP server listening on http://{}", addr);

        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutting down MCP server");
        transport.stop().await;
        Ok(())
    }
}

#[async_trait]
impl MessageHandler for McpServer {
    async fn handle_message(&self, body: &str, session_id: Option<&str>) -> Option<String> {
        self.handle_str(body, session_id.map(str::to_string)).await
    }

    async fn list_tools(&self) -> Value {
        self.tools_listing()
    }
}

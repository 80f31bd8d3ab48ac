//! MCP method handlers
//!
//! Each handler serves one method under its legacy name and its MCP alias.
//! [`McpHandlerBridge`] adapts them to the JSON-RPC dispatcher.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use kestrel_mcp_json_rpc_server::{JsonRpcHandler, RequestParams, SessionContext};

use crate::auth::AuthContext;
use crate::context::RequestContext;
use crate::error::{McpError, McpResult};
use crate::registry::ServerRegistry;
use crate::MCP_PROTOCOL_VERSION;

/// Generic MCP handler trait
#[async_trait]
pub trait McpHandler: Send + Sync {
    async fn handle(&self, params: Option<Value>, ctx: RequestContext) -> McpResult<Value>;

    /// Get the methods this handler supports
    fn supported_methods(&self) -> Vec<String>;
}

/// Adapts an [`McpHandler`] to [`JsonRpcHandler`], recovering the caller's
/// [`AuthContext`] from the session context extension.
pub struct McpHandlerBridge {
    handler: Arc<dyn McpHandler>,
}

impl McpHandlerBridge {
    pub fn new(handler: Arc<dyn McpHandler>) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl JsonRpcHandler for McpHandlerBridge {
    type Error = McpError;

    async fn handle(
        &self,
        method: &str,
        params: Option<RequestParams>,
        session_context: Option<SessionContext>,
    ) -> Result<Value, McpError> {
        debug!(method = %method, "Dispatching MCP method");
        let ctx = match session_context {
            Some(session) => {
                let auth = session.extension::<AuthContext>().cloned().unwrap_or_default();
                RequestContext::new(session.session_id, auth)
            }
            None => RequestContext::default(),
        };
        self.handler.handle(params.map(|p| p.to_value()), ctx).await
    }

    fn supported_methods(&self) -> Vec<String> {
        self.handler.supported_methods()
    }
}

fn methods(names: &[&str]) -> Vec<String> {
    names.iter().map(|m| m.to_string()).collect()
}

fn required_param<'a>(params: &'a Option<Value>, name: &str) -> McpResult<&'a str> {
    params
        .as_ref()
        .and_then(|p| p.get(name))
        .and_then(Value::as_str)
        .ok_or_else(|| McpError::missing_param(name))
}

pub struct PingHandler;

#[async_trait]
impl McpHandler for PingHandler {
    async fn handle(&self, _params: Option<Value>, _ctx: RequestContext) -> McpResult<Value> {
        Ok(json!({"message": "pong"}))
    }

    fn supported_methods(&self) -> Vec<String> {
        methods(&["ping"])
    }
}

pub struct InitializeHandler {
    name: String,
    version: String,
}

impl InitializeHandler {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

#[async_trait]
impl McpHandler for InitializeHandler {
    async fn handle(&self, _params: Option<Value>, _ctx: RequestContext) -> McpResult<Value> {
        Ok(json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {"resources": {}, "tools": {}},
            "serverInfo": {"name": self.name, "version": self.version},
        }))
    }

    fn supported_methods(&self) -> Vec<String> {
        methods(&["initialize"])
    }
}

/// Accepts `notifications/initialized` so it is not logged as unknown
pub struct InitializedNotificationHandler;

#[async_trait]
impl JsonRpcHandler for InitializedNotificationHandler {
    type Error = McpError;

    async fn handle(
        &self,
        method: &str,
        _params: Option<RequestParams>,
        _session_context: Option<SessionContext>,
    ) -> Result<Value, McpError> {
        Err(McpError::handler(
            kestrel_mcp_json_rpc_server::error_codes::METHOD_NOT_FOUND,
            format!("Method '{}' is a notification", method),
        ))
    }

    async fn handle_notification(
        &self,
        _method: &str,
        _params: Option<RequestParams>,
        session_context: Option<SessionContext>,
    ) -> Result<(), McpError> {
        debug!(
            session_id = ?session_context.and_then(|c| c.session_id),
            "Client initialized"
        );
        Ok(())
    }

    fn supported_methods(&self) -> Vec<String> {
        methods(&["notifications/initialized"])
    }
}

pub struct ListResourcesHandler {
    registry: Arc<ServerRegistry>,
}

impl ListResourcesHandler {
    pub fn new(registry: Arc<ServerRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl McpHandler for ListResourcesHandler {
    async fn handle(&self, _params: Option<Value>, ctx: RequestContext) -> McpResult<Value> {
        let resources = self.registry.list_resources(&ctx);
        Ok(json!({"resources": resources}))
    }

    fn supported_methods(&self) -> Vec<String> {
        methods(&["list_resources", "resources/list"])
    }
}

pub struct ListResourceTemplatesHandler {
    registry: Arc<ServerRegistry>,
}

impl ListResourceTemplatesHandler {
    pub fn new(registry: Arc<ServerRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl McpHandler for ListResourceTemplatesHandler {
    async fn handle(&self, _params: Option<Value>, ctx: RequestContext) -> McpResult<Value> {
        let templates = self.registry.list_templates(&ctx);
        Ok(json!({"resourceTemplates": templates}))
    }

    fn supported_methods(&self) -> Vec<String> {
        methods(&["list_resource_templates", "resources/templates/list"])
    }
}

pub struct ReadResourceHandler {
    registry: Arc<ServerRegistry>,
}

impl ReadResourceHandler {
    pub fn new(registry: Arc<ServerRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl McpHandler for ReadResourceHandler {
    async fn handle(&self, params: Option<Value>, ctx: RequestContext) -> McpResult<Value> {
        let uri = required_param(&params, "uri")?;
        let items = self.registry.read_resource(uri, &ctx).await?;
        let contents: Vec<Value> = items.iter().map(|item| item.to_json(Some(uri))).collect();
        Ok(json!({"contents": contents}))
    }

    fn supported_methods(&self) -> Vec<String> {
        methods(&["read_resource", "resources/read"])
    }
}

pub struct ListToolsHandler {
    registry: Arc<ServerRegistry>,
}

impl ListToolsHandler {
    pub fn new(registry: Arc<ServerRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl McpHandler for ListToolsHandler {
    async fn handle(&self, _params: Option<Value>, ctx: RequestContext) -> McpResult<Value> {
        let tools: Vec<Value> = self
            .registry
            .list_tools(&ctx)
            .iter()
            .map(|t| t.to_json())
            .collect();
        Ok(json!({"tools": tools}))
    }

    fn supported_methods(&self) -> Vec<String> {
        methods(&["list_tools", "tools/list"])
    }
}

pub struct CallToolHandler {
    registry: Arc<ServerRegistry>,
}

impl CallToolHandler {
    pub fn new(registry: Arc<ServerRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl McpHandler for CallToolHandler {
    async fn handle(&self, params: Option<Value>, ctx: RequestContext) -> McpResult<Value> {
        let name = required_param(&params, "name")?;
        let arguments = params
            .as_ref()
            .and_then(|p| p.get("arguments"))
            .cloned()
            .unwrap_or_else(|| json!({}));
        if !arguments.is_object() {
            return Err(McpError::invalid_params("arguments must be an object"));
        }
        let result = self.registry.call_tool(name, arguments, &ctx).await?;
        Ok(result.to_json())
    }

    fn supported_methods(&self) -> Vec<String> {
        methods(&["call_tool", "tools/call"])
    }
}

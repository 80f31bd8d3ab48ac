//! Registered resources, templates and tools

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info};

use crate::cache::ResourceCache;
use crate::context::RequestContext;
use crate::error::{McpError, McpResult};
use crate::model::{ContentItem, Resource, ResourceTemplate, Tool, ToolResult};
use crate::resource::McpResource;
use crate::router::TemplateRouter;
use crate::tool::McpTool;

/// Everything the MCP methods serve from.
///
/// Built once by [`crate::McpServerBuilder`] and read-only while serving.
pub struct ServerRegistry {
    resources: Vec<Resource>,
    resource_handlers: HashMap<String, Arc<dyn McpResource>>,
    templates: Vec<ResourceTemplate>,
    router: TemplateRouter,
    tools: Vec<Arc<dyn McpTool>>,
    tool_index: HashMap<String, usize>,
    default_resource_handler: Option<Arc<dyn McpResource>>,
    cache: ResourceCache,
}

impl ServerRegistry {
    pub(crate) fn new(cache: ResourceCache) -> Self {
        Self {
            resources: Vec::new(),
            resource_handlers: HashMap::new(),
            templates: Vec::new(),
            router: TemplateRouter::new(),
            tools: Vec::new(),
            tool_index: HashMap::new(),
            default_resource_handler: None,
            cache,
        }
    }

    pub(crate) fn add_resource(&mut self, resource: Resource, handler: Option<Arc<dyn McpResource>>) {
        if let Some(handler) = handler {
            self.resource_handlers.insert(resource.uri.clone(), handler);
        }
        match self.resources.iter_mut().find(|r| r.uri == resource.uri) {
            Some(existing) => *existing = resource,
            None => self.resources.push(resource),
        }
    }

    pub(crate) fn add_tool(&mut self, tool: Arc<dyn McpTool>) {
        let name = tool.tool().name;
        match self.tool_index.get(&name) {
            Some(&pos) => self.tools[pos] = tool,
            None => {
                self.tool_index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub(crate) fn add_template(&mut self, template: ResourceTemplate) {
        match self
            .templates
            .iter_mut()
            .find(|t| t.uri_template == template.uri_template)
        {
            Some(existing) => *existing = template,
            None => self.templates.push(template),
        }
    }

    pub(crate) fn router_mut(&mut self) -> &mut TemplateRouter {
        &mut self.router
    }

    pub(crate) fn set_default_resource_handler(&mut self, handler: Arc<dyn McpResource>) {
        self.default_resource_handler = Some(handler);
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn templates(&self) -> &[ResourceTemplate] {
        &self.templates
    }

    pub fn router(&self) -> &TemplateRouter {
        &self.router
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    pub fn tool(&self, name: &str) -> Option<&Arc<dyn McpTool>> {
        self.tool_index.get(name).map(|&pos| &self.tools[pos])
    }

    pub fn tool_descriptors(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| t.tool()).collect()
    }

    /// Resources the caller may read
    pub fn list_resources(&self, ctx: &RequestContext) -> Vec<&Resource> {
        self.resources
            .iter()
            .filter(|r| ctx.auth.is_resource_allowed(&r.uri))
            .collect()
    }

    /// Templates whose pattern the caller's allow-list covers
    pub fn list_templates(&self, ctx: &RequestContext) -> Vec<&ResourceTemplate> {
        self.templates
            .iter()
            .filter(|t| ctx.auth.is_resource_allowed(&t.uri_template))
            .collect()
    }

    pub fn list_tools(&self, ctx: &RequestContext) -> Vec<Tool> {
        self.tools
            .iter()
            .map(|t| t.tool())
            .filter(|t| ctx.auth.is_tool_allowed(&t.name))
            .collect()
    }

    /// Read a resource: allow-list, route, then cache or handler.
    ///
    /// Routing runs before the cache lookup so template ACLs and validators
    /// apply to every caller, including those served from cache.
    pub async fn read_resource(&self, uri: &str, ctx: &RequestContext) -> McpResult<Vec<ContentItem>> {
        if !ctx.auth.is_resource_allowed(uri) {
            info!(uri = %uri, caller = %ctx.auth.identifier, "Resource read denied");
            return Err(McpError::Forbidden(uri.to_string()));
        }

        let (handler, handler_ctx) = self.resolve(uri, ctx)?;

        self.cache
            .get_or_fetch(uri, || {
                let handler = handler.clone();
                let handler_ctx = handler_ctx.clone();
                async move { handler.read(uri, &handler_ctx).await }
            })
            .await
    }

    fn resolve(&self, uri: &str, ctx: &RequestContext) -> McpResult<(Arc<dyn McpResource>, RequestContext)> {
        if let Some(handler) = self.resource_handlers.get(uri) {
            return Ok((handler.clone(), ctx.clone()));
        }

        if let Some(hit) = self.router.route(uri, &ctx.auth)? {
            debug!(uri = %uri, template = %hit.template, "Routed resource read");
            let routed = ctx.clone().with_template(hit.template, hit.params);
            return Ok((hit.handler, routed));
        }

        if let Some(handler) = &self.default_resource_handler {
            return Ok((handler.clone(), ctx.clone()));
        }

        if self.resources.iter().any(|r| r.uri == uri) {
            error!(uri = %uri, "Registered resource has no handler");
            return Err(McpError::internal(format!("no handler for {}", uri)));
        }
        Err(McpError::ResourceNotFound(uri.to_string()))
    }

    /// Invoke a tool after the allow-list and required-argument checks.
    pub async fn call_tool(&self, name: &str, arguments: Value, ctx: &RequestContext) -> McpResult<ToolResult> {
        let tool = self
            .tool(name)
            .ok_or_else(|| McpError::ToolNotFound(name.to_string()))?;

        if !ctx.auth.is_tool_allowed(name) {
            info!(tool = %name, caller = %ctx.auth.identifier, "Tool call denied");
            return Err(McpError::Forbidden(name.to_string()));
        }

        let descriptor = tool.tool();
        for param in descriptor.params.iter().filter(|p| p.required) {
            if arguments.get(&param.name).is_none_or(Value::is_null) {
                return Err(McpError::missing_param(&param.name));
            }
        }

        match tool.call(arguments, ctx).await {
            Ok(result) => Ok(result),
            Err(McpError::Internal(message)) => {
                error!(tool = %name, "Tool failed: {}", message);
                Err(McpError::ToolExecution(message))
            }
            Err(other) => Err(other),
        }
    }
}

//! MCP Server Builder
//!
//! This module provides a builder pattern for creating MCP servers.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use kestrel_mcp_json_rpc_server::JsonRpcDispatcher;

use crate::cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL, EXTENDED_CACHE_TTL, ResourceCache};
use crate::error::McpError;
use crate::handlers::*;
use crate::model::{Resource, ResourceTemplate};
use crate::registry::ServerRegistry;
use crate::resource::McpResource;
use crate::router::TemplateValidator;
use crate::tool::McpTool;
use crate::uri_template::detect_mime_type;
use crate::{McpFrameworkError, McpServer, Result};

/// Builder for MCP servers
pub struct McpServerBuilder {
    name: String,
    version: String,

    resources: Vec<(Resource, Option<Arc<dyn McpResource>>)>,
    templates: Vec<(ResourceTemplate, Arc<dyn McpResource>)>,
    tools: Vec<Arc<dyn McpTool>>,
    default_resource_handler: Option<Arc<dyn McpResource>>,

    /// Template ACLs and validators, applied after all templates are added
    template_acls: Vec<(String, Vec<String>)>,
    template_validators: Vec<(String, TemplateValidator)>,
    default_validator: Option<TemplateValidator>,

    api_key: Option<String>,
    api_key_roles: Vec<String>,

    cache_capacity: usize,
    cache_ttl: Duration,
    cache_extended_ttl: Duration,
}

impl McpServerBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            name: "kestrel-mcp-server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            resources: Vec::new(),
            templates: Vec::new(),
            tools: Vec::new(),
            default_resource_handler: None,
            template_acls: Vec::new(),
            template_validators: Vec::new(),
            default_validator: None,
            api_key: None,
            api_key_roles: vec!["user".to_string()],
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_extended_ttl: EXTENDED_CACHE_TTL,
        }
    }

    /// Set the server name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the server version
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// List a static resource. Reads fall through to templates and the
    /// default handler unless [`Self::resource_with_handler`] is used.
    pub fn resource(mut self, resource: Resource) -> Self {
        self.resources.push((resource, None));
        self
    }

    pub fn resource_with_handler(mut self, resource: Resource, handler: impl McpResource + 'static) -> Self {
        self.resources.push((resource, Some(Arc::new(handler))));
        self
    }

    /// Register a template and the handler its matches route to.
    /// A template without a MIME type gets one from its extension, if any.
    pub fn resource_template(mut self, mut template: ResourceTemplate, handler: impl McpResource + 'static) -> Self {
        if template.mime_type.is_none() {
            template.mime_type = detect_mime_type(&template.uri_template).map(str::to_string);
        }
        self.templates.push((template, Arc::new(handler)));
        self
    }

    /// Handler for reads nothing else claims
    pub fn default_resource_handler(mut self, handler: impl McpResource + 'static) -> Self {
        self.default_resource_handler = Some(Arc::new(handler));
        self
    }

    pub fn tool(mut self, tool: impl McpTool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn tools<I, T>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: McpTool + 'static,
    {
        for tool in tools {
            self.tools.push(Arc::new(tool));
        }
        self
    }

    /// Restrict a registered template to callers holding one of `roles`
    pub fn template_acl<I, S>(mut self, template: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.template_acls
            .push((template.into(), roles.into_iter().map(Into::into).collect()));
        self
    }

    pub fn template_validator<F>(mut self, template: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&str, &Map<String, Value>) -> bool + Send + Sync + 'static,
    {
        let validator: TemplateValidator = Arc::new(validator);
        self.template_validators.push((template.into(), validator));
        self
    }

    pub fn default_template_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&str, &Map<String, Value>) -> bool + Send + Sync + 'static,
    {
        let validator: TemplateValidator = Arc::new(validator);
        self.default_validator = Some(validator);
        self
    }

    /// Require `apiKey` on every message
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Roles granted to callers presenting the API key (default `["user"]`)
    pub fn api_key_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.api_key_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn cache_extended_ttl(mut self, ttl: Duration) -> Self {
        self.cache_extended_ttl = ttl;
        self
    }

    /// Build the MCP server
    pub fn build(self) -> Result<McpServer> {
        if self.name.is_empty() {
            return Err(McpFrameworkError::Config("Server name cannot be empty".to_string()));
        }
        if self.version.is_empty() {
            return Err(McpFrameworkError::Config("Server version cannot be empty".to_string()));
        }
        if self.api_key.as_deref() == Some("") {
            return Err(McpFrameworkError::Config("API key cannot be empty".to_string()));
        }

        let cache = ResourceCache::new(self.cache_capacity, self.cache_ttl)
            .with_extended_ttl(self.cache_extended_ttl);
        let mut registry = ServerRegistry::new(cache);

        for (resource, handler) in self.resources {
            registry.add_resource(resource, handler);
        }
        for (template, handler) in self.templates {
            registry
                .router_mut()
                .add(&template.uri_template, handler)
                .map_err(|e| {
                    McpFrameworkError::Config(format!("Invalid template '{}': {}", template.uri_template, e))
                })?;
            registry.add_template(template);
        }
        for (template, roles) in self.template_acls {
            if !registry.router_mut().set_acl(&template, roles) {
                return Err(McpFrameworkError::Config(format!("ACL for unknown template '{}'", template)));
            }
        }
        for (template, validator) in self.template_validators {
            if !registry.router_mut().set_validator(&template, validator) {
                return Err(McpFrameworkError::Config(format!(
                    "Validator for unknown template '{}'",
                    template
                )));
            }
        }
        if let Some(validator) = self.default_validator {
            registry.router_mut().set_default_validator(validator);
        }
        if let Some(handler) = self.default_resource_handler {
            registry.set_default_resource_handler(handler);
        }
        for tool in self.tools {
            registry.add_tool(tool);
        }

        let registry = Arc::new(registry);
        let mut dispatcher: JsonRpcDispatcher<McpError> = JsonRpcDispatcher::new();
        let handlers: Vec<Arc<dyn McpHandler>> = vec![
            Arc::new(PingHandler),
            Arc::new(InitializeHandler::new(&self.name, &self.version)),
            Arc::new(ListResourcesHandler::new(registry.clone())),
            Arc::new(ListResourceTemplatesHandler::new(registry.clone())),
            Arc::new(ReadResourceHandler::new(registry.clone())),
            Arc::new(ListToolsHandler::new(registry.clone())),
            Arc::new(CallToolHandler::new(registry.clone())),
        ];
        for handler in handlers {
            dispatcher.register_handler(McpHandlerBridge::new(handler));
        }
        dispatcher.register_handler(InitializedNotificationHandler);

        Ok(McpServer::new(
            self.name,
            self.version,
            registry,
            dispatcher,
            self.api_key,
            self.api_key_roles,
        ))
    }
}

impl Default for McpServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

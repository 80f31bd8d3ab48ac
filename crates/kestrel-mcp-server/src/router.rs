//! Template router with per-template ACLs and validators

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::auth::AuthContext;
use crate::error::{McpError, McpResult};
use crate::resource::McpResource;
use crate::uri_template::{CompiledTemplate, TemplateError, template_cache};

/// Accepts or rejects the parameters extracted for a template
pub type TemplateValidator = Arc<dyn Fn(&str, &Map<String, Value>) -> bool + Send + Sync>;

struct TemplateRoute {
    compiled: Arc<CompiledTemplate>,
    handler: Arc<dyn McpResource>,
    acl: Option<Vec<String>>,
    validator: Option<TemplateValidator>,
}

/// A successful routing decision
pub struct RouteMatch {
    pub template: String,
    pub params: Map<String, Value>,
    pub handler: Arc<dyn McpResource>,
}

impl std::fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteMatch")
            .field("template", &self.template)
            .field("params", &self.params)
            .finish()
    }
}

/// Routes resource URIs to template handlers in registration order.
#[derive(Default)]
pub struct TemplateRouter {
    routes: Vec<TemplateRoute>,
    index: HashMap<String, usize>,
    default_validator: Option<TemplateValidator>,
}

impl TemplateRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `template`, replacing any previous handler.
    pub fn add(&mut self, template: &str, handler: Arc<dyn McpResource>) -> Result<(), TemplateError> {
        let compiled = template_cache().get_or_compile(template)?;
        match self.index.get(template) {
            Some(&pos) => {
                self.routes[pos].compiled = compiled;
                self.routes[pos].handler = handler;
            }
            None => {
                self.index.insert(template.to_string(), self.routes.len());
                self.routes.push(TemplateRoute {
                    compiled,
                    handler,
                    acl: None,
                    validator: None,
                });
            }
        }
        debug!(template = %template, "Registered template route");
        Ok(())
    }

    /// Restrict `template` to callers holding one of `roles`.
    /// Returns false when the template is not registered.
    pub fn set_acl(&mut self, template: &str, roles: Vec<String>) -> bool {
        match self.route_mut(template) {
            Some(route) => {
                route.acl = Some(roles);
                true
            }
            None => false,
        }
    }

    pub fn set_validator(&mut self, template: &str, validator: TemplateValidator) -> bool {
        match self.route_mut(template) {
            Some(route) => {
                route.validator = Some(validator);
                true
            }
            None => false,
        }
    }

    /// Validator for templates that have none of their own
    pub fn set_default_validator(&mut self, validator: TemplateValidator) {
        self.default_validator = Some(validator);
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn templates(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.compiled.template())
    }

    /// Find the first template matching `uri` and apply its ACL and validator.
    ///
    /// `Ok(None)` means no template matched.
    pub fn route(&self, uri: &str, auth: &AuthContext) -> McpResult<Option<RouteMatch>> {
        let Some((route, params)) = self
            .routes
            .iter()
            .find_map(|route| route.compiled.extract(uri).map(|params| (route, params)))
        else {
            return Ok(None);
        };
        let template = route.compiled.template();

        if let Some(acl) = &route.acl {
            if !acl_admits(acl, &auth.roles) {
                info!(template = %template, caller = %auth.identifier, "Template ACL denied access");
                return Err(McpError::Forbidden(uri.to_string()));
            }
        }

        let validator = route.validator.as_ref().or(self.default_validator.as_ref());
        if let Some(validator) = validator {
            if !validator(template, &params) {
                debug!(template = %template, uri = %uri, "Template validator rejected parameters");
                return Err(McpError::invalid_params(format!(
                    "Parameters rejected for {}",
                    template
                )));
            }
        }

        Ok(Some(RouteMatch {
            template: template.to_string(),
            params,
            handler: route.handler.clone(),
        }))
    }

    fn route_mut(&mut self, template: &str) -> Option<&mut TemplateRoute> {
        let pos = *self.index.get(template)?;
        self.routes.get_mut(pos)
    }
}

/// Empty ACL is open; `*` admits any caller with at least one role.
fn acl_admits(acl: &[String], roles: &[String]) -> bool {
    if acl.is_empty() {
        return true;
    }
    acl.iter()
        .any(|allowed| (allowed == "*" && !roles.is_empty()) || roles.contains(allowed))
}

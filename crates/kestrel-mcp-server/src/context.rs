//! Per-request context handed to resource and tool handlers

use serde_json::{Map, Value};

use crate::auth::AuthContext;

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Session bound by the transport, if any
    pub session_id: Option<String>,
    pub auth: AuthContext,
    /// Template that routed a resource read
    pub template: Option<String>,
    /// Typed parameters extracted from the URI by `template`
    pub params: Map<String, Value>,
}

impl RequestContext {
    pub fn new(session_id: Option<String>, auth: AuthContext) -> Self {
        Self {
            session_id,
            auth,
            template: None,
            params: Map::new(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>, params: Map<String, Value>) -> Self {
        self.template = Some(template.into());
        self.params = params;
        self
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }

    pub fn param_i64(&self, name: &str) -> Option<i64> {
        self.params.get(name).and_then(Value::as_i64)
    }
}

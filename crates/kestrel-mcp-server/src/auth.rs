//! Caller identity and allow-list checks

use std::time::SystemTime;

use serde_json::Value;
use subtle::ConstantTimeEq;

/// Identity attached to every dispatched request
#[derive(Debug, Clone, PartialEq)]
pub struct AuthContext {
    pub identifier: String,
    pub roles: Vec<String>,
    /// Glob patterns of readable resource URIs
    pub allowed_resources: Vec<String>,
    /// Glob patterns of callable tool names
    pub allowed_tools: Vec<String>,
    pub expiry: Option<SystemTime>,
}

impl AuthContext {
    /// Caller on a server without an API key
    pub fn anonymous() -> Self {
        Self {
            identifier: "anonymous".to_string(),
            roles: Vec::new(),
            allowed_resources: vec!["*".to_string()],
            allowed_tools: vec!["*".to_string()],
            expiry: None,
        }
    }

    /// Caller that presented the configured API key
    pub fn authenticated(roles: Vec<String>) -> Self {
        Self {
            identifier: "authenticated_client".to_string(),
            roles,
            allowed_resources: vec!["*".to_string()],
            allowed_tools: vec!["*".to_string()],
            expiry: None,
        }
    }

    pub fn with_allowed_resources(mut self, patterns: Vec<String>) -> Self {
        self.allowed_resources = patterns;
        self
    }

    pub fn with_allowed_tools(mut self, patterns: Vec<String>) -> Self {
        self.allowed_tools = patterns;
        self
    }

    pub fn with_expiry(mut self, expiry: SystemTime) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn is_expired(&self) -> bool {
        self.expiry.is_some_and(|at| SystemTime::now() >= at)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_resource_allowed(&self, uri: &str) -> bool {
        !self.is_expired() && self.allowed_resources.iter().any(|p| wildcard_match(p, uri))
    }

    pub fn is_tool_allowed(&self, name: &str) -> bool {
        !self.is_expired() && self.allowed_tools.iter().any(|p| wildcard_match(p, name))
    }
}

impl Default for AuthContext {
    fn default() -> Self {
        Self::anonymous()
    }
}

/// Glob where `*` matches any run of characters, including none.
pub fn wildcard_match(pattern: &str, value: &str) -> bool {
    let p = pattern.as_bytes();
    let v = value.as_bytes();
    let (mut pi, mut vi) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while vi < v.len() {
        if pi < p.len() && p[pi] == b'*' {
            star = Some((pi, vi));
            pi += 1;
        } else if pi < p.len() && p[pi] == v[vi] {
            pi += 1;
            vi += 1;
        } else if let Some((star_pi, star_vi)) = star {
            pi = star_pi + 1;
            vi = star_vi + 1;
            star = Some((star_pi, star_vi + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&b| b == b'*')
}

/// API key presented in a raw envelope: top-level `apiKey`, else `params.apiKey`.
pub fn extract_api_key(message: &Value) -> Option<&str> {
    message
        .get("apiKey")
        .and_then(Value::as_str)
        .or_else(|| message.get("params")?.get("apiKey")?.as_str())
}

/// Constant-time key comparison
pub fn api_key_matches(expected: &str, presented: &str) -> bool {
    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}

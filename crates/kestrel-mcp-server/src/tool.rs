//! Tool handler trait

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::RequestContext;
use crate::error::McpResult;
use crate::model::{Tool, ToolResult};

/// High-level trait for implementing MCP tools
#[async_trait]
pub trait McpTool: Send + Sync {
    /// Descriptor advertised by `list_tools`
    fn tool(&self) -> Tool;

    /// Execute the tool with the call's `arguments` object
    async fn call(&self, args: Value, ctx: &RequestContext) -> McpResult<ToolResult>;
}

/// Adapter pairing a descriptor with an async closure
pub struct FnTool<F> {
    tool: Tool,
    f: F,
}

impl<F> FnTool<F> {
    pub fn new(tool: Tool, f: F) -> Self {
        Self { tool, f }
    }
}

#[async_trait]
impl<F, Fut> McpTool for FnTool<F>
where
    F: Fn(Value, RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = McpResult<ToolResult>> + Send,
{
    fn tool(&self) -> Tool {
        self.tool.clone()
    }

    async fn call(&self, args: Value, ctx: &RequestContext) -> McpResult<ToolResult> {
        (self.f)(args, ctx.clone()).await
    }
}

/// Reads a required string argument.
pub fn required_str<'a>(args: &'a Value, name: &str) -> McpResult<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| crate::McpError::missing_param(name))
}

//! # kestrel MCP server
//!
//! The MCP method surface (`ping`, `initialize`, resource and tool methods)
//! on top of the kestrel JSON-RPC dispatcher, with URI-template routing,
//! per-template ACLs and a single-flight resource cache.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kestrel_mcp_server::prelude::*;
//! use serde_json::Value;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let echo = FnTool::new(
//!         Tool::new("echo").with_param(ToolParam::new("text", "string", true)),
//!         |args: Value, _ctx: RequestContext| async move {
//!             let text = required_str(&args, "text")?;
//!             Ok::<_, McpError>(ToolResult::text(text))
//!         },
//!     );
//!
//!     let server = McpServer::builder()
//!         .name("echo-server")
//!         .version("1.0.0")
//!         .tool(echo)
//!         .build()?;
//!
//!     server.run(TransportConfig::default()).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod builder;
pub mod cache;
pub mod context;
pub mod error;
pub mod handlers;
pub mod model;
pub mod prelude;
pub mod registry;
pub mod resource;
pub mod router;
pub mod server;
pub mod tool;
pub mod uri_template;

#[cfg(test)]
mod tests;

pub use auth::AuthContext;
pub use builder::McpServerBuilder;
pub use cache::{CacheStats, ResourceCache};
pub use context::RequestContext;
pub use error::{McpError, McpResult};
pub use model::{ContentItem, Resource, ResourceTemplate, Tool, ToolParam, ToolResult};
pub use registry::ServerRegistry;
pub use resource::{FnResource, McpResource};
pub use router::{RouteMatch, TemplateRouter, TemplateValidator};
pub use server::McpServer;
pub use tool::{FnTool, McpTool, required_str};
pub use uri_template::{CompiledTemplate, ParamKind, ParamValidation, TemplateCache, TemplateError};

pub use kestrel_http_mcp_server;
pub use kestrel_http_mcp_server::{HttpMcpError, StreamableHttpTransport, TransportConfig};

/// MCP protocol revision served by this crate
pub const MCP_PROTOCOL_VERSION: &str = "2025-03-26";

/// Result type for framework operations
pub type Result<T> = std::result::Result<T, McpFrameworkError>;

/// Framework-level errors
#[derive(Debug, thiserror::Error)]
pub enum McpFrameworkError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] HttpMcpError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Configuration error: {0}")]
    Config(String),
}

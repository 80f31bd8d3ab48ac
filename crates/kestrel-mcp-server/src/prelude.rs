//! Common imports for building a server.
//!
//! ```rust
//! use kestrel_mcp_server::prelude::*;
//! ```

pub use crate::{
    AuthContext, ContentItem, FnResource, FnTool, McpError, McpResource, McpResult, McpServer,
    McpServerBuilder, McpTool, RequestContext, Resource, ResourceTemplate, Tool, ToolParam,
    ToolResult, TransportConfig, required_str,
};

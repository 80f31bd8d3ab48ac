//! # Echo Server
//!
//! Reference binary wiring the whole kestrel stack: an `echo` tool, a static
//! readme resource and two URI templates.
//!
//! ```text
//! cargo run -p echo-server -- --port 8080
//! curl -X POST http://127.0.0.1:8080/mcp \
//!   -H "Content-Type: application/json" \
//!   -d '{"jsonrpc":"2.0","id":7,"method":"call_tool","params":{"name":"echo","arguments":{"text":"hi"}}}'
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use kestrel_mcp_server::prelude::*;
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "echo-server", about = "kestrel MCP echo server", version)]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Path of the MCP endpoint
    #[arg(long, default_value = "/mcp")]
    endpoint: String,

    /// Comma-separated origins; a trailing `*` matches any suffix
    #[arg(long)]
    allowed_origins: Option<String>,

    /// Require this key in the `apiKey` member of every request
    #[arg(long)]
    api_key: Option<String>,

    /// Session inactivity timeout in seconds; 0 never expires
    #[arg(long, default_value_t = 3600)]
    session_timeout: u64,

    #[arg(long)]
    no_heartbeats: bool,

    /// Serve `/call_tool`, `/events` and `/tools`
    #[arg(long)]
    legacy: bool,

    /// Serve static files from this directory
    #[arg(long)]
    doc_root: Option<PathBuf>,
}

impl Args {
    fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            host: self.host.clone(),
            port: self.port,
            mcp_endpoint: self.endpoint.clone(),
            validate_origin: self.allowed_origins.is_some(),
            allowed_origins: self.allowed_origins.clone(),
            session_timeout_seconds: self.session_timeout,
            send_heartbeats: !self.no_heartbeats,
            enable_legacy_endpoints: self.legacy,
            doc_root: self.doc_root.clone(),
            ..Default::default()
        }
    }
}

fn echo_tool() -> impl McpTool {
    FnTool::new(
        Tool::new("echo")
            .with_description("Echo back the input text")
            .with_param(ToolParam::new("text", "string", true).with_description("Text to echo back")),
        |args: Value, _ctx: RequestContext| async move {
            let text = required_str(&args, "text")?;
            Ok::<_, McpError>(ToolResult::text(text))
        },
    )
}

fn readme() -> impl McpResource {
    FnResource::new(|_uri: String, _ctx: RequestContext| async move {
        Ok::<_, McpError>(vec![ContentItem::text_with_mime(
            "text/markdown",
            "# kestrel echo server\n\nCall the `echo` tool or read `example://` URIs.\n",
        )])
    })
}

/// Reports the parameters a template extracted
fn template_echo() -> impl McpResource {
    FnResource::new(|uri: String, ctx: RequestContext| async move {
        Ok::<_, McpError>(vec![ContentItem::json(json!({
            "uri": uri,
            "template": ctx.template,
            "params": Value::Object(ctx.params),
        }))])
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = args.transport_config();

    let mut builder = McpServer::builder()
        .name("echo-server")
        .version(env!("CARGO_PKG_VERSION"))
        .tool(echo_tool())
        .resource_with_handler(
            Resource::new("file:///readme", "Readme")
                .with_mime_type("text/markdown")
                .with_description("About this server"),
            readme(),
        )
        .resource_template(
            ResourceTemplate::new("example://{name}/resource", "Named resource"),
            template_echo(),
        )
        .resource_template(
            ResourceTemplate::new("example://{user}/posts/{post_id:int[1..]}", "User post")
                .with_mime_type("application/json"),
            template_echo(),
        );
    if let Some(api_key) = &args.api_key {
        info!("API key authentication enabled");
        builder = builder.api_key(api_key.clone());
    }

    let server = builder.build()?;
    info!(
        "Endpoint: http://{}:{}{}",
        config.host, config.port, config.mcp_endpoint
    );
    server.run(config).await?;
    Ok(())
}

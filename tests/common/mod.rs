//! Shared fixtures for the integration tests
#![allow(dead_code)]

use std::time::Duration;

use kestrel_mcp_server::prelude::*;
use kestrel_mcp_server::StreamableHttpTransport;
use serde_json::{Value, json};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn echo_tool() -> impl McpTool {
    FnTool::new(
        Tool::new("echo")
            .with_description("Echo the given text")
            .with_param(ToolParam::new("text", "string", true)),
        |args: Value, _ctx: RequestContext| async move {
            let text = required_str(&args, "text")?;
            Ok::<_, McpError>(ToolResult::text(text))
        },
    )
}

/// Resource handler that reports which template routed it and the params it saw
pub fn tagged(tag: &'static str) -> impl McpResource {
    FnResource::new(move |uri: String, ctx: RequestContext| async move {
        let body = json!({
            "handler": tag,
            "uri": uri,
            "params": Value::Object(ctx.params.clone()),
        });
        Ok::<_, McpError>(vec![ContentItem::text(body.to_string())])
    })
}

pub fn sample_server() -> McpServerBuilder {
    McpServer::builder()
        .name("integration-server")
        .version("0.1.0")
        .resource_template(ResourceTemplate::new("example://{name}/resource", "A"), tagged("a"))
        .resource_template(
            ResourceTemplate::new("example://{user}/posts/{post_id:int}", "B"),
            tagged("b"),
        )
        .tool(echo_tool())
}

pub fn loopback_config() -> TransportConfig {
    TransportConfig {
        port: 0,
        send_heartbeats: false,
        ..Default::default()
    }
}

/// Start `server` on an ephemeral port; returns the transport and `http://addr`.
pub async fn serve(server: McpServer, config: TransportConfig) -> (StreamableHttpTransport, String) {
    init_tracing();
    let transport = server.transport(config);
    let addr = transport.start().await.expect("transport should start");
    (transport, format!("http://{}", addr))
}

/// Read SSE chunks until the accumulated text contains `needle`.
pub async fn read_until(response: &mut reqwest::Response, needle: &str) -> String {
    let mut text = String::new();
    while !text.contains(needle) {
        let chunk = tokio::time::timeout(Duration::from_secs(5), response.chunk())
            .await
            .expect("timed out waiting for SSE data")
            .expect("SSE read failed")
            .expect("SSE stream ended early");
        text.push_str(&String::from_utf8_lossy(&chunk));
    }
    text
}

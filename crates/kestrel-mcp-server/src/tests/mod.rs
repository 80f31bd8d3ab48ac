//! Test modules for kestrel-mcp-server

mod security_tests;

use serde_json::{Map, Value, json};

use crate::prelude::*;

pub(crate) fn echo_tool() -> impl McpTool {
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
pub(crate) fn tagged(tag: &'static str) -> impl McpResource {
    FnResource::new(move |uri: String, ctx: RequestContext| async move {
        let body = json!({
            "handler": tag,
            "uri": uri,
            "params": Value::Object(ctx.params.clone()),
        });
        Ok::<_, McpError>(vec![ContentItem::text(body.to_string())])
    })
}

pub(crate) fn sample_server() -> McpServerBuilder {
    McpServer::builder()
        .name("test-server")
        .version("0.0.1")
        .resource(Resource::new("file:///readme", "Readme").with_mime_type("text/markdown"))
        .resource(Resource::new("file:///orphan", "Orphan"))
        .resource_template(ResourceTemplate::new("example://{name}/resource", "A"), tagged("a"))
        .resource_template(
            ResourceTemplate::new("example://{user}/posts/{post_id:int}", "B"),
            tagged("b"),
        )
        .tool(echo_tool())
}

pub(crate) async fn call(server: &McpServer, request: Value) -> Value {
    let body = request.to_string();
    let response = server
        .handle_str(&body, None)
        .await
        .expect("request should produce a response");
    serde_json::from_str(&response).unwrap()
}

/// Parses the handler's echo body out of a read_resource response
pub(crate) fn first_text(response: &Value) -> Map<String, Value> {
    let text = response["result"]["contents"][0]["text"].as_str().unwrap();
    match serde_json::from_str(text).unwrap() {
        Value::Object(map) => map,
        other => panic!("unexpected body {}", other),
    }
}

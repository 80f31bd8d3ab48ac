//! API key gate, template ACLs and allow-list filtering

use serde_json::json;

use super::*;

fn keyed_server() -> McpServer {
    sample_server()
        .api_key("s3cret")
        .api_key_roles(["user"])
        .template_acl("example://{user}/posts/{post_id:int}", ["admin"])
        .template_acl("example://{name}/resource", ["*"])
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_missing_or_wrong_key_is_rejected() {
    let server = keyed_server();

    let response = call(&server, json!({"jsonrpc": "2.0", "id": 9, "method": "ping"})).await;
    assert_eq!(response["error"]["code"], -32001);
    assert_eq!(response["error"]["message"], "Authentication failed");
    assert_eq!(response["id"], 9);

    let response = call(
        &server,
        json!({"jsonrpc": "2.0", "id": 10, "method": "ping", "apiKey": "wrong"}),
    )
    .await;
    assert_eq!(response["error"]["code"], -32001);
}

#[tokio::test]
async fn test_key_accepted_top_level_and_in_params() {
    let server = keyed_server();

    let response = call(
        &server,
        json!({"jsonrpc": "2.0", "id": 1, "method": "ping", "apiKey": "s3cret"}),
    )
    .await;
    assert_eq!(response["result"]["message"], "pong");

    let response = call(
        &server,
        json!({"jsonrpc": "2.0", "id": 2, "method": "ping", "params": {"apiKey": "s3cret"}}),
    )
    .await;
    assert_eq!(response["result"]["message"], "pong");
}

#[tokio::test]
async fn test_unauthenticated_notification_is_dropped() {
    let server = keyed_server();
    assert!(
        server
            .handle_str(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#, None)
            .await
            .is_none()
    );
}

#[tokio::test]
async fn test_template_acl_uses_key_roles() {
    let server = keyed_server();

    // "user" role is not in the admin-only ACL
    let response = call(
        &server,
        json!({
            "jsonrpc": "2.0", "id": 1, "method": "read_resource", "apiKey": "s3cret",
            "params": {"uri": "example://john/posts/42"}
        }),
    )
    .await;
    assert_eq!(response["error"]["code"], -32003);

    // wildcard ACL admits any caller holding a role
    let response = call(
        &server,
        json!({
            "jsonrpc": "2.0", "id": 2, "method": "read_resource", "apiKey": "s3cret",
            "params": {"uri": "example://ann/resource"}
        }),
    )
    .await;
    assert_eq!(first_text(&response)["handler"], "a");

    let admin = sample_server()
        .api_key("s3cret")
        .api_key_roles(["admin"])
        .template_acl("example://{user}/posts/{post_id:int}", ["admin"])
        .build()
        .unwrap();
    let response = call(
        &admin,
        json!({
            "jsonrpc": "2.0", "id": 3, "method": "read_resource", "apiKey": "s3cret",
            "params": {"uri": "example://john/posts/42"}
        }),
    )
    .await;
    assert_eq!(first_text(&response)["handler"], "b");
}

#[tokio::test]
async fn test_anonymous_caller_denied_by_role_acl() {
    let server = sample_server()
        .template_acl("example://{name}/resource", ["*"])
        .build()
        .unwrap();
    let response = call(
        &server,
        json!({"jsonrpc": "2.0", "id": 1, "method": "read_resource", "params": {"uri": "example://ann/resource"}}),
    )
    .await;
    assert_eq!(response["error"]["code"], -32003);
}

#[tokio::test]
async fn test_allow_lists_filter_and_deny() {
    let server = sample_server().build().unwrap();
    let registry = server.registry();
    let ctx = RequestContext::new(
        None,
        AuthContext::authenticated(vec!["user".into()])
            .with_allowed_resources(vec!["example://*".into()])
            .with_allowed_tools(vec!["nothing".into()]),
    );

    assert!(registry.list_resources(&ctx).is_empty());
    assert_eq!(registry.list_templates(&ctx).len(), 2);
    assert!(registry.list_tools(&ctx).is_empty());

    let err = registry.read_resource("file:///readme", &ctx).await.unwrap_err();
    assert_eq!(err.code(), -32003);
    assert!(registry.read_resource("example://ann/resource", &ctx).await.is_ok());

    let err = registry
        .call_tool("echo", json!({"text": "hi"}), &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.code(), -32003);
}

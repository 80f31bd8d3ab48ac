use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{Value, json};

use super::{read_until, start_transport, test_config};
use crate::{HttpMcpError, TransportConfig};

const PING: &str = r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
const INITIALIZE: &str = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#;

async fn initialize(client: &reqwest::Client, base: &str) -> String {
    let response = client
        .post(format!("{}/mcp", base))
        .header("Content-Type", "application/json")
        .body(INITIALIZE)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response
        .headers()
        .get("mcp-session-id")
        .expect("initialize should bind a session")
        .to_str()
        .unwrap()
        .to_string()
}

async fn open_stream(
    client: &reqwest::Client,
    url: &str,
    session_id: Option<&str>,
    last_event_id: Option<&str>,
) -> reqwest::Response {
    let mut request = client.get(url).header("Accept", "text/event-stream");
    if let Some(session_id) = session_id {
        request = request.header("Mcp-Session-Id", session_id);
    }
    if let Some(last) = last_event_id {
        request = request.header("Last-Event-ID", last);
    }
    request.send().await.unwrap()
}

#[tokio::test]
async fn test_post_returns_json() {
    let (transport, base) = start_transport(test_config()).await;
    let response = reqwest::Client::new()
        .post(format!("{}/mcp", base))
        .body(PING)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/json");
    assert!(response.headers().get("mcp-session-id").is_none());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["id"], 1);
    assert_eq!(body["result"]["method"], "ping");
    assert!(body["result"]["session"].is_null());

    transport.stop().await;
}

#[tokio::test]
async fn test_initialize_binds_session() {
    let (transport, base) = start_transport(test_config()).await;
    let client = reqwest::Client::new();
    let session_id = initialize(&client, &base).await;

    assert_eq!(session_id.len(), 32);
    assert!(session_id.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
    assert_eq!(transport.stats().active_sessions, 1);

    let response = client
        .post(format!("{}/mcp", base))
        .header("MCP-SESSION-ID", &session_id)
        .body(PING)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["mcp-session-id"], session_id.as_str());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["result"]["session"], session_id.as_str());

    let unknown = client
        .post(format!("{}/mcp", base))
        .header("Mcp-Session-Id", "0123456789abcdef0123456789abcdef")
        .body(PING)
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    transport.stop().await;
}

#[tokio::test]
async fn test_failed_initialize_discards_session() {
    let (transport, base) = start_transport(test_config()).await;
    let response = reqwest::Client::new()
        .post(format!("{}/mcp", base))
        .body(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"fail":true}}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("mcp-session-id").is_none());
    assert_eq!(transport.stats().active_sessions, 0);
    transport.stop().await;
}

#[tokio::test]
async fn test_notification_accepted() {
    let (transport, base) = start_transport(test_config()).await;
    let response = reqwest::Client::new()
        .post(format!("{}/mcp", base))
        .body(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(response.text().await.unwrap().is_empty());
    transport.stop().await;
}

#[tokio::test]
async fn test_body_errors() {
    let config = TransportConfig {
        max_body_size: 64,
        ..test_config()
    };
    let (transport, base) = start_transport(config).await;
    let client = reqwest::Client::new();

    let empty = client.post(format!("{}/mcp", base)).body("  ").send().await.unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

    let large = client
        .post(format!("{}/mcp", base))
        .body("x".repeat(65))
        .send()
        .await
        .unwrap();
    assert_eq!(large.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let mut not_utf8 = br#"{"jsonrpc":"2.0","id":1,"method":"ping","params":{"x":""#.to_vec();
    not_utf8.extend_from_slice(b"\xff\xfe\"}}");
    let rejected = client
        .post(format!("{}/mcp", base))
        .body(not_utf8)
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    assert_eq!(rejected.text().await.unwrap(), "Request body must be valid UTF-8");

    transport.stop().await;
}

#[tokio::test]
async fn test_method_routing_errors() {
    let (transport, base) = start_transport(test_config()).await;
    let client = reqwest::Client::new();

    let no_accept = client
        .get(format!("{}/mcp", base))
        .header("Accept", "application/json")
        .send()
        .await
        .unwrap();
    assert_eq!(no_accept.status(), StatusCode::BAD_REQUEST);

    let put = client.put(format!("{}/mcp", base)).send().await.unwrap();
    assert_eq!(put.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(put.headers()["allow"], "GET, POST, DELETE, OPTIONS");

    let other = client.get(format!("{}/elsewhere", base)).send().await.unwrap();
    assert_eq!(other.status(), StatusCode::NOT_FOUND);

    assert!(transport.stats().errors >= 3);
    transport.stop().await;
}

#[tokio::test]
async fn test_delete_terminates_session() {
    let (transport, base) = start_transport(test_config()).await;
    let client = reqwest::Client::new();
    let session_id = initialize(&client, &base).await;

    let missing = client.delete(format!("{}/mcp", base)).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let first = client
        .delete(format!("{}/mcp", base))
        .header("Mcp-Session-Id", &session_id)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::NO_CONTENT);

    let second = client
        .delete(format!("{}/mcp", base))
        .header("Mcp-Session-Id", &session_id)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::NOT_FOUND);

    let stale = client
        .post(format!("{}/mcp", base))
        .header("Mcp-Session-Id", &session_id)
        .body(PING)
        .send()
        .await
        .unwrap();
    assert_eq!(stale.status(), StatusCode::NOT_FOUND);

    transport.stop().await;
}

#[tokio::test]
async fn test_origin_validation() {
    let config = TransportConfig {
        validate_origin: true,
        allowed_origins: Some("http://localhost:*".into()),
        ..test_config()
    };
    let (transport, base) = start_transport(config).await;
    let client = reqwest::Client::new();

    let evil = client
        .post(format!("{}/mcp", base))
        .header("Origin", "http://evil.example")
        .body(PING)
        .send()
        .await
        .unwrap();
    assert_eq!(evil.status(), StatusCode::BAD_REQUEST);
    assert_eq!(evil.text().await.unwrap(), "Origin not allowed");

    let local = client
        .post(format!("{}/mcp", base))
        .header("Origin", "http://localhost:5173")
        .body(PING)
        .send()
        .await
        .unwrap();
    assert_eq!(local.status(), StatusCode::OK);

    let no_origin = client.post(format!("{}/mcp", base)).body(PING).send().await.unwrap();
    assert_eq!(no_origin.status(), StatusCode::OK);

    transport.stop().await;
}

#[tokio::test]
async fn test_preflight_and_cors() {
    let (transport, base) = start_transport(test_config()).await;
    let client = reqwest::Client::new();

    let preflight = client
        .request(reqwest::Method::OPTIONS, format!("{}/mcp", base))
        .send()
        .await
        .unwrap();
    assert_eq!(preflight.status(), StatusCode::OK);
    assert_eq!(
        preflight.headers()["access-control-allow-methods"],
        "GET, POST, DELETE, OPTIONS"
    );
    assert_eq!(preflight.headers()["access-control-max-age"], "86400");

    let post = client.post(format!("{}/mcp", base)).body(PING).send().await.unwrap();
    assert_eq!(post.headers()["access-control-allow-origin"], "*");

    transport.stop().await;

    let quiet = TransportConfig {
        enable_cors: false,
        ..test_config()
    };
    let (transport, base) = start_transport(quiet).await;
    let post = client.post(format!("{}/mcp", base)).body(PING).send().await.unwrap();
    assert!(post.headers().get("access-control-allow-origin").is_none());
    transport.stop().await;
}

#[tokio::test]
async fn test_legacy_routes() {
    let config = TransportConfig {
        enable_legacy_endpoints: true,
        ..test_config()
    };
    let (transport, base) = start_transport(config).await;
    let client = reqwest::Client::new();

    let tools: Value = client
        .get(format!("{}/tools", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tools, json!({"tools":[{"name":"echo"}]}));

    let call: Value = client
        .post(format!("{}/call_tool", base))
        .body(PING)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(call["result"]["method"], "ping");

    let mut events = open_stream(&client, &format!("{}/events", base), None, None).await;
    assert_eq!(events.status(), StatusCode::OK);
    read_until(&mut events, "event: connection").await;
    drop(events);
    transport.stop().await;

    let (transport, base) = start_transport(test_config()).await;
    let hidden = client.get(format!("{}/tools", base)).send().await.unwrap();
    assert_eq!(hidden.status(), StatusCode::NOT_FOUND);
    transport.stop().await;
}

#[tokio::test]
async fn test_sse_stream_and_targeted_send() {
    let (transport, base) = start_transport(test_config()).await;
    let client = reqwest::Client::new();
    let session_id = initialize(&client, &base).await;
    let url = format!("{}/mcp", base);

    let mut stream = open_stream(&client, &url, Some(&session_id), None).await;
    assert_eq!(stream.status(), StatusCode::OK);
    assert_eq!(stream.headers()["content-type"], "text/event-stream");
    assert_eq!(stream.headers()["cache-control"], "no-cache");
    assert_eq!(stream.headers()["mcp-session-id"], session_id.as_str());

    let opened = read_until(&mut stream, "\n\n").await;
    assert!(opened.starts_with("event: connection\ndata: {\"type\":\"connection\""));
    assert!(opened.contains(&format!("\"session_id\":\"{}\"", session_id)));
    assert_eq!(transport.client_count(), 1);

    assert_eq!(transport.send(r#"{"n":1}"#, Some(&session_id)), 1);
    let pushed = read_until(&mut stream, "data: {\"n\":1}").await;
    assert!(pushed.contains("id: 1\nevent: message\n"));

    assert_eq!(transport.send(r#"{"n":2}"#, Some("ffffffffffffffffffffffffffffffff")), 0);
    assert_eq!(transport.send(r#"{"n":3}"#, None), 1);
    read_until(&mut stream, "data: {\"n\":3}").await;

    let deleted = client
        .delete(&url)
        .header("Mcp-Session-Id", &session_id)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    assert_eq!(transport.client_count(), 0);

    let ended = tokio::time::timeout(Duration::from_secs(5), async {
        while let Ok(Some(_)) = stream.chunk().await {}
    })
    .await;
    assert!(ended.is_ok(), "stream should end once its session is gone");
    transport.stop().await;
}

#[tokio::test]
async fn test_sse_replay_after_last_event_id() {
    let (transport, base) = start_transport(test_config()).await;
    let client = reqwest::Client::new();
    let session_id = initialize(&client, &base).await;
    let url = format!("{}/mcp", base);

    for n in 1..=3 {
        transport.send(&format!("{{\"n\":{}}}", n), Some(&session_id));
    }

    let mut stream = open_stream(&client, &url, Some(&session_id), Some("2")).await;
    let text = read_until(&mut stream, "event: connection").await;
    assert!(text.starts_with("id: 3\nevent: message\ndata: {\"n\":3}\n\n"));
    assert!(!text.contains("id: 1\n"));
    assert!(!text.contains("id: 2\n"));
    drop(stream);

    let mut unknown = open_stream(&client, &url, Some(&session_id), Some("99")).await;
    let text = read_until(&mut unknown, "event: connection").await;
    assert!(text.starts_with("event: connection"));
    drop(unknown);

    transport.stop().await;
}

#[tokio::test]
async fn test_post_with_event_stream_accept() {
    let (transport, base) = start_transport(test_config()).await;
    let client = reqwest::Client::new();
    let session_id = initialize(&client, &base).await;

    let response = client
        .post(format!("{}/mcp", base))
        .header("Mcp-Session-Id", &session_id)
        .header("Accept", "application/json, text/event-stream")
        .body(PING)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/event-stream");
    let text = response.text().await.unwrap();
    assert!(text.starts_with("id: 1\nevent: message\ndata: {\"jsonrpc\":\"2.0\""));
    assert!(text.ends_with("\n\n"));

    transport.stop().await;
}

#[tokio::test]
async fn test_heartbeats_reach_clients() {
    let config = TransportConfig {
        send_heartbeats: true,
        heartbeat_interval_ms: 50,
        ..test_config()
    };
    let (transport, base) = start_transport(config).await;
    let client = reqwest::Client::new();

    let mut stream = open_stream(&client, &format!("{}/mcp", base), None, None).await;
    read_until(&mut stream, ": heartbeat\n\n").await;
    drop(stream);
    transport.stop().await;
}

#[tokio::test]
async fn test_static_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<p>kestrel</p>").unwrap();
    let config = TransportConfig {
        doc_root: Some(dir.path().to_path_buf()),
        ..test_config()
    };
    let (transport, base) = start_transport(config).await;
    let client = reqwest::Client::new();

    let index = client.get(format!("{}/", base)).send().await.unwrap();
    assert_eq!(index.status(), StatusCode::OK);
    assert_eq!(index.headers()["content-type"], "text/html; charset=utf-8");
    assert_eq!(index.text().await.unwrap(), "<p>kestrel</p>");

    let missing = client.get(format!("{}/nope.css", base)).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    transport.stop().await;
}

#[tokio::test]
async fn test_lifecycle() {
    let (transport, _base) = start_transport(test_config()).await;
    assert!(transport.is_running());
    assert!(matches!(
        transport.start().await,
        Err(HttpMcpError::AlreadyRunning(_))
    ));

    transport.stop().await;
    assert!(!transport.is_running());
    assert!(transport.local_addr().is_none());
    transport.stop().await;

    let addr = transport.start().await.unwrap();
    assert_eq!(transport.local_addr(), Some(addr));
    transport.stop().await;
}

#[tokio::test]
async fn test_ssl_refused_at_start() {
    let config = TransportConfig {
        use_ssl: true,
        ..test_config()
    };
    let transport = crate::StreamableHttpTransport::new(config, std::sync::Arc::new(super::StubHandler));
    assert!(matches!(transport.start().await, Err(HttpMcpError::Config(_))));
}

#[tokio::test]
async fn test_cleanup_expires_idle_sessions() {
    let config = TransportConfig {
        session_timeout_seconds: 1,
        ..test_config()
    };
    let (transport, base) = start_transport(config).await;
    let client = reqwest::Client::new();
    let session_id = initialize(&client, &base).await;

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(transport.run_cleanup(), 1);
    assert_eq!(transport.run_cleanup(), 0);

    let expired = client
        .post(format!("{}/mcp", base))
        .header("Mcp-Session-Id", &session_id)
        .body(PING)
        .send()
        .await
        .unwrap();
    assert_eq!(expired.status(), StatusCode::NOT_FOUND);
    transport.stop().await;
}

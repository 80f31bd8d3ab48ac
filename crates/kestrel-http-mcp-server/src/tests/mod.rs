//! Transport tests over loopback sockets

mod transport_tests;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{MessageHandler, StreamableHttpTransport, TransportConfig};

/// Answers every request with its method and bound session.
///
/// `initialize` with `{"fail": true}` params and the `fail` method answer
/// with an error envelope.
pub(crate) struct StubHandler;

#[async_trait]
impl MessageHandler for StubHandler {
    async fn handle_message(&self, body: &str, session_id: Option<&str>) -> Option<String> {
        let message: Value = match serde_json::from_str(body) {
            Ok(message) => message,
            Err(_) => {
                return Some(
                    json!({"jsonrpc":"2.0","id":null,"error":{"code":-32700,"message":"Parse error"}})
                        .to_string(),
                );
            }
        };
        let id = message.get("id")?.clone();
        let method = message["method"].as_str().unwrap_or_default();
        if method == "fail" || message["params"]["fail"] == json!(true) {
            return Some(
                json!({"jsonrpc":"2.0","id":id,"error":{"code":-32601,"message":"Method not found"}})
                    .to_string(),
            );
        }
        Some(
            json!({"jsonrpc":"2.0","id":id,"result":{"method":method,"session":session_id}})
                .to_string(),
        )
    }

    async fn list_tools(&self) -> Value {
        json!({"tools":[{"name":"echo"}]})
    }
}

pub(crate) fn test_config() -> TransportConfig {
    TransportConfig {
        port: 0,
        send_heartbeats: false,
        ..Default::default()
    }
}

pub(crate) async fn start_transport(config: TransportConfig) -> (StreamableHttpTransport, String) {
    let transport = StreamableHttpTransport::new(config, Arc::new(StubHandler));
    let addr = transport.start().await.unwrap();
    (transport, format!("http://{}", addr))
}

/// Read SSE chunks until the accumulated text contains `needle`.
pub(crate) async fn read_until(response: &mut reqwest::Response, needle: &str) -> String {
    let mut text = String::new();
    while !text.contains(needle) {
        let chunk = tokio::time::timeout(Duration::from_secs(5), response.chunk())
            .await
            .expect("timed out waiting for SSE data")
            .unwrap()
            .expect("SSE stream ended early");
        text.push_str(&String::from_utf8_lossy(&chunk));
    }
    text
}

//! Streamable HTTP client transport
//!
//! Each JSON-RPC message goes out as its own `POST` on a fresh TCP
//! connection and the reply is read with [`HttpResponseParser`]. A separate
//! task holds the `GET` event stream open, feeding its body through
//! [`SseEventParser`], and reopens it with backoff when it drops, sending the
//! last event id it saw as `Last-Event-ID`.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use kestrel_mcp_json_rpc_server::{JsonRpcReply, JsonRpcResponse, RequestId};
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};
use url::{Host, Url};

use crate::config::ClientConfig;
use crate::connection::{ConnectionState, StateCallback};
use crate::error::{McpClientError, McpClientResult, ProtocolError, TransportError};
use crate::http_parser::{ChunkedDecoder, HttpResponse, HttpResponseParser, ParseStatus};
use crate::sse_parser::{SseEvent, SseEventParser};

/// Protocol revision announced by `initialize`
pub const PROTOCOL_VERSION: &str = "2025-03-26";

const READ_BUFFER_SIZE: usize = 8192;
const JSON_ACCEPT: &str = "application/json";
const EVENT_STREAM_ACCEPT: &str = "text/event-stream";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Endpoint {
    host: String,
    port: u16,
    /// Value of the `Host` header
    authority: String,
    /// Path plus query
    target: String,
}

impl Endpoint {
    fn parse(raw: &str) -> McpClientResult<Self> {
        let url = Url::parse(raw)
            .map_err(|e| McpClientError::config(format!("Invalid endpoint URL '{}': {}", raw, e)))?;
        match url.scheme() {
            "http" => {}
            "https" => {
                return Err(McpClientError::config(
                    "https endpoints are not supported; terminate TLS in a proxy",
                ));
            }
            other => {
                return Err(McpClientError::config(format!(
                    "Unsupported URL scheme: {}",
                    other
                )));
            }
        }

        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => {
                return Err(McpClientError::config(format!(
                    "Endpoint URL has no host: {}",
                    raw
                )));
            }
        };
        let port = url.port_or_known_default().unwrap_or(80);
        let host_str = url.host_str().unwrap_or(&host);
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host_str, port),
            None => host_str.to_string(),
        };
        let target = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        Ok(Self {
            host,
            port,
            authority,
            target,
        })
    }
}

struct ClientInner {
    config: ClientConfig,
    endpoint: Endpoint,
    next_request_id: AtomicI64,
    session_id: Mutex<Option<String>>,
    last_event_id: Mutex<Option<String>>,
    state: Mutex<ConnectionState>,
    state_callback: Mutex<Option<StateCallback>>,
    events: mpsc::UnboundedSender<SseEvent>,
}

impl ClientInner {
    fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = std::mem::replace(&mut *self.state.lock(), next);
        if previous == next {
            return;
        }
        debug!(from = %previous, to = %next, "Connection state changed");
        let callback = self.state_callback.lock().clone();
        if let Some(callback) = callback {
            callback(previous, next);
        }
    }

    fn mark_connected(&self) {
        if matches!(
            self.state(),
            ConnectionState::Disconnected | ConnectionState::Connecting | ConnectionState::Error
        ) {
            self.set_state(ConnectionState::Connected);
        }
    }

    async fn open_stream(&self) -> McpClientResult<TcpStream> {
        let address = (self.endpoint.host.as_str(), self.endpoint.port);
        let stream = timeout(self.config.timeouts.connect, TcpStream::connect(address)).await??;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn build_request(
        &self,
        method: &str,
        accept: &str,
        body: Option<&str>,
        extra_headers: &[(&str, &str)],
    ) -> String {
        let mut request = format!(
            "{} {} HTTP/1.1\r\nHost: {}\r\nUser-Agent: {}\r\nAccept: {}\r\n",
            method, self.endpoint.target, self.endpoint.authority, self.config.user_agent, accept
        );
        if let Some(session_id) = self.session_id.lock().as_deref() {
            request.push_str(&format!("Mcp-Session-Id: {}\r\n", session_id));
        }
        for (name, value) in extra_headers {
            request.push_str(&format!("{}: {}\r\n", name, value));
        }
        if let Some(body) = body {
            request.push_str(&format!(
                "Content-Type: application/json\r\nContent-Length: {}\r\n",
                body.len()
            ));
        }
        request.push_str("Connection: close\r\n\r\n");
        if let Some(body) = body {
            request.push_str(body);
        }
        request
    }

    /// One request/response exchange on a fresh connection
    async fn exchange(
        &self,
        method: &str,
        accept: &str,
        body: Option<&str>,
    ) -> McpClientResult<HttpResponse> {
        let request = self.build_request(method, accept, body, &[]);
        let round_trip = async {
            let mut stream = self.open_stream().await?;
            stream.write_all(request.as_bytes()).await?;

            let mut parser = HttpResponseParser::new();
            let mut buf = vec![0u8; READ_BUFFER_SIZE];
            loop {
                let n = stream.read(&mut buf).await?;
                let status = if n == 0 {
                    parser.finish()?
                } else {
                    parser.feed(&buf[..n])?
                };
                if status == ParseStatus::Complete {
                    break;
                }
            }
            parser
                .response()
                .ok_or(McpClientError::Transport(TransportError::Closed))
        };
        timeout(self.config.timeouts.request, round_trip).await?
    }

    async fn post(&self, envelope: &Value) -> McpClientResult<HttpResponse> {
        let body = serde_json::to_string(envelope)?;
        let response = self.exchange("POST", JSON_ACCEPT, Some(&body)).await?;

        if let Some(session_id) = &response.session_id {
            let mut current = self.session_id.lock();
            if current.as_deref() != Some(session_id.as_str()) {
                info!(session_id = %session_id, "Session established");
                *current = Some(session_id.clone());
            }
        }

        if response.status_code == 404 && self.session_id.lock().take().is_some() {
            warn!("Server no longer knows this session; dropping it");
        }
        if !response.is_success() {
            return Err(TransportError::Http {
                status: response.status_code,
                body: response.body_text(),
            }
            .into());
        }
        self.mark_connected();
        Ok(response)
    }

    fn envelope(&self, id: Option<i64>, method: &str, params: Option<Value>) -> Value {
        let mut envelope = Map::new();
        envelope.insert("jsonrpc".to_string(), json!("2.0"));
        if let Some(id) = id {
            envelope.insert("id".to_string(), json!(id));
        }
        envelope.insert("method".to_string(), json!(method));
        if let Some(params) = params {
            envelope.insert("params".to_string(), params);
        }
        if let Some(api_key) = &self.config.api_key {
            envelope.insert("apiKey".to_string(), json!(api_key));
        }
        Value::Object(envelope)
    }

    /// Open the event stream once and pump it until it ends.
    ///
    /// `attempt` is reset as soon as the server accepts the stream.
    async fn read_event_stream(&self, attempt: &mut u32) -> McpClientResult<()> {
        let last_event_id = self.last_event_id.lock().clone();
        let mut headers = Vec::new();
        if let Some(id) = last_event_id.as_deref() {
            headers.push(("Last-Event-ID", id));
        }
        let request = self.build_request("GET", EVENT_STREAM_ACCEPT, None, &headers);

        let mut stream = self.open_stream().await?;
        stream.write_all(request.as_bytes()).await?;

        let mut head = HttpResponseParser::headers_only();
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let response = loop {
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                return Err(TransportError::Closed.into());
            }
            if head.feed(&buf[..n])? == ParseStatus::Complete {
                break head
                    .response()
                    .ok_or(McpClientError::Transport(TransportError::Closed))?;
            }
        };

        if !response.is_success() {
            return Err(TransportError::Http {
                status: response.status_code,
                body: String::new(),
            }
            .into());
        }
        if !response.is_event_stream() {
            return Err(ProtocolError::InvalidResponse(format!(
                "expected text/event-stream, got {}",
                response.content_type.as_deref().unwrap_or("no content type")
            ))
            .into());
        }

        *attempt = 0;
        self.set_state(ConnectionState::SseConnected);
        info!(last_event_id = ?last_event_id, "Event stream open");

        let mut body = EventStreamBody {
            chunks: head.is_chunked().then(ChunkedDecoder::new),
            events: SseEventParser::new(),
        };
        if self.deliver(&mut body, &head.take_remaining())? {
            return Ok(());
        }
        loop {
            let n = stream.read(&mut buf).await?;
            if n == 0 || self.deliver(&mut body, &buf[..n])? {
                return Ok(());
            }
        }
    }

    /// Decode body bytes and forward complete events; true once the body ended.
    fn deliver(&self, body: &mut EventStreamBody, bytes: &[u8]) -> McpClientResult<bool> {
        let decoded;
        let payload = match body.chunks.as_mut() {
            Some(decoder) => {
                let mut out = Vec::with_capacity(bytes.len());
                decoder.decode(bytes, &mut out)?;
                decoded = out;
                decoded.as_slice()
            }
            None => bytes,
        };

        body.events.push(payload);
        loop {
            match body.events.next_event() {
                Ok(Some(event)) => {
                    if let Some(id) = &event.id {
                        *self.last_event_id.lock() = Some(id.clone());
                    }
                    trace!(event_id = ?event.id, event_type = ?event.event_type, "SSE event received");
                    // a dropped receiver only means nobody is listening
                    let _ = self.events.send(event);
                }
                Ok(None) => break,
                Err(err) => warn!("Skipping malformed SSE event: {}", err),
            }
        }
        Ok(body
            .chunks
            .as_ref()
            .is_some_and(ChunkedDecoder::is_done))
    }
}

struct EventStreamBody {
    chunks: Option<ChunkedDecoder>,
    events: SseEventParser,
}

async fn run_event_stream(inner: Arc<ClientInner>, mut shutdown: watch::Receiver<bool>) {
    let mut attempt: u32 = 0;
    loop {
        inner.set_state(ConnectionState::SseConnecting);
        let outcome = tokio::select! {
            outcome = inner.read_event_stream(&mut attempt) => outcome,
            _ = shutdown.changed() => break,
        };

        match outcome {
            Ok(()) => info!("Event stream closed by server"),
            Err(err) if !err.is_retryable() => {
                error!("Event stream failed: {}", err);
                inner.set_state(ConnectionState::Error);
                return;
            }
            Err(err) => warn!(attempt, "Event stream dropped: {}", err),
        }

        if !inner.config.retry.should_retry(attempt) {
            error!(attempt, "Giving up on the event stream");
            inner.set_state(ConnectionState::Error);
            return;
        }
        let delay = inner.config.retry.delay_for_attempt(attempt);
        attempt = attempt.saturating_add(1);
        inner.set_state(ConnectionState::Reconnecting);
        debug!(?delay, attempt, "Reopening event stream after backoff");

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => break,
        }
    }
    debug!("Event stream task stopped");
}

struct EventStreamTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Client side of the Streamable HTTP transport.
///
/// ```rust,no_run
/// # async fn demo() -> kestrel_mcp_client::McpClientResult<()> {
/// use kestrel_mcp_client::{ClientConfig, StreamableHttpClient};
///
/// let client = StreamableHttpClient::new(ClientConfig::new("http://127.0.0.1:8080/mcp"))?;
/// client.initialize().await?;
/// let mut events = client.take_event_receiver().expect("first call");
/// client.start_event_stream();
/// while let Some(event) = events.recv().await {
///     println!("{:?}", event);
/// }
/// # Ok(())
/// # }
/// ```
pub struct StreamableHttpClient {
    inner: Arc<ClientInner>,
    events: Mutex<Option<mpsc::UnboundedReceiver<SseEvent>>>,
    event_stream: Mutex<Option<EventStreamTask>>,
}

impl StreamableHttpClient {
    pub fn new(config: ClientConfig) -> McpClientResult<Self> {
        let endpoint = Endpoint::parse(&config.endpoint)?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                endpoint,
                next_request_id: AtomicI64::new(1),
                session_id: Mutex::new(None),
                last_event_id: Mutex::new(None),
                state: Mutex::new(ConnectionState::Disconnected),
                state_callback: Mutex::new(None),
                events: events_tx,
            }),
            events: Mutex::new(Some(events_rx)),
            event_stream: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    pub fn on_state_change<F>(&self, callback: F)
    where
        F: Fn(ConnectionState, ConnectionState) + Send + Sync + 'static,
    {
        *self.inner.state_callback.lock() = Some(Arc::new(callback));
    }

    pub fn session_id(&self) -> Option<String> {
        self.inner.session_id.lock().clone()
    }

    /// Bind to an existing session, e.g. one persisted across restarts
    pub fn set_session_id(&self, session_id: Option<String>) {
        *self.inner.session_id.lock() = session_id;
    }

    pub fn last_event_id(&self) -> Option<String> {
        self.inner.last_event_id.lock().clone()
    }

    /// Resume the event stream after `last_event_id` on the next open
    pub fn set_last_event_id(&self, last_event_id: Option<String>) {
        *self.inner.last_event_id.lock() = last_event_id;
    }

    /// Receiver for events from the SSE stream; `None` after the first call
    pub fn take_event_receiver(&self) -> Option<mpsc::UnboundedReceiver<SseEvent>> {
        self.events.lock().take()
    }

    /// Check that the server accepts TCP connections.
    pub async fn connect(&self) -> McpClientResult<()> {
        self.inner.set_state(ConnectionState::Connecting);
        match self.inner.open_stream().await {
            Ok(_) => {
                self.inner.set_state(ConnectionState::Connected);
                Ok(())
            }
            Err(err) => {
                warn!("Connection to {} failed: {}", self.inner.config.endpoint, err);
                self.inner.set_state(ConnectionState::Error);
                Err(err)
            }
        }
    }

    /// Send a request and wait for its response.
    ///
    /// A JSON-RPC error reply becomes [`McpClientError::ServerError`].
    pub async fn send_request(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> McpClientResult<JsonRpcResponse> {
        let id = self.inner.next_request_id.fetch_add(1, Ordering::Relaxed);
        debug!(method = %method, id, "Sending request");
        let envelope = self.inner.envelope(Some(id), method, params);
        let response = self.inner.post(&envelope).await?;

        let text = reply_text(&response)?;
        match serde_json::from_str::<JsonRpcReply>(&text)? {
            JsonRpcReply::Response(reply) => {
                if reply.id != RequestId::Number(id) {
                    return Err(ProtocolError::IdMismatch {
                        expected: id,
                        actual: reply.id.to_string(),
                    }
                    .into());
                }
                Ok(reply)
            }
            JsonRpcReply::Error(err) => {
                debug!(method = %method, code = err.error.code, "Server returned an error");
                Err(McpClientError::server_error(
                    err.error.code,
                    err.error.message,
                    err.error.data,
                ))
            }
        }
    }

    pub async fn send_notification(&self, method: &str, params: Option<Value>) -> McpClientResult<()> {
        debug!(method = %method, "Sending notification");
        let envelope = self.inner.envelope(None, method, params);
        let response = self.inner.post(&envelope).await?;
        if response.status_code != 202 {
            debug!(status = response.status_code, "Notification answered with a body");
        }
        Ok(())
    }

    /// Run the `initialize` handshake; the server's session id is kept.
    pub async fn initialize(&self) -> McpClientResult<Value> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "kestrel-mcp-client",
                "version": env!("CARGO_PKG_VERSION"),
            },
        });
        let response = self.send_request("initialize", Some(params)).await?;
        self.send_notification("notifications/initialized", None).await?;
        Ok(response.result)
    }

    pub async fn ping(&self) -> McpClientResult<Value> {
        Ok(self.send_request("ping", None).await?.result)
    }

    pub async fn list_tools(&self) -> McpClientResult<Value> {
        Ok(self.send_request("tools/list", None).await?.result)
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> McpClientResult<Value> {
        let params = json!({ "name": name, "arguments": arguments });
        Ok(self.send_request("tools/call", Some(params)).await?.result)
    }

    pub async fn list_resources(&self) -> McpClientResult<Value> {
        Ok(self.send_request("resources/list", None).await?.result)
    }

    pub async fn read_resource(&self, uri: &str) -> McpClientResult<Value> {
        let params = json!({ "uri": uri });
        Ok(self.send_request("resources/read", Some(params)).await?.result)
    }

    /// Open the event stream in the background. Returns false if it is
    /// already running.
    pub fn start_event_stream(&self) -> bool {
        let mut slot = self.event_stream.lock();
        if slot.as_ref().is_some_and(|task| !task.handle.is_finished()) {
            return false;
        }
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_event_stream(Arc::clone(&self.inner), shutdown_rx));
        *slot = Some(EventStreamTask { shutdown, handle });
        true
    }

    pub async fn stop_event_stream(&self) {
        let task = self.event_stream.lock().take();
        let Some(task) = task else {
            return;
        };
        let _ = task.shutdown.send(true);
        if let Err(err) = task.handle.await {
            error!("Event stream task failed: {}", err);
        }

        let next = match self.inner.state() {
            ConnectionState::SseConnected => ConnectionState::Connected,
            ConnectionState::SseConnecting | ConnectionState::Reconnecting => {
                ConnectionState::Disconnected
            }
            other => other,
        };
        self.inner.set_state(next);
    }

    /// Stop the event stream and end the session with `DELETE`.
    pub async fn close(&self) -> McpClientResult<()> {
        self.stop_event_stream().await;

        let has_session = self.inner.session_id.lock().is_some();
        let result = if has_session {
            let outcome = self.inner.exchange("DELETE", JSON_ACCEPT, None).await;
            let session_id = self.inner.session_id.lock().take();
            match outcome {
                Ok(response) if response.is_success() => {
                    info!(session_id = ?session_id, "Session closed");
                    Ok(())
                }
                Ok(response) if response.status_code == 404 => {
                    debug!(session_id = ?session_id, "Session was already gone");
                    Ok(())
                }
                Ok(response) => Err(TransportError::Http {
                    status: response.status_code,
                    body: response.body_text(),
                }
                .into()),
                Err(err) => Err(err),
            }
        } else {
            Ok(())
        };

        self.inner.set_state(ConnectionState::Disconnected);
        result
    }
}

impl Drop for StreamableHttpClient {
    fn drop(&mut self) {
        if let Some(task) = self.event_stream.get_mut().take() {
            let _ = task.shutdown.send(true);
        }
    }
}

/// JSON text of a reply, unwrapping a single-event SSE body if needed
fn reply_text(response: &HttpResponse) -> McpClientResult<String> {
    if !response.is_event_stream() {
        return Ok(response.body_text());
    }
    let outcome = SseEventParser::new().feed(&response.body);
    let message = outcome
        .events
        .into_iter()
        .find(|event| event.event_type.as_deref().is_none_or(|t| t == "message"));
    match (message, outcome.error) {
        (Some(event), error) => {
            if let Some(err) = error {
                warn!("Ignoring malformed SSE in reply body: {}", err);
            }
            Ok(event.data)
        }
        (None, Some(err)) => Err(ProtocolError::InvalidResponse(err.to_string()).into()),
        (None, None) => {
            Err(ProtocolError::InvalidResponse("event stream carried no message".into()).into())
        }
    }
}

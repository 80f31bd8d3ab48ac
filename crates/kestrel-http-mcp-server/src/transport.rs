//! Streamable HTTP transport
//!
//! One listener, one endpoint. Each accepted connection is served by hyper's
//! `http1` server on its own task; heartbeats and the session sweeper run as
//! background tasks that stop on the shared shutdown signal.

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use http::header::{
    ALLOW, CACHE_CONTROL, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, HeaderValue,
};
use http::{Method, Request, Response, StatusCode};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{debug, error, info, trace, warn};

use kestrel_mcp_session_storage::{
    SessionManager, SessionManagerConfig, SessionState, SessionTimeout, is_valid_session_id,
};

use crate::client_registry::{ClientRegistry, ConnectionId, SseConnection};
use crate::config::TransportConfig;
use crate::cors::{CorsHeaderCache, CorsSettings};
use crate::handler::MessageHandler;
use crate::origin::AllowedOrigins;
use crate::protocol::{
    EVENT_STREAM_MIME, JSON_MIME, MCP_SESSION_ID, accepts_event_stream,
    extract_last_event_id, extract_origin, extract_session_id, peek_method,
};
use crate::sse::{SseBody, SseEvent};
use crate::static_files::StaticFiles;
use crate::stream_context::SseStreamContext;
use crate::{HttpMcpError, Result};

/// HTTP body type shared by JSON, SSE and plain responses
type UnifiedBody = UnsyncBoxBody<Bytes, hyper::Error>;

/// Frames queued per SSE client before sends start failing
const SSE_CHANNEL_CAPACITY: usize = 256;

const ENDPOINT_METHODS: &str = "GET, POST, DELETE, OPTIONS";

/// Snapshot of transport counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportStats {
    pub requests: u64,
    pub sse_connections: u64,
    pub events_sent: u64,
    pub errors: u64,
    pub active_clients: usize,
    pub active_sessions: usize,
}

#[derive(Default)]
struct Counters {
    requests: AtomicU64,
    sse_connections: AtomicU64,
    events_sent: AtomicU64,
    errors: AtomicU64,
}

struct TransportState {
    config: TransportConfig,
    handler: Arc<dyn MessageHandler>,
    sessions: Arc<SessionManager>,
    clients: Arc<ClientRegistry>,
    global_events: Arc<SseStreamContext>,
    session_events: Mutex<HashMap<String, Arc<SseStreamContext>>>,
    origins: AllowedOrigins,
    cors_settings: CorsSettings,
    cors: CorsHeaderCache,
    static_files: Option<StaticFiles>,
    stats: Counters,
}

impl TransportState {
    /// Stream context for a session, or the global one
    fn event_context(&self, session_id: Option<&str>) -> Arc<SseStreamContext> {
        match session_id {
            None => Arc::clone(&self.global_events),
            Some(session_id) => {
                let mut contexts = self.session_events.lock();
                let context = contexts.entry(session_id.to_string()).or_insert_with(|| {
                    Arc::new(SseStreamContext::new(self.config.max_stored_events))
                });
                Arc::clone(context)
            }
        }
    }

    /// Close a session's SSE streams and forget its stored events.
    fn drop_session_streams(&self, session_id: &str) -> usize {
        self.session_events.lock().remove(session_id);
        self.clients.remove_session(session_id)
    }

    fn run_cleanup(&self) -> usize {
        let expired = self.sessions.cleanup_expired();
        let dead = self.clients.cleanup();

        let mut candidates: HashSet<String> = self.session_events.lock().keys().cloned().collect();
        candidates.extend(self.clients.session_ids());
        let stale: Vec<String> = candidates
            .into_iter()
            .filter(|session_id| self.sessions.get(session_id).is_none())
            .collect();
        for session_id in &stale {
            self.drop_session_streams(session_id);
        }

        if expired > 0 || dead > 0 || !stale.is_empty() {
            info!(
                "Cleanup: {} sessions expired, {} dead SSE clients, {} stale streams",
                expired,
                dead,
                stale.len()
            );
        }
        expired
    }

    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }
}

struct RunningServer {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

/// MCP Streamable HTTP server transport
pub struct StreamableHttpTransport {
    state: Arc<TransportState>,
    running: Mutex<Option<RunningServer>>,
}

impl StreamableHttpTransport {
    pub fn new(config: TransportConfig, handler: Arc<dyn MessageHandler>) -> Self {
        let sessions = Arc::new(SessionManager::new(SessionManagerConfig {
            max_sessions: config.max_sessions,
            default_timeout: (config.session_timeout_seconds > 0)
                .then(|| std::time::Duration::from_secs(config.session_timeout_seconds)),
        }));
        sessions.set_event_callback(Arc::new(|session_id: &str, state: SessionState| {
            debug!(session_id = %session_id, state = %state, "Session state changed");
        }));

        let state = TransportState {
            origins: config.origin_list(),
            cors_settings: config.cors_settings(),
            cors: CorsHeaderCache::new(),
            static_files: config.doc_root.as_ref().map(StaticFiles::new),
            clients: Arc::new(ClientRegistry::new(config.client_registry_capacity)),
            global_events: Arc::new(SseStreamContext::new(config.max_stored_events)),
            session_events: Mutex::new(HashMap::new()),
            sessions,
            handler,
            stats: Counters::default(),
            config,
        };
        Self {
            state: Arc::new(state),
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.state.config
    }

    pub fn session_manager(&self) -> &Arc<SessionManager> {
        &self.state.sessions
    }

    pub fn client_count(&self) -> usize {
        self.state.clients.count()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().as_ref().map(|server| server.local_addr)
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Bind and start serving; returns the bound address.
    pub async fn start(&self) -> Result<SocketAddr> {
        let config = &self.state.config;
        config.validate()?;
        if let Some(addr) = self.local_addr() {
            return Err(HttpMcpError::AlreadyRunning(addr));
        }

        let listener = TcpListener::bind(config.bind_address().await?).await?;
        let local_addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut tasks = vec![tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.state),
            shutdown_rx.clone(),
        ))];
        if config.send_heartbeats {
            tasks.push(tokio::spawn(heartbeat_loop(
                Arc::clone(&self.state),
                shutdown_rx.clone(),
            )));
        }
        tasks.push(tokio::spawn(cleanup_loop(Arc::clone(&self.state), shutdown_rx)));

        let mut running = self.running.lock();
        if let Some(existing) = running.as_ref() {
            let _ = shutdown_tx.send(true);
            return Err(HttpMcpError::AlreadyRunning(existing.local_addr));
        }
        *running = Some(RunningServer {
            local_addr,
            shutdown: shutdown_tx,
            tasks,
        });

        info!("Streamable HTTP transport listening on {}", local_addr);
        info!("MCP endpoint available at: {}", config.mcp_endpoint);
        Ok(local_addr)
    }

    /// Stop serving and wait for the background tasks. Idempotent.
    pub async fn stop(&self) {
        let Some(server) = self.running.lock().take() else {
            return;
        };
        let _ = server.shutdown.send(true);
        let closed = self.state.clients.clear();
        debug!("Closed {} SSE streams", closed);

        for task in server.tasks {
            if let Err(e) = task.await {
                error!("Transport task failed during shutdown: {}", e);
            }
        }
        info!("Streamable HTTP transport on {} stopped", server.local_addr);
    }

    /// Push a `message` event.
    ///
    /// With a session, the event is stored in that session's context and
    /// delivered only to its streams; otherwise it is stored globally and
    /// broadcast. Returns the number of streams reached.
    pub fn send(&self, data: &str, session_id: Option<&str>) -> usize {
        let state = &self.state;
        if let Some(session_id) = session_id {
            if state.config.enable_sessions && state.sessions.get(session_id).is_none() {
                warn!(session_id = %session_id, "Dropping event for unknown session");
                return 0;
            }
        }

        let deliver = |event: &SseEvent| match session_id {
            Some(session_id) => state.clients.broadcast_to_session(session_id, event),
            None => state.clients.broadcast(event),
        };
        let (event, delivered) = if state.config.enable_sse_resumability {
            state
                .event_context(session_id)
                .store_with(None, Some("message".to_string()), data, deliver)
        } else {
            let event = SseEvent::message(data);
            let delivered = deliver(&event);
            (event, delivered)
        };
        TransportState::bump(&state.stats.events_sent, delivered as u64);
        debug!(session_id = ?session_id, event_id = ?event.id, delivered, "Event sent");
        delivered
    }

    /// Expire sessions and drop dead clients now; returns sessions expired.
    pub fn run_cleanup(&self) -> usize {
        self.state.run_cleanup()
    }

    pub fn stats(&self) -> TransportStats {
        let counters = &self.state.stats;
        TransportStats {
            requests: counters.requests.load(Ordering::Relaxed),
            sse_connections: counters.sse_connections.load(Ordering::Relaxed),
            events_sent: counters.events_sent.load(Ordering::Relaxed),
            errors: counters.errors.load(Ordering::Relaxed),
            active_clients: self.state.clients.count(),
            active_sessions: self.state.sessions.active_count(),
        }
    }
}

impl Drop for StreamableHttpTransport {
    fn drop(&mut self) {
        if let Some(server) = self.running.get_mut().take() {
            let _ = server.shutdown.send(true);
            self.state.clients.clear();
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    state: Arc<TransportState>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => {
                    trace!("New connection from {}", peer_addr);
                    tokio::spawn(serve_connection(stream, Arc::clone(&state), shutdown.clone()));
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    TransportState::bump(&state.stats.errors, 1);
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                }
            },
            _ = shutdown.changed() => break,
        }
    }
    debug!("Accept loop stopped");
}

async fn serve_connection(
    stream: TcpStream,
    state: Arc<TransportState>,
    mut shutdown: watch::Receiver<bool>,
) {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req| handle_request(req, Arc::clone(&state)));
    let conn = http1::Builder::new().serve_connection(io, service);
    tokio::pin!(conn);

    let mut draining = false;
    let result = loop {
        tokio::select! {
            result = conn.as_mut() => break result,
            _ = shutdown.changed(), if !draining => {
                draining = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    };

    if let Err(err) = result {
        let err_str = err.to_string();
        if err_str.contains("connection closed before message completed") {
            debug!("Client disconnected (normal): {}", err);
        } else {
            error!("Error serving connection: {}", err);
        }
    }
}

async fn heartbeat_loop(state: Arc<TransportState>, mut shutdown: watch::Receiver<bool>) {
    let period = state.config.heartbeat_interval();
    let mut ticker = interval_at(Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let reached = state.clients.broadcast_heartbeat();
                trace!("Heartbeat sent to {} SSE clients", reached);
            }
            _ = shutdown.changed() => break,
        }
    }
    debug!("Heartbeat task stopped");
}

async fn cleanup_loop(state: Arc<TransportState>, mut shutdown: watch::Receiver<bool>) {
    let period = state.config.cleanup_interval();
    let mut ticker = interval_at(Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                state.run_cleanup();
            }
            _ = shutdown.changed() => break,
        }
    }
    debug!("Cleanup task stopped");
}

async fn handle_request(
    req: Request<Incoming>,
    state: Arc<TransportState>,
) -> std::result::Result<Response<UnifiedBody>, hyper::Error> {
    TransportState::bump(&state.stats.requests, 1);
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let config = &state.config;
    let legacy = config.enable_legacy_endpoints;

    debug!("Handling {} {}", method, path);

    let mut response = if path == config.mcp_endpoint {
        match method {
            Method::POST => handle_post(req, &state).await,
            Method::GET => handle_get(req, &state),
            Method::DELETE => handle_delete(req, &state),
            Method::OPTIONS => preflight(&state, ENDPOINT_METHODS),
            _ => method_not_allowed(ENDPOINT_METHODS),
        }
    } else if legacy && path == "/call_tool" {
        match method {
            Method::POST => handle_post(req, &state).await,
            Method::OPTIONS => preflight(&state, "POST, OPTIONS"),
            _ => method_not_allowed("POST, OPTIONS"),
        }
    } else if legacy && path == "/events" {
        match method {
            Method::GET => handle_get(req, &state),
            Method::OPTIONS => preflight(&state, "GET, OPTIONS"),
            _ => method_not_allowed("GET, OPTIONS"),
        }
    } else if legacy && path == "/tools" {
        match method {
            Method::GET => json_response(state.handler.list_tools().await.to_string()),
            _ => method_not_allowed("GET"),
        }
    } else {
        serve_static(&state, &method, &path).await
    };

    if response.status().is_client_error() || response.status().is_server_error() {
        TransportState::bump(&state.stats.errors, 1);
    }
    if config.enable_cors {
        state.cors.apply(&state.cors_settings, response.headers_mut());
    }
    Ok(response)
}

async fn handle_post(req: Request<Incoming>, state: &Arc<TransportState>) -> Response<UnifiedBody> {
    if let Some(rejected) = reject_origin(state, &req) {
        return rejected;
    }
    let mut session_id = match resolve_session(state, &req) {
        Ok(session_id) => session_id,
        Err(response) => return response,
    };
    let wants_sse = accepts_event_stream(req.headers());
    let max_body_size = state.config.max_body_size;

    let declared_length = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<usize>().ok());
    if declared_length.is_some_and(|len| len > max_body_size) {
        warn!("Request body too large: {:?} bytes", declared_length);
        return text_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
    }

    let body_bytes = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            warn!("Failed to read request body: {}", err);
            return text_response(StatusCode::BAD_REQUEST, "Failed to read request body");
        }
    };
    if body_bytes.len() > max_body_size {
        warn!("Request body too large: {} bytes", body_bytes.len());
        return text_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
    }
    let body = match std::str::from_utf8(&body_bytes) {
        Ok(body) => body,
        Err(err) => {
            warn!("Request body is not valid UTF-8: {}", err);
            return text_response(StatusCode::BAD_REQUEST, "Request body must be valid UTF-8");
        }
    };
    if body.trim().is_empty() {
        return text_response(StatusCode::BAD_REQUEST, "Empty request body");
    }

    let mut created_session = None;
    if session_id.is_none()
        && state.config.enable_sessions
        && peek_method(body).as_deref() == Some("initialize")
    {
        match state.sessions.create(SessionTimeout::Default) {
            Ok(session) => {
                info!(session_id = %session.session_id, "Session created");
                session_id = Some(session.session_id.clone());
                created_session = Some(session.session_id);
            }
            Err(err) => {
                error!("Failed to create session: {}", err);
                return text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
            }
        }
    }

    let reply = state.handler.handle_message(body, session_id.as_deref()).await;

    if let Some(created) = &created_session {
        if reply.as_deref().is_none_or(is_error_reply) {
            debug!(session_id = %created, "Initialize failed; discarding new session");
            state.sessions.terminate(created);
            session_id = None;
        }
    }

    let mut response = match reply {
        None => status_response(StatusCode::ACCEPTED),
        Some(reply) if wants_sse => sse_reply(state, session_id.as_deref(), reply),
        Some(reply) => json_response(reply),
    };
    if let Some(session_id) = &session_id {
        set_session_header(&mut response, session_id);
    }
    response
}

fn handle_get(req: Request<Incoming>, state: &Arc<TransportState>) -> Response<UnifiedBody> {
    if let Some(rejected) = reject_origin(state, &req) {
        return rejected;
    }
    if !accepts_event_stream(req.headers()) {
        return text_response(
            StatusCode::BAD_REQUEST,
            "Accept header must include text/event-stream",
        );
    }
    let session_id = match resolve_session(state, &req) {
        Ok(session_id) => session_id,
        Err(response) => return response,
    };
    let last_event_id = extract_last_event_id(req.headers());

    let (sender, mut receiver) = mpsc::channel::<Bytes>(SSE_CHANNEL_CAPACITY);
    let connection = SseConnection::new(session_id.clone(), sender);
    let connection_id = connection.id();

    // Register under the replay lock so no event is both replayed and queued.
    let replay = match &last_event_id {
        Some(last) if state.config.enable_sse_resumability => {
            let (replay, _) = state
                .event_context(session_id.as_deref())
                .replay_and_attach(Some(last), || state.clients.add(connection));
            replay.into_iter().take(state.config.max_stored_events).collect()
        }
        _ => {
            state.clients.add(connection);
            Vec::new()
        }
    };
    let replayed = replay.len();
    let connection_event = SseEvent::connection(session_id.as_deref());

    TransportState::bump(&state.stats.sse_connections, 1);
    TransportState::bump(&state.stats.events_sent, replayed as u64 + 1);
    info!(
        session_id = ?session_id,
        connection_id,
        last_event_id = ?last_event_id,
        replayed,
        "SSE stream opened"
    );

    let guard = ConnectionGuard {
        clients: Arc::clone(&state.clients),
        id: connection_id,
    };
    let stream = async_stream::stream! {
        let _guard = guard;
        for event in replay {
            yield Ok::<Bytes, Infallible>(event.to_bytes());
        }
        yield Ok(connection_event.to_bytes());
        while let Some(frame) = receiver.recv().await {
            yield Ok(frame);
        }
    };

    let body: UnifiedBody = SseBody::new(stream)
        .map_err(|never| match never {})
        .boxed_unsync();
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(EVENT_STREAM_MIME));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    if let Some(session_id) = &session_id {
        set_session_header(&mut response, session_id);
    }
    response
}

fn handle_delete(req: Request<Incoming>, state: &Arc<TransportState>) -> Response<UnifiedBody> {
    if let Some(rejected) = reject_origin(state, &req) {
        return rejected;
    }
    let Some(session_id) = extract_session_id(req.headers()) else {
        return text_response(StatusCode::BAD_REQUEST, "Missing Mcp-Session-Id header");
    };

    if state.config.enable_sessions && state.sessions.terminate(&session_id) {
        let closed = state.drop_session_streams(&session_id);
        info!(session_id = %session_id, closed, "Session terminated");
        status_response(StatusCode::NO_CONTENT)
    } else {
        debug!(session_id = %session_id, "DELETE for unknown session");
        text_response(StatusCode::NOT_FOUND, "Session not found")
    }
}

fn preflight(state: &TransportState, allow: &'static str) -> Response<UnifiedBody> {
    let mut response = status_response(StatusCode::OK);
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static(allow));
    state.cors.apply(&state.cors_settings, response.headers_mut());
    response
}

async fn serve_static(state: &TransportState, method: &Method, path: &str) -> Response<UnifiedBody> {
    let Some(files) = &state.static_files else {
        return text_response(StatusCode::NOT_FOUND, "Not Found");
    };
    if *method != Method::GET {
        return text_response(StatusCode::NOT_FOUND, "Not Found");
    }
    match files.load(path).await {
        Some((contents, mime)) => {
            let mut response = Response::new(full_body(contents));
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(mime));
            response
        }
        None => text_response(StatusCode::NOT_FOUND, "Not Found"),
    }
}

/// 400 when origin validation is on and the request's `Origin` is not allowed
fn reject_origin(state: &TransportState, req: &Request<Incoming>) -> Option<Response<UnifiedBody>> {
    if !state.config.validate_origin {
        return None;
    }
    let origin = extract_origin(req.headers())?;
    if state.origins.is_allowed(&origin) {
        return None;
    }
    warn!(origin = %origin, "Origin not allowed");
    Some(text_response(StatusCode::BAD_REQUEST, "Origin not allowed"))
}

/// Bind the request to its session, touching it.
///
/// Without sessions enabled the header is ignored.
fn resolve_session(
    state: &TransportState,
    req: &Request<Incoming>,
) -> std::result::Result<Option<String>, Response<UnifiedBody>> {
    let Some(session_id) = extract_session_id(req.headers()) else {
        return Ok(None);
    };
    if !state.config.enable_sessions {
        return Ok(None);
    }
    if !is_valid_session_id(&session_id) {
        return Err(text_response(StatusCode::BAD_REQUEST, "Invalid session id"));
    }
    if state.sessions.get(&session_id).is_none() {
        debug!(session_id = %session_id, "Unknown or expired session");
        return Err(text_response(StatusCode::NOT_FOUND, "Session not found"));
    }
    state.sessions.touch(&session_id);
    Ok(Some(session_id))
}

fn sse_reply(state: &TransportState, session_id: Option<&str>, reply: String) -> Response<UnifiedBody> {
    let event = match session_id {
        Some(session_id) if state.config.enable_sse_resumability => state
            .event_context(Some(session_id))
            .store(None, Some("message".to_string()), reply),
        _ => SseEvent::message(reply),
    };
    TransportState::bump(&state.stats.events_sent, 1);

    let mut response = Response::new(full_body(event.to_bytes()));
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(EVENT_STREAM_MIME));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

fn is_error_reply(reply: &str) -> bool {
    serde_json::from_str::<Value>(reply).is_ok_and(|v| v.get("error").is_some())
}

/// Unregisters an SSE client when its response body is dropped
struct ConnectionGuard {
    clients: Arc<ClientRegistry>,
    id: ConnectionId,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.clients.remove(self.id) {
            debug!(connection_id = self.id, "SSE stream closed");
        }
    }
}

fn full_body(bytes: impl Into<Bytes>) -> UnifiedBody {
    Full::new(bytes.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

fn status_response(status: StatusCode) -> Response<UnifiedBody> {
    let mut response = Response::new(full_body(Bytes::new()));
    *response.status_mut() = status;
    response
}

fn text_response(status: StatusCode, message: &'static str) -> Response<UnifiedBody> {
    let mut response = Response::new(full_body(message));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

fn json_response(body: String) -> Response<UnifiedBody> {
    let length = body.len();
    let mut response = Response::new(full_body(body));
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MIME));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    response
}

fn method_not_allowed(allow: &'static str) -> Response<UnifiedBody> {
    let mut response = text_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static(allow));
    response
}

fn set_session_header(response: &mut Response<UnifiedBody>, session_id: &str) {
    match HeaderValue::from_str(session_id) {
        Ok(value) => {
            response.headers_mut().insert(MCP_SESSION_ID, value);
        }
        Err(_) => warn!("Session id is not a valid header value"),
    }
}

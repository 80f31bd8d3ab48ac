use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    dispatch::{JsonRpcMessage, JsonRpcMessageResult},
    error::{JsonRpcError, JsonRpcErrorObject},
    notification::JsonRpcNotification,
    request::{JsonRpcRequest, RequestParams},
    response::JsonRpcReply,
};

/// Per-request context handed to handlers.
///
/// `extensions` carries an opaque value owned by the layer above; the MCP
/// server stores the caller's auth context there.
#[derive(Clone, Default)]
pub struct SessionContext {
    /// Bound session, if the transport resolved one
    pub session_id: Option<String>,
    /// Free-form metadata
    pub metadata: HashMap<String, Value>,
    /// Opaque per-request value for upper layers
    pub extensions: Option<Arc<dyn Any + Send + Sync>>,
    /// Unix milliseconds at which the request was accepted
    pub timestamp: u64,
}

impl SessionContext {
    pub fn new(session_id: Option<String>) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self {
            session_id,
            metadata: HashMap::new(),
            extensions: None,
            timestamp,
        }
    }

    pub fn with_extension<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.extensions = Some(Arc::new(value));
        self
    }

    /// Borrow the extension if it has type `T`.
    pub fn extension<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.extensions.as_ref()?.downcast_ref::<T>()
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("session_id", &self.session_id)
            .field("metadata", &self.metadata)
            .field("has_extensions", &self.extensions.is_some())
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

/// Trait for handling JSON-RPC method calls
#[async_trait]
pub trait JsonRpcHandler: Send + Sync {
    /// The error type returned by this handler
    type Error: std::error::Error + Send + Sync + 'static;

    /// Handle a method call. Returns domain errors only; the dispatcher maps
    /// them to JSON-RPC error objects.
    async fn handle(
        &self,
        method: &str,
        params: Option<RequestParams>,
        session_context: Option<SessionContext>,
    ) -> Result<Value, Self::Error>;

    /// Handle a notification. Ignored unless overridden.
    async fn handle_notification(
        &self,
        method: &str,
        params: Option<RequestParams>,
        session_context: Option<SessionContext>,
    ) -> Result<(), Self::Error> {
        let _ = (method, params, session_context);
        Ok(())
    }

    /// Methods this handler serves, used for registration and introspection
    fn supported_methods(&self) -> Vec<String> {
        vec![]
    }
}

/// Trait for errors that can be converted to JSON-RPC error objects
pub trait ToJsonRpcError: std::error::Error + Send + Sync + 'static {
    fn to_error_object(&self) -> JsonRpcErrorObject;
}

/// Method-name dispatcher over a single domain error type
pub struct JsonRpcDispatcher<E>
where
    E: ToJsonRpcError,
{
    pub handlers: HashMap<String, Arc<dyn JsonRpcHandler<Error = E>>>,
    pub default_handler: Option<Arc<dyn JsonRpcHandler<Error = E>>>,
}

impl<E> JsonRpcDispatcher<E>
where
    E: ToJsonRpcError,
{
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            default_handler: None,
        }
    }

    /// Register a handler for a specific method
    pub fn register_method<H>(&mut self, method: impl Into<String>, handler: H)
    where
        H: JsonRpcHandler<Error = E> + 'static,
    {
        self.handlers.insert(method.into(), Arc::new(handler));
    }

    /// Register one handler under every method it reports as supported
    pub fn register_handler<H>(&mut self, handler: H)
    where
        H: JsonRpcHandler<Error = E> + 'static,
    {
        let methods = handler.supported_methods();
        let handler: Arc<dyn JsonRpcHandler<Error = E>> = Arc::new(handler);
        for method in methods {
            self.handlers.insert(method, handler.clone());
        }
    }

    /// Set a default handler for unregistered methods
    pub fn set_default_handler<H>(&mut self, handler: H)
    where
        H: JsonRpcHandler<Error = E> + 'static,
    {
        self.default_handler = Some(Arc::new(handler));
    }

    fn handler_for(&self, method: &str) -> Option<&Arc<dyn JsonRpcHandler<Error = E>>> {
        self.handlers.get(method).or(self.default_handler.as_ref())
    }

    /// Process a request and build its reply
    pub async fn handle_request_with_context(
        &self,
        request: JsonRpcRequest,
        session_context: SessionContext,
    ) -> JsonRpcReply {
        let Some(handler) = self.handler_for(&request.method) else {
            return JsonRpcReply::error(JsonRpcError::method_not_found(
                request.id,
                &request.method,
            ));
        };

        match handler
            .handle(&request.method, request.params, Some(session_context))
            .await
        {
            Ok(result) => JsonRpcReply::success(request.id, result),
            Err(domain_error) => {
                let error_object = domain_error.to_error_object();
                tracing::debug!(
                    method = %request.method,
                    code = error_object.code,
                    "Handler returned error: {}",
                    domain_error
                );
                JsonRpcReply::error(JsonRpcError::new(Some(request.id), error_object))
            }
        }
    }

    /// Process a notification. Unknown methods are ignored.
    pub async fn handle_notification_with_context(
        &self,
        notification: JsonRpcNotification,
        session_context: Option<SessionContext>,
    ) -> Result<(), E> {
        match self.handler_for(&notification.method) {
            Some(handler) => {
                handler
                    .handle_notification(&notification.method, notification.params, session_context)
                    .await
            }
            None => Ok(()),
        }
    }

    /// Process any classified message
    pub async fn handle_message(
        &self,
        message: JsonRpcMessage,
        session_context: SessionContext,
    ) -> JsonRpcMessageResult {
        match message {
            JsonRpcMessage::Request(request) => self
                .handle_request_with_context(request, session_context)
                .await
                .into(),
            JsonRpcMessage::Notification(notification) => {
                let method = notification.method.clone();
                if let Err(e) = self
                    .handle_notification_with_context(notification, Some(session_context))
                    .await
                {
                    tracing::warn!(method = %method, "Notification handler failed: {}", e);
                }
                JsonRpcMessageResult::NoResponse
            }
            JsonRpcMessage::Response(_) => JsonRpcMessageResult::NoResponse,
        }
    }

    /// Get all registered methods
    pub fn registered_methods(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }
}

impl<E> Default for JsonRpcDispatcher<E>
where
    E: ToJsonRpcError,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RequestId, parse_json_rpc_message};
    use serde_json::json;

    #[derive(thiserror::Error, Debug)]
    enum TestError {
        #[error("Test error: {0}")]
        Failed(String),
    }

    impl ToJsonRpcError for TestError {
        fn to_error_object(&self) -> JsonRpcErrorObject {
            match self {
                TestError::Failed(msg) => JsonRpcErrorObject::internal_error(Some(msg.clone())),
            }
        }
    }

    struct TestHandler;

    #[async_trait]
    impl JsonRpcHandler for TestHandler {
        type Error = TestError;

        async fn handle(
            &self,
            method: &str,
            _params: Option<RequestParams>,
            session_context: Option<SessionContext>,
        ) -> Result<Value, Self::Error> {
            match method {
                "whoami" => Ok(json!({
                    "session": session_context.and_then(|c| c.session_id),
                })),
                _ => Err(TestError::Failed("boom".to_string())),
            }
        }

        fn supported_methods(&self) -> Vec<String> {
            vec!["whoami".to_string(), "fail".to_string()]
        }
    }

    fn dispatcher() -> JsonRpcDispatcher<TestError> {
        let mut dispatcher = JsonRpcDispatcher::new();
        dispatcher.register_handler(TestHandler);
        dispatcher
    }

    #[tokio::test]
    async fn test_dispatcher_passes_context() {
        let request = JsonRpcRequest::new(RequestId::Number(1), "whoami", None);
        let reply = dispatcher()
            .handle_request_with_context(request, SessionContext::new(Some("abc".into())))
            .await;
        match reply {
            JsonRpcReply::Response(resp) => assert_eq!(resp.result["session"], "abc"),
            JsonRpcReply::Error(e) => panic!("unexpected error {}", e),
        }
    }

    #[tokio::test]
    async fn test_dispatcher_maps_domain_error() {
        let request = JsonRpcRequest::new(RequestId::Number(2), "fail", None);
        let reply = dispatcher()
            .handle_request_with_context(request, SessionContext::default())
            .await;
        assert!(reply.is_error());
        assert_eq!(reply.id(), Some(&RequestId::Number(2)));
    }

    #[tokio::test]
    async fn test_dispatcher_method_not_found() {
        let message =
            parse_json_rpc_message(r#"{"jsonrpc":"2.0","id":3,"method":"nope"}"#).unwrap();
        let result = dispatcher()
            .handle_message(message, SessionContext::default())
            .await;
        let json = result.to_json_string().unwrap();
        assert!(json.contains("-32601"));
    }

    #[tokio::test]
    async fn test_notification_produces_no_response() {
        let message = parse_json_rpc_message(r#"{"jsonrpc":"2.0","method":"whoami"}"#).unwrap();
        let result = dispatcher()
            .handle_message(message, SessionContext::default())
            .await;
        assert!(!result.needs_response());
    }

    #[test]
    fn test_extension_downcast() {
        let ctx = SessionContext::new(None).with_extension(42u32);
        assert_eq!(ctx.extension::<u32>(), Some(&42));
        assert!(ctx.extension::<String>().is_none());
    }
}

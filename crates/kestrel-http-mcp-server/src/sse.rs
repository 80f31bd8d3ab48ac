//! Server-Sent Events (SSE) framing and response body

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use http_body::{Body, Frame};
use serde_json::json;

/// Comment frame sent as keepalive
pub const HEARTBEAT_FRAME: &str = ": heartbeat\n\n";

/// One SSE event
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    pub id: Option<String>,
    pub event_type: Option<String>,
    pub data: String,
    pub timestamp: DateTime<Utc>,
}

impl SseEvent {
    pub fn new(id: Option<String>, event_type: Option<String>, data: impl Into<String>) -> Self {
        Self {
            id,
            event_type,
            data: data.into(),
            timestamp: Utc::now(),
        }
    }

    /// An unnumbered `message` event
    pub fn message(data: impl Into<String>) -> Self {
        Self::new(None, Some("message".to_string()), data)
    }

    /// The synthetic event emitted when a stream opens
    pub fn connection(session_id: Option<&str>) -> Self {
        let now = Utc::now();
        let payload = json!({
            "type": "connection",
            "session_id": session_id,
            "timestamp": now.timestamp(),
        });
        Self {
            id: None,
            event_type: Some("connection".to_string()),
            data: payload.to_string(),
            timestamp: now,
        }
    }

    /// Format as SSE wire text.
    ///
    /// Multi-line data becomes one `data:` line per line.
    pub fn format(&self) -> String {
        let mut out = String::with_capacity(self.data.len() + 32);
        if let Some(id) = &self.id {
            out.push_str("id: ");
            out.push_str(id);
            out.push('\n');
        }
        if let Some(event_type) = &self.event_type {
            out.push_str("event: ");
            out.push_str(event_type);
            out.push('\n');
        }
        let data = self.data.replace("\r\n", "\n").replace('\r', "\n");
        for line in data.split('\n') {
            out.push_str("data: ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        out
    }

    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.format())
    }
}

/// HTTP body over a stream of pre-framed SSE chunks
pub struct SseBody {
    stream: Pin<Box<dyn Stream<Item = Result<Bytes, Infallible>> + Send>>,
}

impl SseBody {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, Infallible>> + Send + 'static,
    {
        Self {
            stream: Box::pin(stream),
        }
    }
}

impl Body for SseBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.stream.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(data))) => Poll::Ready(Some(Ok(Frame::data(data)))),
            Poll::Ready(Some(Err(never))) => match never {},
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

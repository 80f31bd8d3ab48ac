//! # kestrel MCP client
//!
//! Client side of the Streamable HTTP transport: JSON-RPC requests over
//! `POST`, server push over a resumable SSE stream, and the two incremental
//! parsers those are built on.
//!
//! ```rust,no_run
//! use kestrel_mcp_client::{ClientConfig, StreamableHttpClient};
//! use serde_json::json;
//!
//! # async fn demo() -> kestrel_mcp_client::McpClientResult<()> {
//! let client = StreamableHttpClient::new(ClientConfig::new("http://127.0.0.1:8080/mcp"))?;
//! client.initialize().await?;
//! let result = client.call_tool("echo", json!({"text": "hi"})).await?;
//! println!("{}", result);
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod http_parser;
pub mod sse_parser;
pub mod transport;

pub use config::{ClientConfig, RetryConfig, TimeoutConfig};
pub use connection::{ConnectionState, StateCallback};
pub use error::{McpClientError, McpClientResult, ProtocolError, TransportError};
pub use http_parser::{
    ChunkedDecoder, HttpParseError, HttpResponse, HttpResponseParser, ParseStatus, ParserState,
    session_id_from_headers,
};
pub use sse_parser::{FeedOutcome, SseEvent, SseEventParser, SseParseError, SseParserState};
pub use transport::{PROTOCOL_VERSION, StreamableHttpClient};

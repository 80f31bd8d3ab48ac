//! Incremental HTTP/1.x response parser
//!
//! Bytes are fed in whatever pieces the socket hands out. The parser walks
//! `StatusLine -> Headers -> Body -> Complete`, and any malformed input moves
//! it to `Error` for good. Bytes that arrive after the response is complete
//! are kept and can be taken with [`HttpResponseParser::take_remaining`]; the
//! SSE reader uses this with a headers-only parser to hand the start of the
//! event stream over to the SSE parser.

use bytes::Bytes;
use thiserror::Error;

/// Longest status, header or chunk-size line accepted
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpParseError {
    #[error("invalid status line: {0}")]
    InvalidStatusLine(String),

    #[error("invalid header line: {0}")]
    InvalidHeader(String),

    #[error("invalid content-length: {0}")]
    InvalidContentLength(String),

    #[error("invalid chunk framing: {0}")]
    InvalidChunk(String),

    #[error("line exceeds {MAX_LINE_LENGTH} bytes")]
    LineTooLong,

    #[error("connection closed before the response was complete")]
    UnexpectedEof,

    #[error("parser is in the error state")]
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    StatusLine,
    Headers,
    Body,
    Complete,
    Error,
}

/// Outcome of one successful `feed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    NeedMore,
    Complete,
}

/// A parsed response.
///
/// Header names in `headers` are lowercase; `headers_blob` keeps the raw
/// header lines as received, CRLF-terminated.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub headers_blob: String,
    pub session_id: Option<String>,
    pub body: Bytes,
    pub content_length: usize,
}

impl HttpResponse {
    /// First value of `name`, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn is_event_stream(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("text/event-stream"))
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Find `Mcp-Session-Id` in a raw header block, in any ASCII case.
pub fn session_id_from_headers(headers_blob: &str) -> Option<String> {
    headers_blob.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if !name.trim().eq_ignore_ascii_case("mcp-session-id") {
            return None;
        }
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

#[derive(Debug)]
pub struct HttpResponseParser {
    state: ParserState,
    line_buffer: Vec<u8>,
    status_code: u16,
    content_length: usize,
    has_content_length: bool,
    is_chunked: bool,
    connection_close: bool,
    body_bytes_received: usize,
    headers_only: bool,
    read_until_close: bool,
    content_type: Option<String>,
    headers: Vec<(String, String)>,
    headers_blob: String,
    body: Vec<u8>,
    chunks: ChunkedDecoder,
    remaining: Vec<u8>,
}

impl Default for HttpResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpResponseParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::StatusLine,
            line_buffer: Vec::with_capacity(256),
            status_code: 0,
            content_length: 0,
            has_content_length: false,
            is_chunked: false,
            connection_close: false,
            body_bytes_received: 0,
            headers_only: false,
            read_until_close: false,
            content_type: None,
            headers: Vec::new(),
            headers_blob: String::new(),
            body: Vec::new(),
            chunks: ChunkedDecoder::new(),
            remaining: Vec::new(),
        }
    }

    /// A parser that completes at the blank line after the headers.
    ///
    /// Used for streaming responses whose body is consumed elsewhere.
    pub fn headers_only() -> Self {
        Self {
            headers_only: true,
            ..Self::new()
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn is_chunked(&self) -> bool {
        self.is_chunked
    }

    pub fn connection_close(&self) -> bool {
        self.connection_close
    }

    pub fn feed(&mut self, data: &[u8]) -> Result<ParseStatus, HttpParseError> {
        match self.state {
            ParserState::Error => return Err(HttpParseError::Failed),
            ParserState::Complete => {
                self.remaining.extend_from_slice(data);
                return Ok(ParseStatus::Complete);
            }
            _ => {}
        }

        match self.feed_inner(data) {
            Ok(()) if self.state == ParserState::Complete => Ok(ParseStatus::Complete),
            Ok(()) => Ok(ParseStatus::NeedMore),
            Err(err) => {
                self.state = ParserState::Error;
                Err(err)
            }
        }
    }

    /// Signal end of input. A body delimited by connection close completes
    /// here; anything else still pending is an error.
    pub fn finish(&mut self) -> Result<ParseStatus, HttpParseError> {
        match self.state {
            ParserState::Complete => Ok(ParseStatus::Complete),
            ParserState::Body if self.read_until_close => {
                self.state = ParserState::Complete;
                Ok(ParseStatus::Complete)
            }
            _ => {
                self.state = ParserState::Error;
                Err(HttpParseError::UnexpectedEof)
            }
        }
    }

    /// The parsed response, once complete
    pub fn response(&self) -> Option<HttpResponse> {
        if self.state != ParserState::Complete {
            return None;
        }
        let content_length = if self.has_content_length {
            self.content_length
        } else {
            self.body.len()
        };
        Some(HttpResponse {
            status_code: self.status_code,
            content_type: self.content_type.clone(),
            headers: self.headers.clone(),
            headers_blob: self.headers_blob.clone(),
            session_id: session_id_from_headers(&self.headers_blob),
            body: Bytes::copy_from_slice(&self.body),
            content_length,
        })
    }

    /// Bytes received after the response was complete
    pub fn take_remaining(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.remaining)
    }

    fn feed_inner(&mut self, data: &[u8]) -> Result<(), HttpParseError> {
        let mut pos = 0;
        while pos < data.len() {
            match self.state {
                ParserState::StatusLine | ParserState::Headers => {
                    let rest = &data[pos..];
                    match rest.iter().position(|&b| b == b'\n') {
                        Some(end) => {
                            push_line(&mut self.line_buffer, &rest[..end])?;
                            pos += end + 1;
                            let line = take_line(&mut self.line_buffer);
                            self.process_line(line)?;
                        }
                        None => {
                            push_line(&mut self.line_buffer, rest)?;
                            pos = data.len();
                        }
                    }
                }
                ParserState::Body => pos += self.consume_body(&data[pos..])?,
                ParserState::Complete => {
                    self.remaining.extend_from_slice(&data[pos..]);
                    break;
                }
                ParserState::Error => return Err(HttpParseError::Failed),
            }
        }
        Ok(())
    }

    fn process_line(&mut self, line: Vec<u8>) -> Result<(), HttpParseError> {
        let line = String::from_utf8_lossy(&line).into_owned();
        if self.state == ParserState::StatusLine {
            self.status_code = parse_status_line(&line)?;
            self.state = ParserState::Headers;
            return Ok(());
        }

        if line.is_empty() {
            self.finish_headers();
            return Ok(());
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| HttpParseError::InvalidHeader(line.clone()))?;
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim().to_string();
        if name.is_empty() {
            return Err(HttpParseError::InvalidHeader(line));
        }

        match name.as_str() {
            "content-length" => {
                self.content_length = value
                    .parse()
                    .map_err(|_| HttpParseError::InvalidContentLength(value.clone()))?;
                self.has_content_length = true;
            }
            "transfer-encoding" => {
                self.is_chunked = value.to_ascii_lowercase().contains("chunked");
            }
            "connection" => {
                self.connection_close = value
                    .split(',')
                    .any(|token| token.trim().eq_ignore_ascii_case("close"));
            }
            "content-type" => self.content_type = Some(value.clone()),
            _ => {}
        }

        self.headers_blob.push_str(&line);
        self.headers_blob.push_str("\r\n");
        self.headers.push((name, value));
        Ok(())
    }

    fn finish_headers(&mut self) {
        self.state = if self.headers_only {
            ParserState::Complete
        } else if self.is_chunked {
            ParserState::Body
        } else if self.has_content_length {
            if self.content_length == 0 {
                ParserState::Complete
            } else {
                ParserState::Body
            }
        } else if has_no_body(self.status_code) {
            ParserState::Complete
        } else if self.connection_close {
            self.read_until_close = true;
            ParserState::Body
        } else {
            ParserState::Complete
        };
    }

    fn consume_body(&mut self, data: &[u8]) -> Result<usize, HttpParseError> {
        if self.is_chunked {
            let consumed = self.chunks.decode(data, &mut self.body)?;
            self.body_bytes_received = self.body.len();
            if self.chunks.is_done() {
                self.state = ParserState::Complete;
            }
            return Ok(consumed);
        }

        if self.read_until_close {
            self.body.extend_from_slice(data);
            self.body_bytes_received += data.len();
            return Ok(data.len());
        }

        let wanted = self.content_length - self.body_bytes_received;
        let take = wanted.min(data.len());
        self.body.extend_from_slice(&data[..take]);
        self.body_bytes_received += take;
        if self.body_bytes_received == self.content_length {
            self.state = ParserState::Complete;
        }
        Ok(take)
    }
}

fn push_line(buffer: &mut Vec<u8>, bytes: &[u8]) -> Result<(), HttpParseError> {
    if buffer.len() + bytes.len() > MAX_LINE_LENGTH {
        return Err(HttpParseError::LineTooLong);
    }
    buffer.extend_from_slice(bytes);
    Ok(())
}

/// Take the buffered line, dropping a trailing `\r`
fn take_line(buffer: &mut Vec<u8>) -> Vec<u8> {
    let mut line = std::mem::take(buffer);
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    line
}

fn parse_status_line(line: &str) -> Result<u16, HttpParseError> {
    let invalid = || HttpParseError::InvalidStatusLine(line.to_string());
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().ok_or_else(invalid)?;
    if !version.starts_with("HTTP/1.") {
        return Err(invalid());
    }
    let code = parts.next().ok_or_else(invalid)?;
    if code.len() != 3 {
        return Err(invalid());
    }
    let code: u16 = code.parse().map_err(|_| invalid())?;
    if !(100..=599).contains(&code) {
        return Err(invalid());
    }
    Ok(code)
}

fn has_no_body(status: u16) -> bool {
    (100..200).contains(&status) || status == 204 || status == 304
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    Size,
    Data(usize),
    DataEnd,
    Trailer,
    Done,
}

/// Decoder for `Transfer-Encoding: chunked` bodies
#[derive(Debug)]
pub struct ChunkedDecoder {
    state: ChunkState,
    line: Vec<u8>,
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self {
            state: ChunkState::Size,
            line: Vec::new(),
        }
    }

    /// True once the zero-size chunk and trailers have been read
    pub fn is_done(&self) -> bool {
        self.state == ChunkState::Done
    }

    /// Append decoded payload to `out`; returns the input bytes consumed.
    ///
    /// Consumption stops at the end of the chunked body.
    pub fn decode(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<usize, HttpParseError> {
        let mut pos = 0;
        while pos < input.len() {
            match self.state {
                ChunkState::Done => break,
                ChunkState::Data(left) => {
                    let take = left.min(input.len() - pos);
                    out.extend_from_slice(&input[pos..pos + take]);
                    pos += take;
                    self.state = if take == left {
                        ChunkState::DataEnd
                    } else {
                        ChunkState::Data(left - take)
                    };
                }
                ChunkState::Size | ChunkState::DataEnd | ChunkState::Trailer => {
                    let rest = &input[pos..];
                    let Some(end) = rest.iter().position(|&b| b == b'\n') else {
                        push_line(&mut self.line, rest)?;
                        pos = input.len();
                        continue;
                    };
                    push_line(&mut self.line, &rest[..end])?;
                    pos += end + 1;
                    let line = take_line(&mut self.line);
                    self.process_line(&line)?;
                }
            }
        }
        Ok(pos)
    }

    fn process_line(&mut self, line: &[u8]) -> Result<(), HttpParseError> {
        let text = String::from_utf8_lossy(line);
        match self.state {
            ChunkState::Size => {
                let size_text = text.split(';').next().unwrap_or_default().trim();
                let size = usize::from_str_radix(size_text, 16)
                    .map_err(|_| HttpParseError::InvalidChunk(text.to_string()))?;
                self.state = if size == 0 {
                    ChunkState::Trailer
                } else {
                    ChunkState::Data(size)
                };
            }
            ChunkState::DataEnd => {
                if !line.is_empty() {
                    return Err(HttpParseError::InvalidChunk(
                        "missing CRLF after chunk data".to_string(),
                    ));
                }
                self.state = ChunkState::Size;
            }
            ChunkState::Trailer => {
                if line.is_empty() {
                    self.state = ChunkState::Done;
                }
            }
            ChunkState::Data(_) | ChunkState::Done => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON_RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\n\
        Content-Type: application/json\r\n\
        MCP-Session-ID: 0123456789abcdef0123456789abcdef\r\n\
        Content-Length: 13\r\n\
        \r\n\
        {\"result\":1}\n";

    #[test]
    fn test_complete_response_in_one_feed() {
        let mut parser = HttpResponseParser::new();
        assert_eq!(parser.feed(JSON_RESPONSE).unwrap(), ParseStatus::Complete);

        let response = parser.response().unwrap();
        assert_eq!(response.status_code, 200);
        assert_eq!(response.content_type.as_deref(), Some("application/json"));
        assert_eq!(response.content_length, 13);
        assert_eq!(&response.body[..], b"{\"result\":1}\n");
        assert_eq!(
            response.session_id.as_deref(),
            Some("0123456789abcdef0123456789abcdef")
        );
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert!(response.headers.iter().all(|(name, _)| name == &name.to_ascii_lowercase()));
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut parser = HttpResponseParser::new();
        let (last, head) = JSON_RESPONSE.split_last().unwrap();
        for byte in head {
            assert_eq!(parser.feed(&[*byte]).unwrap(), ParseStatus::NeedMore);
        }
        assert_eq!(parser.feed(&[*last]).unwrap(), ParseStatus::Complete);
        assert_eq!(parser.response().unwrap().body_text(), "{\"result\":1}\n");
    }

    #[test]
    fn test_session_id_any_case() {
        for name in ["Mcp-Session-Id", "mcp-session-id", "MCP-SESSION-ID", "mCp-SeSsIoN-iD"] {
            let blob = format!("Content-Type: text/plain\r\n{}:  abc123 \r\n", name);
            assert_eq!(session_id_from_headers(&blob).as_deref(), Some("abc123"));
        }
        assert_eq!(session_id_from_headers("Mcp-Session-Id:\r\n"), None);
        assert_eq!(session_id_from_headers("X-Other: 1\r\n"), None);
    }

    #[test]
    fn test_no_content_status() {
        let mut parser = HttpResponseParser::new();
        let status = parser.feed(b"HTTP/1.1 204 No Content\r\nDate: x\r\n\r\n").unwrap();
        assert_eq!(status, ParseStatus::Complete);
        let response = parser.response().unwrap();
        assert_eq!(response.status_code, 204);
        assert!(response.body.is_empty());
    }

    #[test]
    fn test_chunked_body_across_feeds() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n7;ext=1\r\n, world\r\n0\r\n\r\n";
        let mut parser = HttpResponseParser::new();
        let mut status = ParseStatus::NeedMore;
        for piece in raw.chunks(3) {
            status = parser.feed(piece).unwrap();
        }
        assert_eq!(status, ParseStatus::Complete);
        assert!(parser.is_chunked());
        assert_eq!(parser.response().unwrap().body_text(), "hello, world");
    }

    #[test]
    fn test_headers_only_keeps_remaining_bytes() {
        let mut parser = HttpResponseParser::headers_only();
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nTransfer-Encoding: chunked\r\n\r\n1a\r\nevent: connection\ndata: {}";
        assert_eq!(parser.feed(raw).unwrap(), ParseStatus::Complete);
        assert!(parser.response().unwrap().is_event_stream());
        assert_eq!(parser.take_remaining(), b"1a\r\nevent: connection\ndata: {}".to_vec());

        parser.feed(b"\n\n").unwrap();
        assert_eq!(parser.take_remaining(), b"\n\n".to_vec());
    }

    #[test]
    fn test_body_until_close() {
        let mut parser = HttpResponseParser::new();
        let status = parser
            .feed(b"HTTP/1.0 200 OK\r\nConnection: close\r\n\r\npartial")
            .unwrap();
        assert_eq!(status, ParseStatus::NeedMore);
        parser.feed(b" body").unwrap();
        assert_eq!(parser.finish().unwrap(), ParseStatus::Complete);
        assert_eq!(parser.response().unwrap().body_text(), "partial body");
    }

    #[test]
    fn test_eof_mid_body_is_error() {
        let mut parser = HttpResponseParser::new();
        parser
            .feed(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nabc")
            .unwrap();
        assert_eq!(parser.finish(), Err(HttpParseError::UnexpectedEof));
        assert_eq!(parser.state(), ParserState::Error);
        assert!(parser.response().is_none());
    }

    #[test]
    fn test_malformed_input_poisons_parser() {
        let mut parser = HttpResponseParser::new();
        assert!(matches!(
            parser.feed(b"SPDY/3 200 OK\r\n"),
            Err(HttpParseError::InvalidStatusLine(_))
        ));
        assert_eq!(parser.feed(b"HTTP/1.1 200 OK\r\n"), Err(HttpParseError::Failed));

        let mut parser = HttpResponseParser::new();
        assert!(matches!(
            parser.feed(b"HTTP/1.1 200 OK\r\nno colon here\r\n"),
            Err(HttpParseError::InvalidHeader(_))
        ));

        let mut parser = HttpResponseParser::new();
        assert!(matches!(
            parser.feed(b"HTTP/1.1 200 OK\r\nContent-Length: ten\r\n"),
            Err(HttpParseError::InvalidContentLength(_))
        ));

        let mut parser = HttpResponseParser::new();
        let long = vec![b'a'; MAX_LINE_LENGTH + 1];
        assert_eq!(parser.feed(&long), Err(HttpParseError::LineTooLong));
    }

    #[test]
    fn test_bad_chunk_size() {
        let mut parser = HttpResponseParser::new();
        let result = parser.feed(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\n");
        assert!(matches!(result, Err(HttpParseError::InvalidChunk(_))));
    }
}

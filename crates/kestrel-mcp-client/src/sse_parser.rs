//! Incremental Server-Sent Events parser

use thiserror::Error;
use tracing::trace;

/// Longest single SSE line accepted
pub const MAX_SSE_LINE_LENGTH: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SseParseError {
    #[error("SSE line exceeds {MAX_SSE_LINE_LENGTH} bytes")]
    LineTooLong,

    #[error("SSE field is not valid UTF-8")]
    InvalidUtf8,
}

/// One event received from the server
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseEvent {
    pub id: Option<String>,
    pub event_type: Option<String>,
    pub data: String,
}

/// Everything one [`SseEventParser::feed`] call produced.
///
/// Parsing resumes at the next line after an error, so events on both sides
/// of a bad line are kept. `error` holds the first error met.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedOutcome {
    pub events: Vec<SseEvent>,
    pub error: Option<SseParseError>,
}

impl FeedOutcome {
    /// The events, or the error if one occurred
    pub fn into_result(self) -> Result<Vec<SseEvent>, SseParseError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.events),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseParserState {
    FieldName,
    FieldValue,
    /// An event was just returned
    EventComplete,
    /// The last call failed; the next byte starts a fresh event
    Error,
}

/// Line-oriented SSE state machine.
///
/// `\n` and `\r\n` both end a line and any other `\r` is dropped. Successive
/// `data:` lines are joined with `\n`. A blank line ends the event; blocks
/// made only of comments (such as heartbeats) produce nothing.
#[derive(Debug)]
pub struct SseEventParser {
    state: SseParserState,
    buffer: Vec<u8>,
    cursor: usize,
    current_field_name: Vec<u8>,
    current_field_value: Vec<u8>,
    skip_space: bool,
    discard_line: bool,
    data_accumulator: String,
    data_seen: bool,
    event_id: Option<String>,
    event_type: Option<String>,
    has_fields: bool,
}

impl Default for SseEventParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SseEventParser {
    pub fn new() -> Self {
        Self {
            state: SseParserState::FieldName,
            buffer: Vec::new(),
            cursor: 0,
            current_field_name: Vec::new(),
            current_field_value: Vec::new(),
            skip_space: false,
            discard_line: false,
            data_accumulator: String::new(),
            data_seen: false,
            event_id: None,
            event_type: None,
            has_fields: false,
        }
    }

    pub fn state(&self) -> SseParserState {
        self.state
    }

    /// Queue bytes for parsing
    pub fn push(&mut self, data: &[u8]) {
        if self.cursor == self.buffer.len() {
            self.buffer.clear();
            self.cursor = 0;
        }
        self.buffer.extend_from_slice(data);
    }

    /// Parse queued bytes up to the next complete event.
    ///
    /// `Ok(None)` means more input is needed. After an error the event in
    /// progress is dropped and parsing resumes at the next line.
    pub fn next_event(&mut self) -> Result<Option<SseEvent>, SseParseError> {
        while self.cursor < self.buffer.len() {
            let byte = self.buffer[self.cursor];
            self.cursor += 1;

            if matches!(self.state, SseParserState::EventComplete | SseParserState::Error) {
                self.state = SseParserState::FieldName;
            }

            if self.discard_line {
                if byte == b'\n' {
                    self.discard_line = false;
                }
                continue;
            }

            match byte {
                b'\n' => match self.end_line() {
                    Ok(Some(event)) => return Ok(Some(event)),
                    Ok(None) => {}
                    Err(err) => {
                        self.fail();
                        return Err(err);
                    }
                },
                b'\r' => {}
                b':' if self.state == SseParserState::FieldName => {
                    self.state = SseParserState::FieldValue;
                    self.skip_space = true;
                }
                b' ' if self.state == SseParserState::FieldValue && self.skip_space => {
                    self.skip_space = false;
                }
                _ => {
                    if self.current_field_name.len() + self.current_field_value.len()
                        >= MAX_SSE_LINE_LENGTH
                    {
                        self.fail();
                        self.discard_line = true;
                        return Err(SseParseError::LineTooLong);
                    }
                    self.skip_space = false;
                    if self.state == SseParserState::FieldName {
                        self.current_field_name.push(byte);
                    } else {
                        self.current_field_value.push(byte);
                    }
                }
            }
        }
        Ok(None)
    }

    /// Push `data` and collect every event it completes.
    pub fn feed(&mut self, data: &[u8]) -> FeedOutcome {
        self.push(data);
        let mut outcome = FeedOutcome::default();
        loop {
            match self.next_event() {
                Ok(Some(event)) => outcome.events.push(event),
                Ok(None) => break,
                Err(err) => {
                    outcome.error.get_or_insert(err);
                }
            }
        }
        outcome
    }

    fn end_line(&mut self) -> Result<Option<SseEvent>, SseParseError> {
        let had_colon = self.state == SseParserState::FieldValue;
        let name = std::mem::take(&mut self.current_field_name);
        let value = std::mem::take(&mut self.current_field_value);
        self.state = SseParserState::FieldName;
        self.skip_space = false;

        if name.is_empty() {
            if had_colon {
                // comment line
                return Ok(None);
            }
            return Ok(self.dispatch());
        }

        let name = String::from_utf8(name).map_err(|_| SseParseError::InvalidUtf8)?;
        let value = String::from_utf8(value).map_err(|_| SseParseError::InvalidUtf8)?;
        match name.as_str() {
            "id" => {
                self.event_id = Some(value);
                self.has_fields = true;
            }
            "event" => {
                self.event_type = Some(value);
                self.has_fields = true;
            }
            "data" => {
                if self.data_seen {
                    self.data_accumulator.push('\n');
                }
                self.data_accumulator.push_str(&value);
                self.data_seen = true;
                self.has_fields = true;
            }
            other => trace!(field = %other, "Ignoring SSE field"),
        }
        Ok(None)
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if !self.has_fields {
            return None;
        }
        let event = SseEvent {
            id: self.event_id.take(),
            event_type: self.event_type.take(),
            data: std::mem::take(&mut self.data_accumulator),
        };
        self.data_seen = false;
        self.has_fields = false;
        self.state = SseParserState::EventComplete;
        Some(event)
    }

    fn fail(&mut self) {
        self.current_field_name.clear();
        self.current_field_value.clear();
        self.data_accumulator.clear();
        self.data_seen = false;
        self.event_id = None;
        self.event_type = None;
        self.has_fields = false;
        self.skip_space = false;
        self.state = SseParserState::Error;
    }
}

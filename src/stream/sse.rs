//! `text/event-stream` decoding.
//!
//! Bytes are fed in arbitrary chunks; complete events come out. Field
//! handling follows the event-stream format:
//!
//! - lines end with LF, CRLF or CR
//! - `data:` lines accumulate, joined with LF
//! - one space after the colon is stripped
//! - `:` starts a comment line
//! - a blank line dispatches the pending event if it carries data
//! - `id` and `retry` are accepted and ignored
//!
//! A single line longer than the decoder's limit is refused instead of
//! buffered, so a peer that never sends a line break cannot grow memory
//! without bound.

use thiserror::Error;

/// Default event type; only these events carry frames.
pub const MESSAGE_EVENT: &str = "message";

/// Default cap on one line, terminator excluded.
pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("event-stream line exceeds {limit} bytes")]
pub struct LineTooLong {
    pub limit: usize,
}

/// One dispatched event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

impl SseEvent {
    pub fn is_message(&self) -> bool {
        self.event == MESSAGE_EVENT
    }
}

#[derive(Debug)]
pub struct SseDecoder {
    line: Vec<u8>,
    data: String,
    event: Option<String>,
    has_data: bool,
    last_was_cr: bool,
    max_line: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            line: Vec::new(),
            data: String::new(),
            event: None,
            has_data: false,
            last_was_cr: false,
            max_line,
        }
    }

    /// Feed a chunk of the body and collect any events it completes.
    ///
    /// Fails once the line being assembled passes the limit; the decoder
    /// should not be fed again after that.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<SseEvent>, LineTooLong> {
        let mut events = Vec::new();
        for &byte in chunk {
            match byte {
                b'\n' if self.last_was_cr => {
                    self.last_was_cr = false;
                }
                b'\n' | b'\r' => {
                    self.last_was_cr = byte == b'\r';
                    let line = std::mem::take(&mut self.line);
                    if let Some(event) = self.process_line(&line) {
                        events.push(event);
                    }
                }
                _ => {
                    self.last_was_cr = false;
                    if self.line.len() >= self.max_line {
                        self.line = Vec::new();
                        return Err(LineTooLong {
                            limit: self.max_line,
                        });
                    }
                    self.line.push(byte);
                }
            }
        }
        Ok(events)
    }

    fn process_line(&mut self, raw: &[u8]) -> Option<SseEvent> {
        if raw.is_empty() {
            return self.dispatch();
        }
        let line = String::from_utf8_lossy(raw);
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (&*line, ""),
        };

        match field {
            "data" => {
                if self.has_data {
                    self.data.push('\n');
                }
                self.data.push_str(value);
                self.has_data = true;
            }
            "event" => self.event = Some(value.to_string()),
            "id" | "retry" => {}
            other => log::trace!("ignoring event-stream field '{}'", other),
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if !self.has_data {
            self.data.clear();
            return None;
        }
        self.has_data = false;
        let event = match event {
            Some(name) if !name.is_empty() => name,
            _ => MESSAGE_EVENT.to_string(),
        };
        Some(SseEvent {
            event,
            data: std::mem::take(&mut self.data),
        })
    }
}

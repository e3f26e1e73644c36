//! Incremental parser for Content-Length framed responses.
//!
//! The language server's output arrives as an arbitrary chunking of bytes;
//! the parser assembles exactly one framed message from it, no matter how
//! the chunks fall. Each instance is single-use: once it yields a response
//! or an error it is dropped, and the next exchange starts with a fresh one.

use std::collections::HashMap;

use thiserror::Error;

use crate::lsp::protocol::Response;

/// Errors produced while assembling one framed response.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The header section ended before any header was seen.
    #[error("did not receive response headers")]
    MissingHeaders,
    /// A header line began with the name/value separator.
    #[error("received header with empty name")]
    EmptyHeaderName,
    /// The content length header was absent or not a non-negative integer.
    #[error("did not receive a valid content length")]
    InvalidContentLength,
    /// More bytes arrived than the declared content length allows.
    #[error("received content exceeded content-length")]
    ContentOverflow,
    /// The body completed but was not valid JSON for a response.
    #[error("unable to deserialize response content: {0}")]
    MalformedBody(#[source] serde_json::Error),
}

/// Byte-at-a-time parser for a single framed response.
///
/// Feed it chunks as they arrive; it scans forward over everything received
/// so far and reports one of three outcomes: more bytes needed, a complete
/// response, or a framing error. Feeding one byte at a time produces the
/// same result as one large chunk.
pub struct ResponseParser {
    /// Everything received so far.
    received: Vec<u8>,
    /// Scan position within `received`.
    cursor: usize,
    /// Headers collected so far; later duplicates overwrite earlier ones.
    headers: HashMap<String, String>,
    headers_parsed: bool,
    /// Body length declared by the content length header.
    content_length: usize,
    /// Previous byte seen, for CRLF detection.
    last: u8,
    /// Current header line, then the body, as it accumulates.
    buffer: Vec<u8>,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self {
            received: Vec::new(),
            cursor: 0,
            headers: HashMap::new(),
            headers_parsed: false,
            content_length: 0,
            last: 0,
            buffer: Vec::new(),
        }
    }

    /// Consume the next chunk of stream output.
    ///
    /// Returns `Ok(None)` while the frame is still incomplete, and
    /// `Ok(Some(response))` once the declared body length has been reached
    /// and deserialized, with the frame headers attached to the response.
    ///
    /// # Errors
    ///
    /// Header-section errors surface as soon as the offending line
    /// terminates; `ContentOverflow` surfaces when the body completes while
    /// later bytes are already buffered; `MalformedBody` when the completed
    /// body is not valid JSON.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Option<Response>, FrameError> {
        self.received.extend_from_slice(chunk);

        while self.cursor < self.received.len() {
            let byte = self.received[self.cursor];

            if self.headers_parsed {
                self.buffer.push(byte);

                if self.buffer.len() == self.content_length {
                    if self.cursor + 1 < self.received.len() {
                        return Err(FrameError::ContentOverflow);
                    }

                    let mut response: Response = serde_json::from_slice(&self.buffer)
                        .map_err(FrameError::MalformedBody)?;
                    response.headers = std::mem::take(&mut self.headers);
                    return Ok(Some(response));
                }
            } else if byte == b'\n' && self.last == b'\r' {
                if self.buffer.is_empty() {
                    if self.headers.is_empty() {
                        return Err(FrameError::MissingHeaders);
                    }

                    self.headers_parsed = true;
                    self.content_length = self.declared_content_length()?;
                } else {
                    let line = String::from_utf8_lossy(&self.buffer).into_owned();
                    let (name, value) = match line.split_once(": ") {
                        Some((name, value)) => (name.to_owned(), value.to_owned()),
                        None => (line, String::new()),
                    };
                    if name.is_empty() {
                        return Err(FrameError::EmptyHeaderName);
                    }

                    self.headers.insert(name, value);
                    self.buffer.clear();
                }
            } else if byte != b'\r' && byte != b'\n' {
                self.buffer.push(byte);
            }

            self.last = byte;
            self.cursor += 1;
        }

        Ok(None)
    }

    /// Look up the declared body length, case-insensitively.
    fn declared_content_length(&self) -> Result<usize, FrameError> {
        for (name, value) in &self.headers {
            if name.eq_ignore_ascii_case("content-length") {
                return value.parse().map_err(|_| FrameError::InvalidContentLength);
            }
        }

        Err(FrameError::InvalidContentLength)
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

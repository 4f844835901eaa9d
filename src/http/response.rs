//! Response assembly with enforced emission order.
//!
//! # Responsibilities
//! - Order the status line, header section and body
//! - Buffer plain and chunked body bytes
//! - Append trailers announced through the `trailer` header
//!
//! # States
//! ```text
//! Init → StatusLine → Headers → Body
//! ```
//!
//! # Design Decisions
//! - `serialize` consumes the writer, so a response is assembled exactly once
//! - `content-length` is computed at serialization unless it was deleted or
//!   the body is chunked
//! - Header and trailer fields are emitted in insertion order

use http::StatusCode;
use thiserror::Error;

use crate::http::headers::{Headers, CRLF};

const CHUNK_TERMINATOR: &[u8] = b"0\r\n";

/// Ordering and trailer violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriterError {
    #[error("headers can only be written before the body")]
    HeadersAfterBody,

    #[error("headers must be written before the body")]
    BodyBeforeHeaders,

    #[error("trailer {0} not announced in Trailer header")]
    UnannouncedTrailer(String),

    #[error("no trailers initialized: missing Trailer header")]
    TrailersNotInitialized,
}

/// Writer progress marker. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum WriterState {
    #[default]
    Init,
    StatusLine,
    Headers,
    Body,
}

/// Headers every response carries unless the handler overrides them.
pub fn default_headers(content_length: usize) -> Headers {
    let mut headers = Headers::new();
    headers.set("content-length", content_length.to_string());
    headers.set("connection", "close");
    headers.set("content-type", "text/plain");
    headers
}

/// Serialize a status line, e.g. `HTTP/1.1 200 OK\r\n`.
pub fn status_line(code: StatusCode) -> String {
    format!(
        "HTTP/1.1 {} {}\r\n",
        code.as_u16(),
        code.canonical_reason().unwrap_or("Unknown")
    )
}

/// Builds a single response for one connection.
#[derive(Debug)]
pub struct ResponseWriter {
    state: WriterState,
    status: Option<StatusCode>,
    headers: Headers,
    body: Vec<u8>,
    trailers: Headers,
    auto_content_length: bool,
    chunks_done: bool,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self {
            state: WriterState::Init,
            status: None,
            headers: default_headers(0),
            body: Vec::new(),
            trailers: Headers::new(),
            auto_content_length: true,
            chunks_done: false,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Status that will be sent; `200 OK` if none was written.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn trailers(&self) -> &Headers {
        &self.trailers
    }

    /// Record the status line. Always legal; a later call replaces the code.
    pub fn write_status_line(&mut self, code: StatusCode) {
        self.status = Some(code);
        self.advance(WriterState::StatusLine);
    }

    /// Replace the held header collection.
    ///
    /// Default `connection` and `content-type` fields missing from
    /// `headers` are carried over.
    pub fn write_headers(&mut self, mut headers: Headers) -> Result<(), WriterError> {
        if self.state == WriterState::Body {
            return Err(WriterError::HeadersAfterBody);
        }
        for name in ["connection", "content-type"] {
            if !headers.contains(name) {
                if let Some(value) = self.headers.get(name) {
                    headers.set(name, value);
                }
            }
        }
        self.headers = headers;
        self.advance(WriterState::Headers);
        Ok(())
    }

    /// Remove a header. Deleting `content-length` also disables its
    /// automatic computation.
    pub fn delete_header(&mut self, name: &str) {
        if name.eq_ignore_ascii_case("content-length") {
            self.auto_content_length = false;
        }
        self.headers.delete(name);
    }

    /// Append raw bytes to the body.
    pub fn write_body(&mut self, data: &[u8]) -> Result<usize, WriterError> {
        self.begin_body()?;
        self.body.extend_from_slice(data);
        Ok(data.len())
    }

    /// Append one chunk: hex length, CRLF, payload, CRLF.
    ///
    /// An empty payload writes nothing; use [`write_chunked_body_done`]
    /// to terminate the stream.
    ///
    /// [`write_chunked_body_done`]: ResponseWriter::write_chunked_body_done
    pub fn write_chunked_body(&mut self, data: &[u8]) -> Result<usize, WriterError> {
        self.begin_body()?;
        if data.is_empty() {
            return Ok(0);
        }
        let before = self.body.len();
        self.body
            .extend_from_slice(format!("{:X}", data.len()).as_bytes());
        self.body.extend_from_slice(CRLF);
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(CRLF);
        Ok(self.body.len() - before)
    }

    /// Append the zero-length terminating chunk.
    pub fn write_chunked_body_done(&mut self) -> Result<usize, WriterError> {
        self.begin_body()?;
        self.body.extend_from_slice(CHUNK_TERMINATOR);
        self.chunks_done = true;
        Ok(CHUNK_TERMINATOR.len())
    }

    /// Merge trailer fields announced by the `trailer` header.
    ///
    /// Nothing is merged if any field is unannounced.
    pub fn write_trailers(&mut self, trailers: Headers) -> Result<(), WriterError> {
        let announced: Vec<String> = self
            .headers
            .get("trailer")
            .ok_or(WriterError::TrailersNotInitialized)?
            .split(',')
            .map(|name| name.trim().to_ascii_lowercase())
            .collect();

        if let Some((name, _)) = trailers
            .iter()
            .find(|(name, _)| !announced.iter().any(|a| a == name))
        {
            return Err(WriterError::UnannouncedTrailer(name.to_string()));
        }

        for (name, value) in trailers.iter() {
            self.trailers.set(name, value);
        }
        Ok(())
    }

    /// Assemble the full response.
    pub fn serialize(mut self) -> Vec<u8> {
        let chunked = self.is_chunked();
        if self.auto_content_length && !chunked {
            self.headers
                .set("content-length", self.body.len().to_string());
        }

        let mut out = status_line(self.status()).into_bytes();
        self.headers.write_to(&mut out);
        out.extend_from_slice(CRLF);
        out.extend_from_slice(&self.body);
        if chunked && (self.chunks_done || !self.trailers.is_empty()) {
            if !self.chunks_done {
                out.extend_from_slice(CHUNK_TERMINATOR);
            }
            self.trailers.write_to(&mut out);
            out.extend_from_slice(CRLF);
        }
        out
    }

    fn is_chunked(&self) -> bool {
        self.headers
            .get("transfer-encoding")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("chunked"))
    }

    fn begin_body(&mut self) -> Result<(), WriterError> {
        if self.state < WriterState::Headers {
            return Err(WriterError::BodyBeforeHeaders);
        }
        self.state = WriterState::Body;
        Ok(())
    }

    fn advance(&mut self, to: WriterState) {
        self.state = self.state.max(to);
    }
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

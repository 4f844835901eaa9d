//! Incremental HTTP/1.1 request parsing.
//!
//! # Responsibilities
//! - Parse the request line, header section and `content-length` body
//! - Resume cleanly when bytes arrive in arbitrarily small pieces
//! - Drive the parser from any `AsyncRead` with a compacting buffer
//!
//! # States
//! ```text
//! Init → Headers → Body → Done
//! ```
//!
//! # Design Decisions
//! - Every step reports how many bytes it consumed; zero means "need more"
//! - End-of-stream forces `Done`, so a short body is accepted as truncated
//! - Only `HTTP/1.1` is accepted; there is no version negotiation

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::headers::{find_crlf, HeaderError, Headers, CRLF};

/// Buffer size the reader starts with before doubling.
pub const DEFAULT_INITIAL_BUFFER_SIZE: usize = 8;

const SUPPORTED_VERSION: &str = "HTTP/1.1";

/// Errors that abort parsing of a request.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed Request Line Error")]
    MalformedRequestLine,

    #[error("Invalid field-line")]
    InvalidHeaderLine,

    #[error("Invalid content-length: {0}")]
    InvalidContentLength(String),

    /// A step was attempted after the request completed.
    #[error("Trying to read in a done state")]
    ReadAfterDone,

    #[error("Error reading request: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::MalformedRequestLine => "malformed_request_line",
            ParseError::InvalidHeaderLine => "invalid_header_line",
            ParseError::InvalidContentLength(_) => "invalid_content_length",
            ParseError::ReadAfterDone => "read_after_done",
            ParseError::Io(_) => "io",
        }
    }
}

impl From<HeaderError> for ParseError {
    fn from(err: HeaderError) -> Self {
        match err {
            HeaderError::InvalidHeaderLine => ParseError::InvalidHeaderLine,
        }
    }
}

/// Parse progress marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserState {
    #[default]
    Init,
    Headers,
    Body,
    Done,
}

/// The first line of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub target: String,
    /// Protocol version without the `HTTP/` prefix, always `1.1`.
    pub version: String,
}

/// A request being parsed, or a completed one once `state` is `Done`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub request_line: RequestLine,
    pub headers: Headers,
    pub body: Vec<u8>,
    state: ParserState,
    truncated: bool,
}

impl Request {
    /// Create an empty request in the `Init` state.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ParserState::Done
    }

    /// True if end-of-stream completed the request before the parser did.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Parse as much of `data` as possible, returning the bytes consumed.
    ///
    /// Stops when the request is done, when a step needs more data, or on
    /// the first error.
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let mut consumed = 0;
        while self.state != ParserState::Done {
            let n = self.parse_single(&data[consumed..])?;
            consumed += n;
            if n == 0 {
                break;
            }
        }
        Ok(consumed)
    }

    /// Run one step of the state machine against `data`.
    pub fn parse_single(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        match self.state {
            ParserState::Init => {
                let Some((line, n)) = parse_request_line(data)? else {
                    return Ok(0);
                };
                self.request_line = line;
                self.state = ParserState::Headers;
                Ok(n)
            }
            ParserState::Headers => {
                let (n, done) = self.headers.parse_one(data)?;
                if done {
                    self.state = ParserState::Body;
                }
                Ok(n)
            }
            ParserState::Body => {
                let Some(raw) = self.headers.get("content-length") else {
                    self.state = ParserState::Done;
                    return Ok(0);
                };
                let length: usize = raw
                    .parse()
                    .map_err(|_| ParseError::InvalidContentLength(raw.to_string()))?;

                let take = (length - self.body.len()).min(data.len());
                self.body.extend_from_slice(&data[..take]);
                if self.body.len() == length {
                    self.state = ParserState::Done;
                }
                Ok(take)
            }
            ParserState::Done => Err(ParseError::ReadAfterDone),
        }
    }

    /// Mark the request complete because the stream ended.
    fn finish_at_eof(&mut self) {
        if self.state != ParserState::Done {
            self.truncated = true;
            self.state = ParserState::Done;
        }
    }
}

/// Parse the request line at the front of `data`.
///
/// Returns `Ok(None)` until a full CRLF-terminated line is buffered.
pub fn parse_request_line(data: &[u8]) -> Result<Option<(RequestLine, usize)>, ParseError> {
    let Some(idx) = find_crlf(data) else {
        return Ok(None);
    };

    let parts: Vec<&[u8]> = data[..idx].trim_ascii().split(|&b| b == b' ').collect();
    let [method, target, version] = parts.as_slice() else {
        return Err(ParseError::MalformedRequestLine);
    };

    if method.is_empty() || !method.iter().all(u8::is_ascii_uppercase) {
        return Err(ParseError::MalformedRequestLine);
    }
    if target.is_empty() || *version != SUPPORTED_VERSION.as_bytes() {
        return Err(ParseError::MalformedRequestLine);
    }

    // The method is ASCII; the target is opaque and decoded lossily.
    let request_line = RequestLine {
        method: String::from_utf8_lossy(method).into_owned(),
        target: String::from_utf8_lossy(target).into_owned(),
        version: "1.1".to_string(),
    };
    Ok(Some((request_line, idx + CRLF.len())))
}

/// Reads one request from a byte stream.
#[derive(Debug, Clone, Copy)]
pub struct RequestReader {
    initial_buffer_size: usize,
}

impl RequestReader {
    pub fn new(initial_buffer_size: usize) -> Self {
        Self {
            initial_buffer_size: initial_buffer_size.max(1),
        }
    }

    /// Read and parse until the request is done or the stream ends.
    ///
    /// The buffer doubles when full and unconsumed bytes are shifted to the
    /// front after every parse, so it only grows to fit the largest
    /// unparsed residue.
    pub async fn read_request<R>(&self, reader: &mut R) -> Result<Request, ParseError>
    where
        R: AsyncRead + Unpin,
    {
        let mut request = Request::new();
        let mut buf = vec![0u8; self.initial_buffer_size];
        let mut read_to = 0;

        while !request.is_done() {
            if read_to >= buf.len() {
                let grown = buf.len() * 2;
                buf.resize(grown, 0);
            }

            let n = reader.read(&mut buf[read_to..]).await?;
            if n == 0 {
                if !request.is_done() {
                    tracing::debug!(state = ?request.state(), buffered = read_to, "Stream ended before request completed");
                }
                request.finish_at_eof();
                break;
            }
            read_to += n;

            let consumed = request.parse(&buf[..read_to])?;
            buf.copy_within(consumed..read_to, 0);
            read_to -= consumed;
        }

        Ok(request)
    }
}

impl Default for RequestReader {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_BUFFER_SIZE)
    }
}

/// Read one request using the default buffer size.
pub async fn request_from_reader<R>(reader: &mut R) -> Result<Request, ParseError>
where
    R: AsyncRead + Unpin,
{
    RequestReader::default().read_request(reader).await
}

//! Handler contract between the connection server and application code.

use std::future::Future;

use http::StatusCode;
use thiserror::Error;

use crate::http::headers::CRLF;
use crate::http::request::Request;
use crate::http::response::{default_headers, status_line, ResponseWriter, WriterError};

/// Outcome of a handler: the filled-in writer, or an error response.
pub type HandlerResult = Result<ResponseWriter, HandlerError>;

/// An error a handler returns instead of a success response.
///
/// Serialized as a bare status line, the default headers and the message
/// as a `text/plain` body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct HandlerError {
    code: StatusCode,
    message: String,
}

impl HandlerError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> StatusCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = status_line(self.code).into_bytes();
        default_headers(self.message.len()).write_to(&mut out);
        out.extend_from_slice(CRLF);
        out.extend_from_slice(self.message.as_bytes());
        out
    }
}

impl From<WriterError> for HandlerError {
    fn from(err: WriterError) -> Self {
        HandlerError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

/// Application code invoked once per parsed request.
///
/// Implemented for any `Fn(ResponseWriter, Request) -> impl Future<Output = HandlerResult>`.
pub trait Handler: Send + Sync + 'static {
    type Future: Future<Output = HandlerResult> + Send + 'static;

    fn call(&self, writer: ResponseWriter, request: Request) -> Self::Future;
}

impl<F, Fut> Handler for F
where
    F: Fn(ResponseWriter, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    type Future = Fut;

    fn call(&self, writer: ResponseWriter, request: Request) -> Fut {
        self(writer, request)
    }
}

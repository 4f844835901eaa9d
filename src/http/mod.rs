//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (acceptor, one worker task per connection)
//!     → request.rs (incremental parse: request line, headers, body)
//!     → handler.rs (application code fills in a ResponseWriter)
//!     → response.rs (status line, headers, body, chunks, trailers)
//!     → bytes written back, connection closed
//! ```

pub mod handler;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use handler::{Handler, HandlerError, HandlerResult};
pub use headers::{HeaderError, Headers};
pub use request::{request_from_reader, ParseError, ParserState, Request, RequestLine, RequestReader};
pub use response::{default_headers, ResponseWriter, WriterError, WriterState};
pub use server::{HttpServer, ServerError};

//! HTTP/1.1 over raw TCP.
//!
//! An incremental request parser, an order-enforcing response writer and a
//! task-per-connection server, built directly on Tokio byte streams.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::ServerConfig;
pub use crate::http::{Handler, HandlerError, HandlerResult, Headers, HttpServer, Request, ResponseWriter};
pub use lifecycle::Shutdown;

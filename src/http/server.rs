//! Connection server.
//!
//! # Responsibilities
//! - Bind the listening socket and run the acceptor task
//! - Spawn one independent worker task per accepted connection
//! - Drive request parsing, invoke the handler, write the response, close
//! - Stop accepting when closed; optionally drain in-flight workers
//!
//! # Design Decisions
//! - One request per connection (no keep-alive, no pipelining)
//! - Parse failures become a single best-effort 400 response
//! - The only state shared across tasks is the atomic closed flag
//! - Closing never cancels in-flight workers

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::http::handler::{Handler, HandlerError};
use crate::http::request::RequestReader;
use crate::http::response::ResponseWriter;
use crate::lifecycle::Shutdown;
use crate::net::{Accept, ConnectionGuard, ConnectionTracker, Listener, ListenerError};
use crate::observability::metrics;

/// Errors starting a server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("Failed to read local address: {0}")]
    LocalAddr(std::io::Error),
}

/// Handle to a running server.
///
/// Dropping the handle does not stop the acceptor; call [`close`] or
/// [`shutdown`].
///
/// [`close`]: HttpServer::close
/// [`shutdown`]: HttpServer::shutdown
#[derive(Debug)]
pub struct HttpServer {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    tracker: ConnectionTracker,
    acceptor: JoinHandle<()>,
}

impl HttpServer {
    /// Bind the configured address and start accepting connections.
    pub async fn serve<H: Handler>(config: &ServerConfig, handler: H) -> Result<Self, ServerError> {
        let listener = Listener::bind(&config.listener).await?;
        Self::serve_on(listener, config, handler)
    }

    /// Start accepting on an already bound listener.
    pub fn serve_on<L: Accept, H: Handler>(
        listener: L,
        config: &ServerConfig,
        handler: H,
    ) -> Result<Self, ServerError> {
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;
        let shutdown = Shutdown::new();
        let tracker = ConnectionTracker::new();

        let acceptor = Acceptor {
            listener,
            handler: Arc::new(handler),
            reader: RequestReader::new(config.parser.initial_buffer_size),
            shutdown: shutdown.clone(),
            closing: shutdown.subscribe(),
            tracker: tracker.clone(),
            retry_delay: Duration::from_millis(config.listener.accept_retry_delay_ms),
        };
        let acceptor = tokio::spawn(acceptor.run());

        tracing::info!(address = %local_addr, "HTTP server started");
        Ok(Self {
            local_addr,
            shutdown,
            tracker,
            acceptor,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and release the listening socket.
    ///
    /// In-flight connections keep running.
    pub fn close(&self) {
        if self.shutdown.trigger() {
            tracing::info!(address = %self.local_addr, "HTTP server closing");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_closed()
    }

    /// Number of connections whose worker is still running.
    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }

    /// Close, wait for the acceptor to exit, then wait up to `drain_timeout`
    /// for in-flight connections.
    ///
    /// Returns `true` if every connection finished in time.
    pub async fn shutdown(self, drain_timeout: Duration) -> bool {
        self.close();
        if let Err(e) = self.acceptor.await {
            tracing::error!(error = %e, "Acceptor task failed");
        }

        let drained = self.tracker.wait_for_idle(drain_timeout).await;
        if drained {
            tracing::info!("All connections drained");
        } else {
            tracing::warn!(
                remaining = self.tracker.active_count(),
                "Drain timeout elapsed with connections still active"
            );
        }
        drained
    }
}

struct Acceptor<H, L> {
    listener: L,
    handler: Arc<H>,
    reader: RequestReader,
    shutdown: Shutdown,
    closing: watch::Receiver<bool>,
    tracker: ConnectionTracker,
    retry_delay: Duration,
}

impl<H: Handler, L: Accept> Acceptor<H, L> {
    async fn run(mut self) {
        loop {
            if self.shutdown.is_closed() {
                break;
            }

            let accepted = tokio::select! {
                _ = self.closing.changed() => None,
                res = self.listener.accept() => Some(res),
            };

            match accepted {
                Some(Ok((stream, peer))) => {
                    let guard = self.tracker.track();
                    metrics::record_connection_opened();
                    tokio::spawn(serve_connection(
                        stream,
                        peer,
                        Arc::clone(&self.handler),
                        self.reader,
                        guard,
                    ));
                }
                Some(Err(e)) => {
                    if self.shutdown.is_closed() {
                        break;
                    }
                    metrics::record_accept_error();
                    tracing::warn!(error = %e, "Accept failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
                None => continue,
            }
        }

        // Dropping the listener closes the socket.
        drop(self.listener);
        tracing::info!("Acceptor stopped");
    }
}

#[tracing::instrument(name = "connection", skip_all, fields(connection_id = %guard.id(), peer = %peer))]
async fn serve_connection<H: Handler>(
    mut stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<H>,
    reader: RequestReader,
    guard: ConnectionGuard,
) {
    let (status, response) = match reader.read_request(&mut stream).await {
        Ok(request) => {
            tracing::debug!(
                method = %request.request_line.method,
                target = %request.request_line.target,
                body_len = request.body.len(),
                truncated = request.is_truncated(),
                "Request parsed"
            );
            match handler.call(ResponseWriter::new(), request).await {
                Ok(writer) => (writer.status(), writer.serialize()),
                Err(err) => {
                    tracing::warn!(status = %err.code(), error = %err.message(), "Handler returned error");
                    (err.code(), err.to_bytes())
                }
            }
        }
        Err(err) => {
            metrics::record_parse_error(err.kind());
            tracing::warn!(error = %err, kind = err.kind(), "Rejecting malformed request");
            let err = HandlerError::new(StatusCode::BAD_REQUEST, err.to_string());
            (err.code(), err.to_bytes())
        }
    };

    metrics::record_response(status.as_u16());
    if let Err(e) = stream.write_all(&response).await {
        tracing::warn!(error = %e, "Failed to write response");
    } else if let Err(e) = stream.shutdown().await {
        tracing::debug!(error = %e, "Failed to shut down connection");
    }

    tracing::debug!(status = status.as_u16(), bytes = response.len(), "Connection finished");
    metrics::record_connection_closed();
    drop(guard);
}

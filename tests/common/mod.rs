//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use httpfromtcp::{Handler, HttpServer, ServerConfig};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;

/// An in-memory reader that hands out at most `per_read` bytes per call.
#[allow(dead_code)]
pub struct ChunkReader {
    data: Vec<u8>,
    per_read: usize,
    pos: usize,
}

#[allow(dead_code)]
impl ChunkReader {
    pub fn new(data: impl Into<Vec<u8>>, per_read: usize) -> Self {
        Self {
            data: data.into(),
            per_read: per_read.max(1),
            pos: 0,
        }
    }
}

impl AsyncRead for ChunkReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let end = (this.pos + this.per_read)
            .min(this.data.len())
            .min(this.pos + buf.remaining());
        buf.put_slice(&this.data[this.pos..end]);
        this.pos = end;
        Poll::Ready(Ok(()))
    }
}

/// Start a server on an ephemeral localhost port.
#[allow(dead_code)]
pub async fn start_server<H: Handler>(handler: H) -> HttpServer {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    HttpServer::serve(&config, handler).await.unwrap()
}

/// Write raw bytes, then read until the server closes the connection.
#[allow(dead_code)]
pub async fn send_raw(addr: SocketAddr, raw: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw).await.unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    out
}

/// Split a raw response into its head and body.
#[allow(dead_code)]
pub fn split_response(raw: &[u8]) -> (String, Vec<u8>) {
    let end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has no header terminator");
    (
        String::from_utf8(raw[..end + 2].to_vec()).unwrap(),
        raw[end + 4..].to_vec(),
    )
}

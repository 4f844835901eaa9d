//! HTTP/1.1 demo server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──bytes──▶ net::listener ──▶ http::server (task per connection)
//!                                              │
//!                                              ▼
//!                                      http::request (incremental parse)
//!                                              │
//!                                              ▼
//!                                      routes (demo handler)
//!                                              │
//!                                              ▼
//!     Client ◀──bytes── http::response (status, headers, body, trailers)
//! ```

mod routes;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use httpfromtcp::config::{load_config, ServerConfig};
use httpfromtcp::lifecycle::signals::shutdown_signal;
use httpfromtcp::observability::{logging, metrics};
use httpfromtcp::HttpServer;

use crate::routes::Routes;

#[derive(Parser)]
#[command(name = "httpfromtcp")]
#[command(about = "HTTP/1.1 server built directly on TCP", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener port.
    #[arg(short, long)]
    port: Option<u16>,

    /// File served on /video.
    #[arg(long, default_value = "assets/vim.mp4")]
    video: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = cli.port {
        config.listener.bind_address = format!("0.0.0.0:{port}");
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("httpfromtcp v0.1.0 starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        initial_buffer_size = config.parser.initial_buffer_size,
        drain_timeout_secs = config.shutdown.drain_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let routes = Routes::new(cli.video);
    let server = HttpServer::serve(&config, move |w, req| {
        let routes = routes.clone();
        routes.dispatch(w, req)
    })
    .await?;
    tracing::info!(address = %server.local_addr(), "Server started");

    shutdown_signal().await;

    let drained = server
        .shutdown(Duration::from_secs(config.shutdown.drain_timeout_secs))
        .await;
    tracing::info!(drained, "Server gracefully stopped");
    Ok(())
}

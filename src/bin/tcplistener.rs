//! Accepts connections one at a time and prints each parsed request.

use clap::Parser;
use tokio::net::TcpListener;

use httpfromtcp::config::ObservabilityConfig;
use httpfromtcp::http::{request_from_reader, Request};
use httpfromtcp::observability::logging;

#[derive(Parser)]
#[command(name = "tcplistener")]
#[command(about = "Print HTTP requests parsed from raw TCP connections", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "0.0.0.0:42069")]
    bind: String,

    /// Print each request as a JSON object.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging(&ObservabilityConfig::default())?;

    let cli = Cli::parse();
    let listener = TcpListener::bind(&cli.bind).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    loop {
        let (mut stream, peer) = listener.accept().await?;
        tracing::info!(%peer, "Connection accepted");

        match request_from_reader(&mut stream).await {
            Ok(request) if cli.json => println!("{}", to_json(&request)),
            Ok(request) => print_request(&request),
            Err(e) => tracing::error!(%peer, error = %e, "Failed to parse request"),
        }
        tracing::info!(%peer, "Connection closed");
    }
}

fn print_request(request: &Request) {
    let line = &request.request_line;
    println!("Request Line:");
    println!("- Method: {}", line.method);
    println!("- Target: {}", line.target);
    println!("- Version: {}", line.version);
    println!("Headers:");
    for (name, value) in request.headers.iter() {
        println!("- {}: {}", name, value);
    }
    println!("Body:");
    println!("{}", String::from_utf8_lossy(&request.body));
}

fn to_json(request: &Request) -> serde_json::Value {
    let headers: serde_json::Map<String, serde_json::Value> = request
        .headers
        .iter()
        .map(|(name, value)| (name.to_string(), value.into()))
        .collect();
    serde_json::json!({
        "method": request.request_line.method,
        "target": request.request_line.target,
        "version": request.request_line.version,
        "headers": headers,
        "body": String::from_utf8_lossy(&request.body),
        "truncated": request.is_truncated(),
    })
}

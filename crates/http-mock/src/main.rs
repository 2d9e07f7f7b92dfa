//! http-mock server binary
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default 127.0.0.1:28080
//! http-mock
//!
//! # Explicit address
//! http-mock --host 0.0.0.0 --port 9000
//!
//! # Load host/port from a YAML file; flags still win
//! http-mock --config mock.yaml --port 9001
//! ```

use anyhow::Context;
use clap::Parser;
use http_mock::{MockServer, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "http-mock")]
#[command(author, version, about = "Stand-in HTTP server with programmable expectations")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "HTTP_MOCK_HOST")]
    host: Option<String>,

    /// Port to listen on (0 picks a free port)
    #[arg(short, long, env = "HTTP_MOCK_PORT")]
    port: Option<u16>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {path}"))?,
        None => ServerConfig::default(),
    };
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    config.validate()?;

    let server = MockServer::bind(&config.host, config.port)
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    info!("http-mock listening on http://{}", server.local_addr());

    server
        .serve_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    Ok(())
}

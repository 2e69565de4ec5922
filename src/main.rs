//! Transparent HTTP forwarding proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────────┐
//!                         │                 TRANSPARENT PROXY                  │
//!   GET /?url=<target>    │  ┌─────────┐   ┌──────────┐   ┌────────────────┐  │
//!   ──────────────────────┼─▶│   net   │──▶│  http    │──▶│    request     │  │
//!                         │  │listener │   │  server  │   │  translator    │  │
//!                         │  └─────────┘   └──────────┘   └───────┬────────┘  │
//!                         │                                       │ headers   │
//!                         │                                       ▼ filtered  │
//!   status+headers+body   │  ┌──────────┐                 ┌────────────────┐  │
//!   ◀─────────────────────┼──│ response │◀────────────────│   transport    │◀─┼── Origin
//!                         │  │ streamer │                 │ (one per req)  │  │
//!                         │  └──────────┘                 └────────────────┘  │
//!                         │                                                    │
//!                         │  config · observability · lifecycle               │
//!                         └───────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use transparent_proxy::config::load_config;
use transparent_proxy::lifecycle::{signals, Shutdown};
use transparent_proxy::net::Listener;
use transparent_proxy::observability::{init_logging, init_metrics};
use transparent_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "transparent-proxy")]
#[command(about = "Relay ?url= targets over a fresh connection per request", long_about = None)]
struct Cli {
    /// Optional TOML configuration file. FC_SERVER_PORT overrides its port.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    init_logging(&config.observability)?;

    tracing::info!("transparent-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        port = config.listener.port,
        max_connections = config.listener.max_connections,
        request_timeout_secs = config.transport.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        init_metrics(addr)?;
    }

    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        result = &mut server_task => {
            result??;
            return Ok(());
        }
        result = signals::wait_for_termination() => result?,
    }

    shutdown.trigger();
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}

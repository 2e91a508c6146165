//! rpc-gateway
//!
//! Translates REST-style HTTP requests into unary gRPC calls.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────────┐
//!                         │                     RPC GATEWAY                      │
//!                         │                                                      │
//!     HTTP Request        │  ┌─────────┐    ┌────────────┐    ┌──────────┐       │
//!     ────────────────────┼─▶│  http   │───▶│ dispatcher │───▶│ routing  │       │
//!                         │  │ server  │    │            │◀───│ matcher  │       │
//!                         │  └─────────┘    └─────┬──────┘    └──────────┘       │
//!                         │                       │ bind (path + JSON body)      │
//!                         │                       ▼                              │
//!                         │                 ┌────────────┐    ┌──────────────┐   │
//!                         │                 │  invoker   │───▶│  connection  │───┼──▶ gRPC
//!                         │                 │local/remote│    │  (tonic)     │   │   Backend
//!                         │                 └─────┬──────┘    └──────────────┘   │
//!                         │                       │ outcome + metadata           │
//!     HTTP Response       │  ┌─────────┐          ▼                              │
//!     ◀───────────────────┼──│ render  │◀─────────┘                              │
//!                         │  └─────────┘                                         │
//!                         │                                                      │
//!                         │  config · lifecycle · observability · resilience     │
//!                         └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use rpc_gateway::config::{self, BackendMode, GatewayConfig};
use rpc_gateway::lifecycle;
use rpc_gateway::observability::logging;

#[derive(Parser)]
#[command(name = "rpc-gateway")]
#[command(about = "HTTP to gRPC translation gateway", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP listen address (overrides listener.bind_address)
    #[arg(short, long)]
    listen: Option<String>,

    /// gRPC backend endpoint (overrides backend.endpoint)
    #[arg(short, long)]
    backend: Option<String>,

    /// Serve the config service in process instead of dialling a backend
    #[arg(long)]
    local: bool,
}

impl Cli {
    fn apply(self, mut config: GatewayConfig) -> GatewayConfig {
        if let Some(listen) = self.listen {
            config.listener.bind_address = listen;
        }
        if let Some(backend) = self.backend {
            config.backend.endpoint = backend;
        }
        if self.local {
            config.backend.mode = BackendMode::Local;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => GatewayConfig::default(),
    };
    let config = cli.apply(config);
    config::validate_config(&config).map_err(config::ConfigError::Validation)?;

    logging::init(&config.observability)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rpc-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend_mode = ?config.backend.mode,
        backend_endpoint = %config.backend.endpoint,
        call_timeout_secs = config.timeouts.call_secs,
        "Configuration loaded"
    );

    lifecycle::run(config).await?;
    Ok(())
}

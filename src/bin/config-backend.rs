//! Standalone `api.v1.ConfigService` backend over gRPC.
//!
//! Serves the in-memory configuration service the gateway dials in remote mode.

use std::net::SocketAddr;

use clap::Parser;
use tonic::transport::Server;

use rpc_gateway::api::{ConfigServiceServer, InMemoryConfigService};
use rpc_gateway::config::ObservabilityConfig;
use rpc_gateway::lifecycle::signals::wait_for_signal;
use rpc_gateway::observability::logging;

#[derive(Parser)]
#[command(name = "config-backend")]
#[command(about = "In-memory gRPC config service", long_about = None)]
struct Cli {
    /// gRPC listen address
    #[arg(short, long, default_value = "0.0.0.0:50051")]
    listen: SocketAddr,

    /// Initial IP blacklist entries
    #[arg(long = "block", value_name = "IP")]
    blocked: Vec<String>,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    logging::init(&ObservabilityConfig {
        log_level: cli.log_level.clone(),
        ..ObservabilityConfig::default()
    })?;

    let service = InMemoryConfigService::with_blacklist(cli.blocked);
    tracing::info!(address = %cli.listen, "config-backend listening");

    Server::builder()
        .add_service(ConfigServiceServer::new(service))
        .serve_with_shutdown(cli.listen, wait_for_signal())
        .await?;

    tracing::info!("config-backend stopped");
    Ok(())
}

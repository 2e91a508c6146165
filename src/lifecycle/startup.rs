//! Startup orchestration.
//!
//! # Responsibilities
//! - Establish the backend connection (remote mode) before serving
//! - Register operations and freeze the dispatcher
//! - Start background tasks (metrics, signal handling)
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listener starts last (traffic only when ready)

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::api::{register_local, register_remote, InMemoryConfigService};
use crate::config::{BackendMode, GatewayConfig};
use crate::gateway::{DispatchOptions, Dispatcher};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_handler;
use crate::observability::metrics;
use crate::routing::RegistrationError;
use crate::rpc::{ConnectError, ConnectionHandle};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("operation registration failed: {0}")]
    Registration(#[from] RegistrationError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

/// Register every operation against the configured backend.
///
/// In remote mode this dials the backend; the connection closes when
/// `shutdown` fires.
pub async fn build_dispatcher(config: &GatewayConfig, shutdown: &Shutdown) -> Result<Dispatcher, StartupError> {
    let mut builder = Dispatcher::builder(DispatchOptions::from(config));

    match config.backend.mode {
        BackendMode::Local => {
            tracing::info!("Serving config service in process");
            register_local(&mut builder, Arc::new(InMemoryConfigService::new()))?;
        }
        BackendMode::Remote => {
            let connection = ConnectionHandle::connect(&config.backend, shutdown.token().clone()).await?;
            register_remote(&mut builder, connection)?;
        }
    }

    let dispatcher = builder.build()?;
    for descriptor in dispatcher.operations() {
        tracing::info!(
            method = %descriptor.method,
            template = descriptor.template(),
            rpc_method = descriptor.rpc_method,
            "Operation registered"
        );
    }
    Ok(dispatcher)
}

/// Run the gateway until SIGINT/SIGTERM.
pub async fn run(config: GatewayConfig) -> Result<(), StartupError> {
    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let dispatcher = Arc::new(build_dispatcher(&config, &shutdown).await?);

    let address = config.listener.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    let server = HttpServer::new(config, dispatcher);
    let result = server.run(listener, shutdown.clone()).await;

    // Release the backend connection even when serving failed.
    shutdown.trigger();
    result.map_err(StartupError::Serve)?;

    tracing::info!("Shutdown complete");
    Ok(())
}

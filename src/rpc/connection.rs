//! Shared backend connection.
//!
//! # Responsibilities
//! - Dial the backend once at startup with bounded, backed-off attempts
//! - Hand out cheap clones of the multiplexed channel to every call
//! - Close exactly once when the process shuts down
//!
//! # Design Decisions
//! - Dial failure after the last attempt is fatal to startup
//! - One HTTP/2 channel shared by all concurrent calls
//! - Closing is observed through a child cancellation token of the shutdown token
//! - A closed handle fails new calls and aborts in-flight ones with `UNAVAILABLE`;
//!   the channel itself is released when the last invoker holding it drops

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tonic::transport::{Channel, Endpoint};

use crate::config::schema::BackendConfig;
use crate::config::validation::normalize_endpoint;
use crate::resilience::backoff::calculate_backoff;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("invalid backend endpoint '{endpoint}': {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("failed to dial backend '{endpoint}' after {attempts} attempt(s): {source}")]
    Dial {
        endpoint: String,
        attempts: u32,
        #[source]
        source: tonic::transport::Error,
    },
}

/// Cloneable handle to the one backend channel.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    endpoint: Arc<str>,
    channel: Channel,
    closed: CancellationToken,
}

/// Build a tonic `Endpoint` with timeouts and keepalive settings.
fn build_endpoint(uri: String, config: &BackendConfig) -> Result<Endpoint, tonic::transport::Error> {
    let keepalive = Duration::from_secs(config.keepalive_secs);
    let endpoint = Endpoint::from_shared(uri)?
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .tcp_keepalive(Some(keepalive))
        .http2_keep_alive_interval(keepalive)
        .keep_alive_timeout(Duration::from_secs(10))
        .keep_alive_while_idle(true);

    Ok(endpoint)
}

impl ConnectionHandle {
    /// Dial the configured backend. The handle closes when `shutdown` is cancelled.
    pub async fn connect(config: &BackendConfig, shutdown: CancellationToken) -> Result<Self, ConnectError> {
        let uri = normalize_endpoint(&config.endpoint);
        let endpoint = build_endpoint(uri.clone(), config).map_err(|source| ConnectError::InvalidEndpoint {
            endpoint: uri.clone(),
            source,
        })?;

        let attempts = config.dial_attempts.max(1);
        let mut attempt: u32 = 0;
        let channel = loop {
            attempt += 1;
            match endpoint.connect().await {
                Ok(channel) => break channel,
                Err(source) if attempt < attempts => {
                    let delay = calculate_backoff(attempt, config.dial_base_delay_ms, config.dial_max_delay_ms);
                    tracing::warn!(
                        endpoint = %uri,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %source,
                        "Backend dial failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(source) => {
                    return Err(ConnectError::Dial {
                        endpoint: uri,
                        attempts: attempt,
                        source,
                    })
                }
            }
        };

        tracing::info!(endpoint = %uri, attempt, "Backend connection established");
        Ok(Self::from_channel(uri, channel, shutdown))
    }

    /// Wrap an already established channel.
    pub fn from_channel(endpoint: impl Into<Arc<str>>, channel: Channel, shutdown: CancellationToken) -> Self {
        let endpoint = endpoint.into();
        let closed = shutdown.child_token();

        let watcher = closed.clone();
        let name = Arc::clone(&endpoint);
        tokio::spawn(async move {
            watcher.cancelled().await;
            tracing::info!(endpoint = %name, "Backend connection closed");
        });

        Self {
            endpoint,
            channel,
            closed,
        }
    }

    /// Channel clone for one call. Clones share the underlying connection.
    pub fn channel(&self) -> Channel {
        self.channel.clone()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once the handle has been closed.
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }
}

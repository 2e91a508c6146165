//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (request counts, latency)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): bridged requests by RPC method and gRPC code
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency by RPC method and gRPC code
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Unmatched requests are labelled `rpc_method="unmatched"`

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;
use tonic::Code;

use crate::rpc::code_name;

/// Label used for requests that never reached an operation.
pub const UNMATCHED: &str = "unmatched";

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(error) => tracing::error!(address = %addr, error = %error, "Failed to install metrics exporter"),
    }
}

/// Record one finished request.
pub fn record_request(rpc_method: &'static str, code: Code, started: Instant) {
    let code = code_name(code);
    metrics::counter!("gateway_requests_total", "rpc_method" => rpc_method, "code" => code).increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "rpc_method" => rpc_method, "code" => code)
        .record(started.elapsed().as_secs_f64());
}

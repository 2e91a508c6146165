//! Request dispatch: the received → matched → bound → invoked → rendered pipeline.
//!
//! # Responsibilities
//! - Own the immutable operation table
//! - Drive one HTTP request through matching, binding, invocation and rendering
//! - Tie the call's lifetime to the request with a cancellation token
//!
//! # Design Decisions
//! - Every path ends in a rendered response, never a bare error
//! - The per-request token is cancelled when dispatch returns or its future is
//!   dropped (client disconnect)
//! - Request bodies are only read for operations that bind one
//! - A body over `max_body_bytes`, declared or streamed, is answered with 413

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::response::Response;
use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::Request;
use http_body_util::LengthLimitError;
use tokio_util::sync::CancellationToken;

use crate::config::GatewayConfig;
use crate::gateway::headers::{incoming_metadata, X_REQUEST_ID};
use crate::gateway::operation::{InboundCall, Operation};
use crate::gateway::render::{render, render_error, render_payload_too_large, render_route_error, RenderContext};
use crate::observability::metrics::{self, UNMATCHED};
use crate::resilience::timeouts::call_deadline;
use crate::routing::{OperationDescriptor, RegistrationError, RouteError, RouteTable, RouteTableBuilder};
use crate::rpc::{CallError, CallMetadata};

/// Per-dispatcher limits.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Largest request body read for a binding operation.
    pub max_body_bytes: usize,
    /// Deadline applied when the request carries no `grpc-timeout`.
    pub default_timeout: Option<Duration>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            max_body_bytes: 4 * 1024 * 1024,
            default_timeout: None,
        }
    }
}

impl From<&GatewayConfig> for DispatchOptions {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            max_body_bytes: config.limits.max_body_size,
            default_timeout: (config.timeouts.call_secs > 0).then(|| Duration::from_secs(config.timeouts.call_secs)),
        }
    }
}

/// Collects operations; [`DispatcherBuilder::build`] freezes them.
pub struct DispatcherBuilder {
    routes: RouteTableBuilder<Arc<dyn Operation>>,
    options: DispatchOptions,
}

impl DispatcherBuilder {
    pub fn new(options: DispatchOptions) -> Self {
        Self {
            routes: RouteTableBuilder::new(),
            options,
        }
    }

    pub fn register<O: Operation + 'static>(&mut self, operation: O) -> Result<&mut Self, RegistrationError> {
        let descriptor = operation.descriptor().clone();
        tracing::debug!(
            method = %descriptor.method,
            template = descriptor.template(),
            rpc_method = descriptor.rpc_method,
            "Registering operation"
        );
        self.routes.register(descriptor, Arc::new(operation))?;
        Ok(self)
    }

    pub fn build(self) -> Result<Dispatcher, RegistrationError> {
        Ok(Dispatcher {
            routes: self.routes.build()?,
            options: self.options,
        })
    }
}

/// Routes HTTP requests to registered operations.
pub struct Dispatcher {
    routes: RouteTable<Arc<dyn Operation>>,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn builder(options: DispatchOptions) -> DispatcherBuilder {
        DispatcherBuilder::new(options)
    }

    pub fn operations(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.routes.descriptors()
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Handle one request. Always produces a response.
    pub async fn dispatch(&self, request: Request<Body>, peer: Option<SocketAddr>) -> Response {
        let started = Instant::now();
        let cancel = CancellationToken::new();
        let _release = cancel.clone().drop_guard();

        let (parts, body) = request.into_parts();
        let ctx = RenderContext::from_headers(&parts.headers);
        let request_id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        tracing::debug!(
            request_id = %request_id,
            method = %parts.method,
            path = parts.uri.path(),
            "Request received"
        );

        let matched = match self.routes.lookup(&parts.method, parts.uri.path()) {
            Ok(matched) => matched,
            Err(error) => {
                tracing::debug!(request_id = %request_id, path = parts.uri.path(), error = %error, "No operation matched");
                let response = render_route_error(&error, &ctx);
                let code = match error {
                    RouteError::NotFound => tonic::Code::NotFound,
                    RouteError::MethodNotAllowed { .. } => tonic::Code::Unimplemented,
                };
                metrics::record_request(UNMATCHED, code, started);
                return response;
            }
        };
        let descriptor = matched.descriptor;
        let operation = Arc::clone(matched.target);
        tracing::debug!(
            request_id = %request_id,
            rpc_method = descriptor.rpc_method,
            params = matched.params.len(),
            "Operation matched"
        );

        let body = if descriptor.has_body() {
            let limit = self.options.max_body_bytes;
            let declared = parts
                .headers
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            if declared.is_some_and(|len| len > limit as u64) {
                tracing::debug!(request_id = %request_id, limit, "Declared request body over limit");
                metrics::record_request(descriptor.rpc_method, tonic::Code::ResourceExhausted, started);
                return render_payload_too_large(limit, &ctx);
            }

            match axum::body::to_bytes(body, limit).await {
                Ok(bytes) => bytes,
                Err(error) => {
                    let source = error.into_inner();
                    if source.is::<LengthLimitError>() {
                        tracing::debug!(request_id = %request_id, limit, "Request body over limit");
                        metrics::record_request(descriptor.rpc_method, tonic::Code::ResourceExhausted, started);
                        return render_payload_too_large(limit, &ctx);
                    }
                    tracing::debug!(request_id = %request_id, error = %source, "Failed to read request body");
                    let error = CallError::invalid_argument(format!("failed to read request body: {source}"));
                    metrics::record_request(descriptor.rpc_method, error.code, started);
                    return render_error(&error, &CallMetadata::default(), &ctx);
                }
            }
        } else {
            Bytes::new()
        };

        let call = InboundCall {
            params: matched.params,
            body,
            metadata: incoming_metadata(&parts.headers, peer),
            cancel: cancel.clone(),
            timeout: call_deadline(&parts.headers, self.options.default_timeout),
        };
        let outcome = operation.call(call).await;
        let code = outcome.code();
        tracing::debug!(
            request_id = %request_id,
            rpc_method = descriptor.rpc_method,
            code = ?code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Call finished"
        );

        let response = render(outcome, &ctx);
        metrics::record_request(descriptor.rpc_method, code, started);
        response
    }
}

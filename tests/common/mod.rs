//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tonic::{Code, Status};
use tower::ServiceExt;

use rpc_gateway::api::messages::{
    GetConfigRequest, GetConfigResponse, GetIpBlackListRequest, GetIpBlackListResponse, UpdateConfigRequest,
    UpdateConfigResponse, UpdateIpBlackListRequest, UpdateIpBlackListResponse,
};
use rpc_gateway::api::{register_local, ConfigService, ConfigServiceServer, InMemoryConfigService};
use rpc_gateway::config::{BackendMode, GatewayConfig};
use rpc_gateway::gateway::{DispatchOptions, Dispatcher};
use rpc_gateway::http::HttpServer;
use rpc_gateway::rpc::TrailerMetadata;

/// Scripted failure returned instead of calling through.
#[derive(Debug, Clone)]
pub struct Failure {
    pub code: Code,
    pub message: &'static str,
    pub metadata: Vec<(&'static str, &'static str)>,
}

impl Failure {
    fn to_status(&self) -> Status {
        let mut status = Status::new(self.code, self.message);
        for (key, value) in &self.metadata {
            if let Ok(value) = value.parse() {
                status.metadata_mut().insert(*key, value);
            }
        }
        status
    }
}

/// In-memory config service that counts calls and can be scripted to fail
/// or stall.
#[derive(Default)]
pub struct ScriptedService {
    inner: InMemoryConfigService,
    calls: AtomicUsize,
    failure: Mutex<Option<Failure>>,
    delay: Mutex<Option<Duration>>,
    trailer: Mutex<Option<(&'static str, &'static str)>>,
    seen_request_ids: Mutex<Vec<String>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_with(&self, failure: Failure) {
        *self.failure.lock().unwrap() = Some(failure);
    }

    pub fn stall_for(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Attach `key: value` as trailer metadata to every successful response.
    pub fn trail_with(&self, key: &'static str, value: &'static str) {
        *self.trailer.lock().unwrap() = Some((key, value));
    }

    pub fn seen_request_ids(&self) -> Vec<String> {
        self.seen_request_ids.lock().unwrap().clone()
    }

    async fn before<T>(&self, request: &tonic::Request<T>) -> Result<(), Status> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(id) = request.metadata().get("x-request-id").and_then(|v| v.to_str().ok()) {
            self.seen_request_ids.lock().unwrap().push(id.to_string());
        }

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failure.lock().unwrap().clone();
        match failure {
            Some(failure) => Err(failure.to_status()),
            None => Ok(()),
        }
    }

    fn after<T>(&self, result: Result<tonic::Response<T>, Status>) -> Result<tonic::Response<T>, Status> {
        let mut response = result?;
        let trailer = *self.trailer.lock().unwrap();
        if let Some((key, value)) = trailer {
            response
                .extensions_mut()
                .insert(TrailerMetadata([(key, value)].into_iter().collect()));
        }
        Ok(response)
    }
}

#[async_trait]
impl ConfigService for ScriptedService {
    async fn get_config(
        &self,
        request: tonic::Request<GetConfigRequest>,
    ) -> Result<tonic::Response<GetConfigResponse>, Status> {
        self.before(&request).await?;
        self.after(self.inner.get_config(request).await)
    }

    async fn update_config(
        &self,
        request: tonic::Request<UpdateConfigRequest>,
    ) -> Result<tonic::Response<UpdateConfigResponse>, Status> {
        self.before(&request).await?;
        self.after(self.inner.update_config(request).await)
    }

    async fn get_ip_black_list(
        &self,
        request: tonic::Request<GetIpBlackListRequest>,
    ) -> Result<tonic::Response<GetIpBlackListResponse>, Status> {
        self.before(&request).await?;
        self.after(self.inner.get_ip_black_list(request).await)
    }

    async fn update_ip_black_list(
        &self,
        request: tonic::Request<UpdateIpBlackListRequest>,
    ) -> Result<tonic::Response<UpdateIpBlackListResponse>, Status> {
        self.before(&request).await?;
        self.after(self.inner.update_ip_black_list(request).await)
    }
}

/// Gateway config for in-process tests.
pub fn local_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.backend.mode = BackendMode::Local;
    config
}

/// Dispatcher bridging to `service` in process.
pub fn local_dispatcher<S: ConfigService>(config: &GatewayConfig, service: Arc<S>) -> Arc<Dispatcher> {
    let mut builder = Dispatcher::builder(DispatchOptions::from(config));
    register_local(&mut builder, service).unwrap();
    Arc::new(builder.build().unwrap())
}

/// Fully layered router bridging to `service` in process.
pub fn local_router<S: ConfigService>(service: Arc<S>) -> Router {
    let config = local_config();
    let dispatcher = local_dispatcher(&config, service);
    HttpServer::new(config, dispatcher).into_router()
}

/// Drive one request through `router` without a socket.
pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Serve `service` over gRPC on an ephemeral port until `shutdown` fires.
pub async fn start_backend<S: ConfigService>(service: Arc<S>, shutdown: CancellationToken) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let incoming = TcpListenerStream::new(listener);

    tokio::spawn(async move {
        let _ = Server::builder()
            .add_service(ConfigServiceServer::from_arc(service))
            .serve_with_incoming_shutdown(incoming, async move {
                shutdown.cancelled().await;
            })
            .await;
    });

    addr
}

/// Gateway config pointing at a backend on `addr`.
pub fn remote_config(addr: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.backend.mode = BackendMode::Remote;
    config.backend.endpoint = format!("http://{addr}");
    config.backend.dial_attempts = 5;
    config.backend.dial_base_delay_ms = 20;
    config
}

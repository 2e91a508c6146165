//! Gateway against a real gRPC backend on an ephemeral port.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tonic::Code;

use rpc_gateway::api::messages::{GetConfigRequest, GetConfigResponse};
use rpc_gateway::api::service::GET_CONFIG;
use rpc_gateway::http::HttpServer;
use rpc_gateway::lifecycle::{build_dispatcher, Shutdown};
use rpc_gateway::rpc::{Call, CallOutcome, ConnectionHandle, Invoker, RemoteInvoker};

mod common;

use common::{body_json, get, post_json, remote_config, send, start_backend, Failure, ScriptedService};

async fn remote_router(service: Arc<ScriptedService>, backend_stop: CancellationToken) -> (axum::Router, Shutdown) {
    let addr = start_backend(service, backend_stop).await;
    let config = remote_config(addr);
    let shutdown = Shutdown::new();
    let dispatcher = build_dispatcher(&config, &shutdown).await.unwrap();
    let router = HttpServer::new(config, Arc::new(dispatcher)).into_router();
    (router, shutdown)
}

#[tokio::test]
async fn test_remote_round_trip() {
    let backend_stop = CancellationToken::new();
    let service = Arc::new(ScriptedService::new());
    let (router, shutdown) = remote_router(service.clone(), backend_stop.clone()).await;

    let response = send(
        &router,
        post_json("/config:update", json!({"enableRateLimitor": true, "numTokenPerSec": 20})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["grpc-metadata-x-config-revision"], "1");

    let request = Request::builder()
        .method("GET")
        .uri("/config")
        .header("x-request-id", "remote-1")
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["enableRateLimitor"], true);
    assert_eq!(body["numTokenPerSec"], 20);

    assert_eq!(service.calls(), 2);
    assert!(service.seen_request_ids().contains(&"remote-1".to_string()));

    shutdown.trigger();
    backend_stop.cancel();
}

#[tokio::test]
async fn test_remote_error_maps_status() {
    let backend_stop = CancellationToken::new();
    let service = Arc::new(ScriptedService::new());
    service.fail_with(Failure {
        code: Code::PermissionDenied,
        message: "read only",
        metadata: vec![("x-policy", "frozen")],
    });
    let (router, shutdown) = remote_router(service, backend_stop.clone()).await;

    let response = send(&router, get("/config/iplist")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(response.headers()["grpc-metadata-x-policy"], "frozen");
    let body = body_json(response).await;
    assert_eq!(body["code"], Code::PermissionDenied as i32);
    assert_eq!(body["message"], "read only");

    shutdown.trigger();
    backend_stop.cancel();
}

#[tokio::test]
async fn test_remote_cancellation() {
    let backend_stop = CancellationToken::new();
    let service = Arc::new(ScriptedService::new());
    service.stall_for(Duration::from_secs(5));
    let addr = start_backend(service, backend_stop.clone()).await;

    let shutdown = CancellationToken::new();
    let config = remote_config(addr);
    let handle = ConnectionHandle::connect(&config.backend, shutdown.clone()).await.unwrap();
    let invoker = RemoteInvoker::new(handle, GET_CONFIG);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let call = Call::new(GetConfigRequest {}).with_cancel(cancel);
    let outcome: CallOutcome<GetConfigResponse> =
        <RemoteInvoker as Invoker<GetConfigRequest, GetConfigResponse>>::invoke(&invoker, call).await;
    assert_eq!(outcome.code(), Code::Cancelled);

    shutdown.cancel();
    backend_stop.cancel();
}

#[tokio::test]
async fn test_closed_connection_is_unavailable() {
    let backend_stop = CancellationToken::new();
    let service = Arc::new(ScriptedService::new());
    let (router, shutdown) = remote_router(service.clone(), backend_stop.clone()).await;

    shutdown.trigger();
    let response = send(&router, get("/config")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], Code::Unavailable as i32);
    assert_eq!(service.calls(), 0);

    backend_stop.cancel();
}

#[tokio::test]
async fn test_remote_trailers_stay_trailers() {
    let backend_stop = CancellationToken::new();
    let service = Arc::new(ScriptedService::new());
    service.trail_with("x-trail", "t1");
    let (router, shutdown) = remote_router(service, backend_stop.clone()).await;

    let request = Request::builder()
        .method("GET")
        .uri("/config")
        .header(header::TE, "trailers")
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["grpc-metadata-x-config-revision"], "0");
    assert!(response.headers().get("grpc-metadata-x-trail").is_none());
    assert_eq!(response.headers()[header::TRAILER], "grpc-trailer-x-trail");

    let collected = response.into_body().collect().await.unwrap();
    assert_eq!(collected.trailers().unwrap()["grpc-trailer-x-trail"], "t1");

    shutdown.trigger();
    backend_stop.cancel();
}

#[tokio::test]
async fn test_in_flight_call_aborted_on_close() {
    let backend_stop = CancellationToken::new();
    let service = Arc::new(ScriptedService::new());
    service.stall_for(Duration::from_secs(5));
    let addr = start_backend(service, backend_stop.clone()).await;

    let shutdown = CancellationToken::new();
    let config = remote_config(addr);
    let handle = ConnectionHandle::connect(&config.backend, shutdown.clone()).await.unwrap();
    let invoker = RemoteInvoker::new(handle, GET_CONFIG);

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let outcome: CallOutcome<GetConfigResponse> = tokio::time::timeout(
        Duration::from_secs(2),
        <RemoteInvoker as Invoker<GetConfigRequest, GetConfigResponse>>::invoke(&invoker, Call::new(GetConfigRequest {})),
    )
    .await
    .unwrap();
    assert_eq!(outcome.code(), Code::Unavailable);

    backend_stop.cancel();
}

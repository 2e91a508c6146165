//! gRPC server adapter for any [`ConfigService`].
//!
//! Routes `/api.v1.ConfigService/*` paths to the service methods using
//! tonic's unary server machinery with the prost codec. Trailer metadata a
//! handler attaches as [`TrailerMetadata`] is sent in the gRPC trailers.

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use http_body::Frame;
use http_body_util::BodyExt;
use tonic::codegen::{BoxFuture, StdError};
use tonic::server::{Grpc, NamedService, UnaryService};
use tonic::{Request, Response, Status};
use tonic_prost::ProstCodec;

use crate::api::messages::{
    GetConfigRequest, GetConfigResponse, GetIpBlackListRequest, GetIpBlackListResponse, UpdateConfigRequest,
    UpdateConfigResponse, UpdateIpBlackListRequest, UpdateIpBlackListResponse,
};
use crate::api::service::{
    ConfigService, GET_CONFIG, GET_IP_BLACK_LIST, SERVICE_NAME, UPDATE_CONFIG, UPDATE_IP_BLACK_LIST,
};
use crate::rpc::TrailerMetadata;

type Handler<T, Req, Resp> = fn(Arc<T>, Request<Req>) -> BoxFuture<Response<Resp>, Status>;

/// Binds one service method to tonic's `UnaryService`.
struct UnaryHandler<T, Req, Resp> {
    service: Arc<T>,
    handler: Handler<T, Req, Resp>,
}

impl<T, Req, Resp> UnaryService<Req> for UnaryHandler<T, Req, Resp>
where
    T: ConfigService,
    Req: Send + 'static,
    Resp: Send + 'static,
{
    type Response = Resp;
    type Future = BoxFuture<Response<Resp>, Status>;

    fn call(&mut self, request: Request<Req>) -> Self::Future {
        (self.handler)(Arc::clone(&self.service), request)
    }
}

fn get_config<T: ConfigService>(
    service: Arc<T>,
    request: Request<GetConfigRequest>,
) -> BoxFuture<Response<GetConfigResponse>, Status> {
    Box::pin(async move { service.get_config(request).await })
}

fn update_config<T: ConfigService>(
    service: Arc<T>,
    request: Request<UpdateConfigRequest>,
) -> BoxFuture<Response<UpdateConfigResponse>, Status> {
    Box::pin(async move { service.update_config(request).await })
}

fn get_ip_black_list<T: ConfigService>(
    service: Arc<T>,
    request: Request<GetIpBlackListRequest>,
) -> BoxFuture<Response<GetIpBlackListResponse>, Status> {
    Box::pin(async move { service.get_ip_black_list(request).await })
}

fn update_ip_black_list<T: ConfigService>(
    service: Arc<T>,
    request: Request<UpdateIpBlackListRequest>,
) -> BoxFuture<Response<UpdateIpBlackListResponse>, Status> {
    Box::pin(async move { service.update_ip_black_list(request).await })
}

/// `tower::Service` exposing a [`ConfigService`] as `api.v1.ConfigService`.
#[derive(Debug)]
pub struct ConfigServiceServer<T> {
    inner: Arc<T>,
}

impl<T: ConfigService> ConfigServiceServer<T> {
    pub fn new(service: T) -> Self {
        Self::from_arc(Arc::new(service))
    }

    pub fn from_arc(inner: Arc<T>) -> Self {
        Self { inner }
    }
}

impl<T> Clone for ConfigServiceServer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> NamedService for ConfigServiceServer<T> {
    const NAME: &'static str = SERVICE_NAME;
}

async fn serve_unary<T, Req, Resp, B>(
    handler: UnaryHandler<T, Req, Resp>,
    request: http::Request<B>,
) -> http::Response<tonic::body::Body>
where
    T: ConfigService,
    Req: prost::Message + Default + Send + 'static,
    Resp: prost::Message + Send + 'static,
    B: http_body::Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    let mut grpc = Grpc::new(ProstCodec::<Resp, Req>::default());
    let mut response = grpc.unary(handler, request).await;

    match response.extensions_mut().remove::<TrailerMetadata>() {
        Some(TrailerMetadata(trailer)) if !trailer.is_empty() => {
            let extra = trailer.to_tonic().into_headers();
            let (parts, body) = response.into_parts();
            let body = body.map_frame(move |frame| match frame.into_trailers() {
                Ok(mut trailers) => {
                    for (name, value) in extra.iter() {
                        trailers.append(name.clone(), value.clone());
                    }
                    Frame::trailers(trailers)
                }
                Err(frame) => frame,
            });
            http::Response::from_parts(parts, tonic::body::Body::new(body))
        }
        _ => response,
    }
}

impl<T, B> tower::Service<http::Request<B>> for ConfigServiceServer<T>
where
    T: ConfigService,
    B: http_body::Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<tonic::body::Body>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: http::Request<B>) -> Self::Future {
        let service = Arc::clone(&self.inner);
        let path = request.uri().path().to_owned();
        match path.as_str() {
            GET_CONFIG => Box::pin(async move {
                let handler = UnaryHandler {
                    service,
                    handler: get_config::<T>,
                };
                Ok(serve_unary(handler, request).await)
            }),
            UPDATE_CONFIG => Box::pin(async move {
                let handler = UnaryHandler {
                    service,
                    handler: update_config::<T>,
                };
                Ok(serve_unary(handler, request).await)
            }),
            GET_IP_BLACK_LIST => Box::pin(async move {
                let handler = UnaryHandler {
                    service,
                    handler: get_ip_black_list::<T>,
                };
                Ok(serve_unary(handler, request).await)
            }),
            UPDATE_IP_BLACK_LIST => Box::pin(async move {
                let handler = UnaryHandler {
                    service,
                    handler: update_ip_black_list::<T>,
                };
                Ok(serve_unary(handler, request).await)
            }),
            _ => {
                tracing::debug!(path = %path, "Unknown gRPC method");
                let status = Status::unimplemented(format!("unknown method {path}"));
                Box::pin(async move { Ok(status.into_http()) })
            }
        }
    }
}

//! Response rendering.
//!
//! # Responsibilities
//! - Negotiate the output marshaler from the `Accept` header
//! - Render call outcomes, routing failures and oversized bodies as HTTP responses
//! - Map gRPC codes onto HTTP status codes
//! - Expose header metadata as headers and trailer metadata as HTTP trailers
//!
//! # Design Decisions
//! - Every error body has the same shape: `{"code", "message", "details"}`
//! - Trailers are only sent to clients that announced `TE: trailers`
//! - A success message that fails to marshal is rendered as `INTERNAL`

use std::convert::Infallible;

use axum::body::Body;
use axum::response::Response;
use bytes::Bytes;
use futures_util::stream;
use http::header::{ACCEPT, ALLOW, CONTENT_TYPE, TE, TRAILER};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use http_body::Frame;
use http_body_util::StreamBody;
use serde::Serialize;
use tonic::Code;

use crate::gateway::headers::{METADATA_HEADER_PREFIX, METADATA_TRAILER_PREFIX};
use crate::routing::RouteError;
use crate::rpc::{CallError, CallMetadata, CallOutcome, MetadataMap};

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const PRETTY_JSON_MIME: &str = "application/json+pretty";

/// Status for a client that went away before the call finished.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Output encoding for one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Marshaler {
    #[default]
    Json,
    PrettyJson,
}

impl Marshaler {
    pub fn for_request(headers: &HeaderMap) -> Self {
        let pretty = headers
            .get_all(ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .any(|media| media.split(';').next().map(str::trim) == Some(PRETTY_JSON_MIME));
        if pretty {
            Marshaler::PrettyJson
        } else {
            Marshaler::Json
        }
    }

    pub fn content_type(self) -> &'static str {
        JSON_CONTENT_TYPE
    }

    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> serde_json::Result<Vec<u8>> {
        match self {
            Marshaler::Json => serde_json::to_vec(value),
            Marshaler::PrettyJson => serde_json::to_vec_pretty(value),
        }
    }
}

/// A response message the renderer can encode without knowing its type.
pub trait Marshal: Send {
    fn marshal(&self, marshaler: Marshaler) -> serde_json::Result<Vec<u8>>;
}

impl<T: Serialize + Send> Marshal for T {
    fn marshal(&self, marshaler: Marshaler) -> serde_json::Result<Vec<u8>> {
        marshaler.encode(self)
    }
}

/// Per-request rendering choices derived from the request headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderContext {
    pub marshaler: Marshaler,
    pub accepts_trailers: bool,
}

impl RenderContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let accepts_trailers = headers
            .get_all(TE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .any(|token| token.trim().eq_ignore_ascii_case("trailers"));
        Self {
            marshaler: Marshaler::for_request(headers),
            accepts_trailers,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: i32,
    message: &'a str,
    details: &'a [serde_json::Value],
}

/// Fixed gRPC → HTTP status table.
pub fn http_status(code: Code) -> StatusCode {
    match code {
        Code::Ok => StatusCode::OK,
        Code::Cancelled => StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::BAD_REQUEST),
        Code::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        Code::InvalidArgument => StatusCode::BAD_REQUEST,
        Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::AlreadyExists => StatusCode::CONFLICT,
        Code::PermissionDenied => StatusCode::FORBIDDEN,
        Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        Code::FailedPrecondition => StatusCode::BAD_REQUEST,
        Code::Aborted => StatusCode::CONFLICT,
        Code::OutOfRange => StatusCode::BAD_REQUEST,
        Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        Code::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        Code::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Render a finished call.
pub fn render(outcome: CallOutcome<Box<dyn Marshal>>, ctx: &RenderContext) -> Response {
    match outcome {
        CallOutcome::Success { message, metadata } => match message.marshal(ctx.marshaler) {
            Ok(body) => respond(StatusCode::OK, body, &metadata, ctx),
            Err(error) => {
                tracing::error!(error = %error, "Failed to marshal response message");
                render_error(&CallError::internal("failed to marshal response"), &metadata, ctx)
            }
        },
        CallOutcome::Failure { error, metadata } => render_error(&error, &metadata, ctx),
    }
}

/// Render a call error with the standard error body.
pub fn render_error(error: &CallError, metadata: &CallMetadata, ctx: &RenderContext) -> Response {
    let body = ErrorBody {
        code: error.code as i32,
        message: &error.message,
        details: &[],
    };
    let bytes = match ctx.marshaler.encode(&body) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "Failed to marshal error body");
            br#"{"code":13,"message":"failed to marshal error","details":[]}"#.to_vec()
        }
    };
    respond(http_status(error.code), bytes, metadata, ctx)
}

/// Render a routing failure.
pub fn render_route_error(error: &RouteError, ctx: &RenderContext) -> Response {
    match error {
        RouteError::NotFound => render_error(
            &CallError::new(Code::NotFound, "Not Found"),
            &CallMetadata::default(),
            ctx,
        ),
        RouteError::MethodNotAllowed { allowed } => {
            let mut response = render_error(
                &CallError::new(Code::Unimplemented, "Method Not Allowed"),
                &CallMetadata::default(),
                ctx,
            );
            *response.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
            let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(ALLOW, value);
            }
            response
        }
    }
}

/// Render a request body over the configured limit: 413 with `RESOURCE_EXHAUSTED`.
pub fn render_payload_too_large(limit: usize, ctx: &RenderContext) -> Response {
    let error = CallError::new(
        Code::ResourceExhausted,
        format!("request body exceeds the {limit} byte limit"),
    );
    let mut response = render_error(&error, &CallMetadata::default(), ctx);
    *response.status_mut() = StatusCode::PAYLOAD_TOO_LARGE;
    response
}

fn respond(status: StatusCode, body: Vec<u8>, metadata: &CallMetadata, ctx: &RenderContext) -> Response {
    let trailers = if ctx.accepts_trailers {
        prefixed_headers(METADATA_TRAILER_PREFIX, &metadata.trailer)
    } else {
        if !metadata.trailer.is_empty() {
            tracing::trace!(
                keys = metadata.trailer.len(),
                "Client did not accept trailers; dropping trailer metadata"
            );
        }
        HeaderMap::new()
    };

    let trailer_header = if trailers.is_empty() {
        None
    } else {
        let declared: Vec<&str> = trailers.keys().map(HeaderName::as_str).collect();
        HeaderValue::from_str(&declared.join(", ")).ok()
    };

    let body = if trailers.is_empty() {
        Body::from(body)
    } else {
        let frames = stream::iter([
            Ok::<_, Infallible>(Frame::data(Bytes::from(body))),
            Ok(Frame::trailers(trailers)),
        ]);
        Body::new(StreamBody::new(frames))
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(ctx.marshaler.content_type()));
    for (name, value) in prefixed_headers(METADATA_HEADER_PREFIX, &metadata.header) {
        if let Some(name) = name {
            headers.append(name, value);
        }
    }
    if let Some(value) = trailer_header {
        headers.insert(TRAILER, value);
    }
    response
}

fn prefixed_headers(prefix: &str, metadata: &MetadataMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (key, values) in metadata.iter() {
        let Ok(name) = HeaderName::try_from(format!("{prefix}{key}")) else {
            tracing::debug!(key, "Metadata key is not a valid header name");
            continue;
        };
        for value in values {
            match HeaderValue::from_str(value) {
                Ok(value) => {
                    headers.append(name.clone(), value);
                }
                Err(_) => tracing::debug!(key, "Metadata value is not a valid header value"),
            }
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn accept(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(value));
        headers
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_marshaler_negotiation() {
        assert_eq!(Marshaler::for_request(&HeaderMap::new()), Marshaler::Json);
        assert_eq!(Marshaler::for_request(&accept("application/json")), Marshaler::Json);
        assert_eq!(
            Marshaler::for_request(&accept("text/html, application/json+pretty;q=0.9")),
            Marshaler::PrettyJson
        );
    }

    #[test]
    fn test_status_table() {
        assert_eq!(http_status(Code::Ok), StatusCode::OK);
        assert_eq!(http_status(Code::Cancelled).as_u16(), 499);
        assert_eq!(http_status(Code::InvalidArgument), StatusCode::BAD_REQUEST);
        assert_eq!(http_status(Code::DeadlineExceeded), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(http_status(Code::AlreadyExists), StatusCode::CONFLICT);
        assert_eq!(http_status(Code::Unauthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(http_status(Code::ResourceExhausted), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(http_status(Code::Unimplemented), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(http_status(Code::Unavailable), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(http_status(Code::DataLoss), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_success_with_header_metadata() {
        let metadata = CallMetadata::from_header([("x-revision", "3")].into_iter().collect());
        let message: Box<dyn Marshal> = Box::new(serde_json::json!({"ok": true}));
        let response = render(CallOutcome::success(message, metadata), &RenderContext::default());

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(response.headers()["grpc-metadata-x-revision"], "3");
        assert!(response.headers().get(TRAILER).is_none());
        assert_eq!(body_json(response).await, serde_json::json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let error = CallError::unavailable("backend down");
        let metadata = CallMetadata::from_header([("x-retry-after", "5")].into_iter().collect());
        let response = render_error(&error, &metadata, &RenderContext::default());

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()["grpc-metadata-x-retry-after"], "5");
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"code": 14, "message": "backend down", "details": []})
        );
    }

    #[tokio::test]
    async fn test_trailers_only_when_accepted() {
        let metadata = CallMetadata::new(MetadataMap::new(), [("x-checksum", "abc")].into_iter().collect());

        let response = render_error(&CallError::internal("x"), &metadata, &RenderContext::default());
        assert!(response.headers().get(TRAILER).is_none());
        let collected = response.into_body().collect().await.unwrap();
        assert!(collected.trailers().is_none());

        let ctx = RenderContext {
            accepts_trailers: true,
            ..RenderContext::default()
        };
        let response = render_error(&CallError::internal("x"), &metadata, &ctx);
        assert_eq!(response.headers()[TRAILER], "grpc-trailer-x-checksum");
        let collected = response.into_body().collect().await.unwrap();
        assert_eq!(collected.trailers().unwrap()["grpc-trailer-x-checksum"], "abc");
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let error = RouteError::MethodNotAllowed {
            allowed: vec![Method::GET, Method::POST],
        };
        let response = render_route_error(&error, &RenderContext::default());
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "GET, POST");
        let body = body_json(response).await;
        assert_eq!(body["code"], 12);
    }

    #[tokio::test]
    async fn test_payload_too_large() {
        let response = render_payload_too_large(16, &RenderContext::default());
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let body = body_json(response).await;
        assert_eq!(body["code"], 8);
        assert_eq!(body["message"], "request body exceeds the 16 byte limit");
    }

    #[tokio::test]
    async fn test_pretty_output() {
        let ctx = RenderContext {
            marshaler: Marshaler::PrettyJson,
            accepts_trailers: false,
        };
        let message: Box<dyn Marshal> = Box::new(serde_json::json!({"a": 1}));
        let response = render(CallOutcome::success(message, CallMetadata::default()), &ctx);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.contains(&b'\n'));
    }

    #[test]
    fn test_te_trailers_detection() {
        let mut headers = HeaderMap::new();
        headers.insert(TE, HeaderValue::from_static("gzip, trailers"));
        assert!(RenderContext::from_headers(&headers).accepts_trailers);
        assert!(!RenderContext::from_headers(&HeaderMap::new()).accepts_trailers);
    }
}

//! Call invocation against a local handler or a remote backend.
//!
//! # Responsibilities
//! - Run one typed unary call and package the result as a [`CallOutcome`]
//! - Enforce explicit cancellation and an optional deadline
//! - Capture header and trailer metadata reported by the callee, phase by phase
//!
//! # Design Decisions
//! - One trait, two variants picked at composition time; the dispatcher never
//!   knows which one it talks to
//! - Cancellation wins over completion when both are ready
//! - Errors returned by the callee pass through unchanged
//! - Remote calls still running when the backend connection closes fail
//!   with `UNAVAILABLE`

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::uri::PathAndQuery;
use tokio_util::sync::CancellationToken;
use tonic_prost::ProstCodec;

use crate::rpc::connection::ConnectionHandle;
use crate::rpc::metadata::{CallMetadata, MetadataMap, TrailerMetadata};
use crate::rpc::outcome::{CallError, CallOutcome};

/// One outgoing call: the typed input plus its call context.
#[derive(Debug)]
pub struct Call<Req> {
    pub message: Req,
    pub metadata: MetadataMap,
    pub cancel: CancellationToken,
    pub timeout: Option<Duration>,
}

impl<Req> Call<Req> {
    pub fn new(message: Req) -> Self {
        Self {
            message,
            metadata: MetadataMap::new(),
            cancel: CancellationToken::new(),
            timeout: None,
        }
    }

    pub fn with_metadata(mut self, metadata: MetadataMap) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn into_request(self) -> (tonic::Request<Req>, CancellationToken, Option<Duration>) {
        let mut request = tonic::Request::new(self.message);
        *request.metadata_mut() = self.metadata.to_tonic();
        (request, self.cancel, self.timeout)
    }
}

/// Executes a unary call.
#[async_trait]
pub trait Invoker<Req, Resp>: Send + Sync
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn invoke(&self, call: Call<Req>) -> CallOutcome<Resp>;
}

/// Race `call` against cancellation and the optional deadline.
async fn guarded<F, T>(cancel: &CancellationToken, timeout: Option<Duration>, call: F) -> Result<T, CallError>
where
    F: Future<Output = T>,
{
    let bounded = async {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| CallError::deadline_exceeded()),
            None => Ok(call.await),
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CallError::cancelled()),
        result = bounded => result,
    }
}

/// Calls an in-process handler directly.
///
/// `method` receives the shared service and a `tonic::Request`, the same shape
/// a generated server trait method has, so one service implementation can be
/// bridged in process or served over gRPC.
pub struct LocalInvoker<S: ?Sized, F> {
    service: Arc<S>,
    method: F,
}

impl<S: ?Sized, F> LocalInvoker<S, F> {
    pub fn new(service: Arc<S>, method: F) -> Self {
        Self { service, method }
    }
}

#[async_trait]
impl<S, F, Fut, Req, Resp> Invoker<Req, Resp> for LocalInvoker<S, F>
where
    S: ?Sized + Send + Sync + 'static,
    F: Fn(Arc<S>, tonic::Request<Req>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<tonic::Response<Resp>, tonic::Status>> + Send,
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn invoke(&self, call: Call<Req>) -> CallOutcome<Resp> {
        let (request, cancel, timeout) = call.into_request();
        let pending = (self.method)(Arc::clone(&self.service), request);

        match guarded(&cancel, timeout, pending).await {
            Ok(Ok(response)) => {
                let (metadata, message, extensions) = response.into_parts();
                let header = MetadataMap::from_tonic(&metadata);
                let captured = extensions
                    .get::<TrailerMetadata>()
                    .map(|TrailerMetadata(trailer)| CallMetadata::new(MetadataMap::new(), trailer.clone()))
                    .unwrap_or_default();
                CallOutcome::success(message, CallMetadata::from_header(header)).merge_metadata(&captured)
            }
            Ok(Err(status)) => CallOutcome::from_status(&status),
            Err(error) => CallOutcome::failure(error, CallMetadata::default()),
        }
    }
}

/// Issues the call over the shared backend connection.
///
/// The response is read as a one-message stream so the header and trailer
/// phases of the backend's metadata stay apart.
#[derive(Debug, Clone)]
pub struct RemoteInvoker {
    connection: ConnectionHandle,
    path: PathAndQuery,
}

impl RemoteInvoker {
    /// `rpc_method` is the fully qualified path, e.g. `/api.v1.ConfigService/GetConfig`.
    pub fn new(connection: ConnectionHandle, rpc_method: &'static str) -> Self {
        Self {
            connection,
            path: PathAndQuery::from_static(rpc_method),
        }
    }

    async fn exchange<Req, Resp>(&self, request: tonic::Request<Req>) -> CallOutcome<Resp>
    where
        Req: prost::Message + 'static,
        Resp: prost::Message + Default + 'static,
    {
        let mut grpc = tonic::client::Grpc::new(self.connection.channel());
        if let Err(e) = grpc.ready().await {
            return CallOutcome::failure(
                CallError::unavailable(format!("backend not ready: {e}")),
                CallMetadata::default(),
            );
        }

        // Trailers-only responses carry their metadata with the status.
        let response = match grpc
            .server_streaming(request, self.path.clone(), ProstCodec::default())
            .await
        {
            Ok(response) => response,
            Err(status) => return CallOutcome::from_status(&status),
        };

        let (metadata, mut stream, _) = response.into_parts();
        let header = MetadataMap::from_tonic(&metadata);

        let message = match stream.message().await {
            Ok(Some(message)) => message,
            Ok(None) => {
                return CallOutcome::failure(
                    CallError::internal("backend sent no response message"),
                    CallMetadata::from_header(header),
                )
            }
            Err(status) => return trailing_failure(&status, header),
        };

        match stream.trailers().await {
            Ok(trailers) => {
                let trailer = trailers.as_ref().map(MetadataMap::from_tonic).unwrap_or_default();
                CallOutcome::success(message, CallMetadata::new(header, trailer))
            }
            Err(status) => trailing_failure(&status, header),
        }
    }
}

/// Failure reported in the trailers after response headers were received.
fn trailing_failure<M>(status: &tonic::Status, header: MetadataMap) -> CallOutcome<M> {
    CallOutcome::failure(
        CallError::from(status),
        CallMetadata::new(header, MetadataMap::from_tonic(status.metadata())),
    )
}

#[async_trait]
impl<Req, Resp> Invoker<Req, Resp> for RemoteInvoker
where
    Req: prost::Message + 'static,
    Resp: prost::Message + Default + 'static,
{
    async fn invoke(&self, call: Call<Req>) -> CallOutcome<Resp> {
        if self.connection.is_closed() {
            return CallOutcome::failure(
                CallError::unavailable("backend connection is closed"),
                CallMetadata::default(),
            );
        }

        let (mut request, cancel, timeout) = call.into_request();
        if let Some(limit) = timeout {
            request.set_timeout(limit);
        }

        // In-flight calls are abandoned when the connection closes.
        let exchange = async {
            tokio::select! {
                biased;
                _ = self.connection.closed() => CallOutcome::failure(
                    CallError::unavailable("backend connection closed during call"),
                    CallMetadata::default(),
                ),
                outcome = self.exchange(request) => outcome,
            }
        };

        let outcome = match guarded(&cancel, timeout, exchange).await {
            Ok(outcome) => outcome,
            Err(error) => CallOutcome::failure(error, CallMetadata::default()),
        };
        if let CallOutcome::Failure { error, .. } = &outcome {
            tracing::debug!(
                rpc_method = self.path.as_str(),
                code = ?error.code,
                message = %error.message,
                "Backend call failed"
            );
        }
        outcome
    }
}

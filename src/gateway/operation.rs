//! Type-erased operations the dispatcher can route to.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::gateway::binder;
use crate::gateway::render::Marshal;
use crate::routing::{OperationDescriptor, PathParams};
use crate::rpc::{Call, CallMetadata, CallOutcome, Invoker, MetadataMap};

/// Marshal-ready response message.
pub type Reply = Box<dyn Marshal>;

/// Everything the dispatcher knows about a matched request.
#[derive(Debug)]
pub struct InboundCall {
    pub params: PathParams,
    pub body: Bytes,
    pub metadata: MetadataMap,
    pub cancel: CancellationToken,
    pub timeout: Option<Duration>,
}

/// A routable operation: binds its own input and invokes its own backend.
#[async_trait]
pub trait Operation: Send + Sync {
    fn descriptor(&self) -> &OperationDescriptor;

    async fn call(&self, call: InboundCall) -> CallOutcome<Reply>;
}

/// Unary operation over a typed invoker.
pub struct UnaryOperation<Req, Resp> {
    descriptor: OperationDescriptor,
    invoker: Arc<dyn Invoker<Req, Resp>>,
}

impl<Req, Resp> UnaryOperation<Req, Resp>
where
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + 'static,
{
    pub fn new(descriptor: OperationDescriptor, invoker: impl Invoker<Req, Resp> + 'static) -> Self {
        Self {
            descriptor,
            invoker: Arc::new(invoker),
        }
    }
}

#[async_trait]
impl<Req, Resp> Operation for UnaryOperation<Req, Resp>
where
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + 'static,
{
    fn descriptor(&self) -> &OperationDescriptor {
        &self.descriptor
    }

    async fn call(&self, call: InboundCall) -> CallOutcome<Reply> {
        let message = match binder::bind::<Req>(&self.descriptor, &call.params, &call.body) {
            Ok(message) => message,
            Err(error) => {
                tracing::debug!(
                    rpc_method = self.descriptor.rpc_method,
                    error = %error,
                    "Request binding failed"
                );
                return CallOutcome::failure(error, CallMetadata::default());
            }
        };
        tracing::debug!(rpc_method = self.descriptor.rpc_method, "Request bound");

        let call = Call::new(message)
            .with_metadata(call.metadata)
            .with_cancel(call.cancel)
            .with_timeout(call.timeout);
        self.invoker
            .invoke(call)
            .await
            .map(|message| Box::new(message) as Reply)
    }
}

//! HTTP bindings for `api.v1.ConfigService`.
//!
//! | HTTP | RPC | Body |
//! |---|---|---|
//! | `GET /config` | `GetConfig` | none |
//! | `POST /config:update` | `UpdateConfig` | `*` |
//! | `GET /config/iplist` | `GetIpBlackList` | none |
//! | `POST /config/iplist:update` | `UpdateIpBlackList` | `*` |

use std::sync::Arc;

use http::Method;
use tonic::Request;

use crate::api::messages::{
    GetConfigRequest, GetConfigResponse, GetIpBlackListRequest, GetIpBlackListResponse, UpdateConfigRequest,
    UpdateConfigResponse, UpdateIpBlackListRequest, UpdateIpBlackListResponse,
};
use crate::api::service::{ConfigService, GET_CONFIG, GET_IP_BLACK_LIST, UPDATE_CONFIG, UPDATE_IP_BLACK_LIST};
use crate::gateway::{DispatcherBuilder, UnaryOperation};
use crate::routing::{BodyBinding, OperationDescriptor, RegistrationError};
use crate::rpc::{ConnectionHandle, LocalInvoker, RemoteInvoker};

fn describe(
    method: Method,
    template: &str,
    rpc_method: &'static str,
    body: BodyBinding,
) -> Result<OperationDescriptor, RegistrationError> {
    Ok(OperationDescriptor::new(method, template, rpc_method)?.with_body(body))
}

/// Register the four operations against an in-process service.
pub fn register_local<S>(builder: &mut DispatcherBuilder, service: Arc<S>) -> Result<(), RegistrationError>
where
    S: ConfigService + ?Sized,
{
    builder.register(UnaryOperation::<GetConfigRequest, GetConfigResponse>::new(
        describe(Method::GET, "/config", GET_CONFIG, BodyBinding::None)?,
        LocalInvoker::new(
            Arc::clone(&service),
            |svc: Arc<S>, req: Request<GetConfigRequest>| async move { svc.get_config(req).await },
        ),
    ))?;

    builder.register(UnaryOperation::<UpdateConfigRequest, UpdateConfigResponse>::new(
        describe(Method::POST, "/config:update", UPDATE_CONFIG, BodyBinding::Message)?,
        LocalInvoker::new(
            Arc::clone(&service),
            |svc: Arc<S>, req: Request<UpdateConfigRequest>| async move { svc.update_config(req).await },
        ),
    ))?;

    builder.register(UnaryOperation::<GetIpBlackListRequest, GetIpBlackListResponse>::new(
        describe(Method::GET, "/config/iplist", GET_IP_BLACK_LIST, BodyBinding::None)?,
        LocalInvoker::new(
            Arc::clone(&service),
            |svc: Arc<S>, req: Request<GetIpBlackListRequest>| async move { svc.get_ip_black_list(req).await },
        ),
    ))?;

    builder.register(UnaryOperation::<UpdateIpBlackListRequest, UpdateIpBlackListResponse>::new(
        describe(Method::POST, "/config/iplist:update", UPDATE_IP_BLACK_LIST, BodyBinding::Message)?,
        LocalInvoker::new(
            service,
            |svc: Arc<S>, req: Request<UpdateIpBlackListRequest>| async move { svc.update_ip_black_list(req).await },
        ),
    ))?;

    Ok(())
}

/// Register the four operations against a remote `api.v1.ConfigService`.
pub fn register_remote(builder: &mut DispatcherBuilder, connection: ConnectionHandle) -> Result<(), RegistrationError> {
    builder.register(UnaryOperation::<GetConfigRequest, GetConfigResponse>::new(
        describe(Method::GET, "/config", GET_CONFIG, BodyBinding::None)?,
        RemoteInvoker::new(connection.clone(), GET_CONFIG),
    ))?;

    builder.register(UnaryOperation::<UpdateConfigRequest, UpdateConfigResponse>::new(
        describe(Method::POST, "/config:update", UPDATE_CONFIG, BodyBinding::Message)?,
        RemoteInvoker::new(connection.clone(), UPDATE_CONFIG),
    ))?;

    builder.register(UnaryOperation::<GetIpBlackListRequest, GetIpBlackListResponse>::new(
        describe(Method::GET, "/config/iplist", GET_IP_BLACK_LIST, BodyBinding::None)?,
        RemoteInvoker::new(connection.clone(), GET_IP_BLACK_LIST),
    ))?;

    builder.register(UnaryOperation::<UpdateIpBlackListRequest, UpdateIpBlackListResponse>::new(
        describe(Method::POST, "/config/iplist:update", UPDATE_IP_BLACK_LIST, BodyBinding::Message)?,
        RemoteInvoker::new(connection, UPDATE_IP_BLACK_LIST),
    ))?;

    Ok(())
}

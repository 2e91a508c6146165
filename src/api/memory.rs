//! In-memory `ConfigService` backend.
//!
//! # Responsibilities
//! - Hold the gateway configuration and the IP blacklist
//! - Apply partial configuration updates
//! - Report the configuration revision as response metadata
//!
//! # Design Decisions
//! - One `RwLock` around all state; a poisoned lock is reported as `INTERNAL`
//! - ADD silently skips entries that are not IPv4 addresses
//! - An unspecified blacklist action is rejected with `INVALID_ARGUMENT`

use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tonic::metadata::MetadataValue;
use tonic::{Request, Response, Status};

use crate::api::messages::{
    ActionType, ExternalAuthConfig, GetConfigRequest, GetConfigResponse, GetIpBlackListRequest,
    GetIpBlackListResponse, UpdateConfigRequest, UpdateConfigResponse, UpdateIpBlackListRequest,
    UpdateIpBlackListResponse,
};
use crate::api::service::ConfigService;

/// Response metadata key carrying the configuration revision.
pub const REVISION_METADATA: &str = "x-config-revision";

#[derive(Debug, Clone, Default)]
struct State {
    revision: u64,
    http_compression: bool,
    https: bool,
    enable_rate_limitor: bool,
    num_token_max: u32,
    num_token_per_sec: u32,
    external_auth: ExternalAuthConfig,
    blacklist: BTreeSet<String>,
}

impl State {
    fn snapshot(&self) -> GetConfigResponse {
        GetConfigResponse {
            http_compression: self.http_compression,
            https: self.https,
            enable_rate_limitor: self.enable_rate_limitor,
            num_token_max: self.num_token_max,
            num_token_per_sec: self.num_token_per_sec,
            external_auth_config: Some(self.external_auth.clone()),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryConfigService {
    state: RwLock<State>,
}

impl InMemoryConfigService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `ips` already blacklisted.
    pub fn with_blacklist<I, S>(ips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = State {
            blacklist: ips.into_iter().map(Into::into).collect(),
            ..State::default()
        };
        Self {
            state: RwLock::new(state),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, Status> {
        self.state
            .read()
            .map_err(|_| Status::internal("configuration state is poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, Status> {
        self.state
            .write()
            .map_err(|_| Status::internal("configuration state is poisoned"))
    }
}

fn with_revision<T>(message: T, revision: u64) -> Response<T> {
    let mut response = Response::new(message);
    response
        .metadata_mut()
        .insert(REVISION_METADATA, MetadataValue::from(revision));
    response
}

#[async_trait]
impl ConfigService for InMemoryConfigService {
    async fn get_config(&self, _request: Request<GetConfigRequest>) -> Result<Response<GetConfigResponse>, Status> {
        let state = self.read()?;
        Ok(with_revision(state.snapshot(), state.revision))
    }

    async fn update_config(
        &self,
        request: Request<UpdateConfigRequest>,
    ) -> Result<Response<UpdateConfigResponse>, Status> {
        let update = request.into_inner();
        let mut state = self.write()?;

        if let Some(value) = update.http_compression {
            state.http_compression = value;
        }
        if let Some(value) = update.https {
            state.https = value;
        }
        if let Some(value) = update.enable_rate_limitor {
            state.enable_rate_limitor = value;
        }
        if let Some(value) = update.num_token_max {
            state.num_token_max = value;
        }
        if let Some(value) = update.num_token_per_sec {
            state.num_token_per_sec = value;
        }
        if let Some(auth) = update.external_auth_config {
            state.external_auth = auth;
        }
        state.revision += 1;

        tracing::info!(revision = state.revision, "Configuration updated");
        Ok(with_revision(state.snapshot(), state.revision))
    }

    async fn get_ip_black_list(
        &self,
        _request: Request<GetIpBlackListRequest>,
    ) -> Result<Response<GetIpBlackListResponse>, Status> {
        let state = self.read()?;
        let response = GetIpBlackListResponse {
            ip_list: state.blacklist.iter().cloned().collect(),
        };
        Ok(with_revision(response, state.revision))
    }

    async fn update_ip_black_list(
        &self,
        request: Request<UpdateIpBlackListRequest>,
    ) -> Result<Response<UpdateIpBlackListResponse>, Status> {
        let update = request.into_inner();
        let action = ActionType::try_from(update.action).unwrap_or(ActionType::Unspecified);

        let mut state = self.write()?;
        match action {
            ActionType::Add => {
                for ip in update.ip_list {
                    if ip.parse::<Ipv4Addr>().is_ok() {
                        state.blacklist.insert(ip);
                    } else {
                        tracing::debug!(ip = %ip, "Skipping invalid IPv4 address");
                    }
                }
            }
            ActionType::Remove => {
                for ip in &update.ip_list {
                    state.blacklist.remove(ip);
                }
            }
            ActionType::Unspecified => {
                return Err(Status::invalid_argument("blacklist action must be ADD or REMOVE"));
            }
        }
        state.revision += 1;

        tracing::info!(
            action = action.as_str_name(),
            size = state.blacklist.len(),
            "IP blacklist updated"
        );
        Ok(with_revision(UpdateIpBlackListResponse {}, state.revision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[tokio::test]
    async fn test_partial_update_applies_present_fields() {
        let service = InMemoryConfigService::new();
        let update = UpdateConfigRequest {
            https: Some(true),
            num_token_max: Some(50),
            ..Default::default()
        };
        let response = service.update_config(Request::new(update)).await.unwrap();
        assert_eq!(response.metadata().get(REVISION_METADATA).unwrap().to_str().unwrap(), "1");

        let config = response.into_inner();
        assert!(config.https);
        assert_eq!(config.num_token_max, 50);
        assert!(!config.http_compression);

        let current = service
            .get_config(Request::new(GetConfigRequest {}))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(current, config);
    }

    #[tokio::test]
    async fn test_blacklist_add_skips_invalid() {
        let service = InMemoryConfigService::new();
        let request = UpdateIpBlackListRequest {
            action: ActionType::Add as i32,
            ip_list: vec!["10.0.0.1".into(), "not-an-ip".into(), "::1".into()],
        };
        service.update_ip_black_list(Request::new(request)).await.unwrap();

        let list = service
            .get_ip_black_list(Request::new(GetIpBlackListRequest {}))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(list.ip_list, vec!["10.0.0.1".to_string()]);
    }

    #[tokio::test]
    async fn test_blacklist_remove() {
        let service = InMemoryConfigService::with_blacklist(["10.0.0.1", "10.0.0.2"]);
        let request = UpdateIpBlackListRequest {
            action: ActionType::Remove as i32,
            ip_list: vec!["10.0.0.1".into(), "10.9.9.9".into()],
        };
        service.update_ip_black_list(Request::new(request)).await.unwrap();

        let list = service
            .get_ip_black_list(Request::new(GetIpBlackListRequest {}))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(list.ip_list, vec!["10.0.0.2".to_string()]);
    }

    #[tokio::test]
    async fn test_unspecified_action_rejected() {
        let service = InMemoryConfigService::new();
        let status = service
            .update_ip_black_list(Request::new(UpdateIpBlackListRequest::default()))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }
}

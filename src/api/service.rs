//! `api.v1.ConfigService` contract.

use async_trait::async_trait;
use tonic::{Request, Response, Status};

use crate::api::messages::{
    GetConfigRequest, GetConfigResponse, GetIpBlackListRequest, GetIpBlackListResponse, UpdateConfigRequest,
    UpdateConfigResponse, UpdateIpBlackListRequest, UpdateIpBlackListResponse,
};

pub const SERVICE_NAME: &str = "api.v1.ConfigService";

pub const GET_CONFIG: &str = "/api.v1.ConfigService/GetConfig";
pub const UPDATE_CONFIG: &str = "/api.v1.ConfigService/UpdateConfig";
pub const GET_IP_BLACK_LIST: &str = "/api.v1.ConfigService/GetIpBlackList";
pub const UPDATE_IP_BLACK_LIST: &str = "/api.v1.ConfigService/UpdateIpBlackList";

/// Gateway configuration service. Implementations can be bridged in process
/// (`register_local`) or served over gRPC (`ConfigServiceServer`).
#[async_trait]
pub trait ConfigService: Send + Sync + 'static {
    async fn get_config(&self, request: Request<GetConfigRequest>) -> Result<Response<GetConfigResponse>, Status>;

    async fn update_config(
        &self,
        request: Request<UpdateConfigRequest>,
    ) -> Result<Response<UpdateConfigResponse>, Status>;

    async fn get_ip_black_list(
        &self,
        request: Request<GetIpBlackListRequest>,
    ) -> Result<Response<GetIpBlackListResponse>, Status>;

    async fn update_ip_black_list(
        &self,
        request: Request<UpdateIpBlackListRequest>,
    ) -> Result<Response<UpdateIpBlackListResponse>, Status>;
}

use serde::Serialize;
use ts_rs::TS;

mod permissions;
mod roles;

pub use permissions::{
    AccessNoticeResponse, LegacyPermissionResponse, PermissionCategoryResponse,
    PermissionDefinitionResponse, PermissionSchemaResponse, PermissionStateResponse,
    RouteCheckRequest, RouteCheckResponse, RoutePermissionResponse,
};
pub use roles::{
    CreateRoleRequest, RoleResponse, UpdateDescriptionRequest, UpdateDetailedPermissionRequest,
    UpdateLegacyPermissionRequest,
};

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
}

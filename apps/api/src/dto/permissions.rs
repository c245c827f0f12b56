use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

mod conversions;

/// Resolved permissions of the calling session.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permission-state-response.ts"
)]
pub struct PermissionStateResponse {
    pub role_name: Option<String>,
    pub tier: Option<String>,
    pub is_loading: bool,
    pub resolved_at: String,
    pub permissions: BTreeMap<String, bool>,
    pub detailed_permissions: BTreeMap<String, BTreeMap<String, bool>>,
    pub granted_detailed_count: usize,
    pub total_detailed_count: usize,
}

/// One detailed permission in the catalog.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permission-definition-response.ts"
)]
pub struct PermissionDefinitionResponse {
    pub key: String,
    pub label: String,
    pub description: String,
}

/// One detailed permission category in the catalog.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permission-category-response.ts"
)]
pub struct PermissionCategoryResponse {
    pub key: String,
    pub label: String,
    pub description: String,
    pub permissions: Vec<PermissionDefinitionResponse>,
}

/// One legacy flag and whether roles may configure it.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/legacy-permission-response.ts"
)]
pub struct LegacyPermissionResponse {
    pub key: String,
    pub configurable: bool,
}

/// Route prefix and the legacy flag guarding it.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/route-permission-response.ts"
)]
pub struct RoutePermissionResponse {
    pub path: String,
    pub permission: String,
}

/// Full permission catalog.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permission-schema-response.ts"
)]
pub struct PermissionSchemaResponse {
    pub categories: Vec<PermissionCategoryResponse>,
    pub legacy_permissions: Vec<LegacyPermissionResponse>,
    pub routes: Vec<RoutePermissionResponse>,
    pub total_detailed_count: usize,
}

/// Incoming payload for a route guard check.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/route-check-request.ts"
)]
pub struct RouteCheckRequest {
    pub path: String,
    #[serde(default)]
    pub required_permission: Option<String>,
    #[serde(default)]
    pub required_role: Option<String>,
}

/// Access denied notice shown to the user.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/access-notice-response.ts"
)]
pub struct AccessNoticeResponse {
    pub title: String,
    pub description: String,
}

/// Route guard outcome for one path.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/route-check-response.ts"
)]
pub struct RouteCheckResponse {
    /// One of `loading`, `redirect`, `denied` or `allow`.
    pub decision: String,
    pub target: Option<String>,
    pub reason: Option<String>,
    pub required_role: Option<String>,
    pub notice: Option<AccessNoticeResponse>,
}

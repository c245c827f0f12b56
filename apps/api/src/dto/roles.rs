use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

mod conversions;

/// API representation of a tenant role configuration.
#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-response.ts"
)]
pub struct RoleResponse {
    pub role_id: String,
    pub role_name: String,
    pub description: String,
    pub is_predefined: bool,
    pub display_order: i32,
    pub permissions: BTreeMap<String, bool>,
    pub detailed_permissions: BTreeMap<String, BTreeMap<String, bool>>,
    pub granted_detailed_count: usize,
    pub created_at: String,
    pub updated_at: String,
}

/// Incoming payload for custom role creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-role-request.ts"
)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Incoming payload for a detailed permission toggle.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/update-detailed-permission-request.ts"
)]
pub struct UpdateDetailedPermissionRequest {
    pub category: String,
    pub key: String,
    pub value: bool,
}

/// Incoming payload for a legacy permission toggle.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/update-legacy-permission-request.ts"
)]
pub struct UpdateLegacyPermissionRequest {
    pub key: String,
    pub value: bool,
}

/// Incoming payload for a role description update.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/update-description-request.ts"
)]
pub struct UpdateDescriptionRequest {
    pub description: String,
}

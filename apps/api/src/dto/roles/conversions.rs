use rolegate_domain::CustomRole;

use super::RoleResponse;

impl From<CustomRole> for RoleResponse {
    fn from(value: CustomRole) -> Self {
        Self {
            role_id: value.id.as_uuid().to_string(),
            role_name: value.role_name.to_string(),
            description: value.description,
            is_predefined: value.is_predefined,
            display_order: value.display_order,
            permissions: value.legacy_permissions.into(),
            detailed_permissions: value.detailed_permissions.into(),
            granted_detailed_count: value.detailed_permissions.granted_count(),
            created_at: value.created_at.to_rfc3339(),
            updated_at: value.updated_at.to_rfc3339(),
        }
    }
}

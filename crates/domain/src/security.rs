use serde::{Deserialize, Serialize};

/// Stable audit actions emitted by role configuration use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a custom role is created.
    SecurityRoleCreated,
    /// Emitted when a detailed permission of a role is toggled.
    SecurityRolePermissionUpdated,
    /// Emitted when a legacy flag of a role is toggled.
    SecurityRoleLegacyPermissionUpdated,
    /// Emitted when a role description changes.
    SecurityRoleDescriptionUpdated,
    /// Emitted when a custom role is deleted.
    SecurityRoleDeleted,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SecurityRoleCreated => "security.role.created",
            Self::SecurityRolePermissionUpdated => "security.role.permission_updated",
            Self::SecurityRoleLegacyPermissionUpdated => {
                "security.role.legacy_permission_updated"
            }
            Self::SecurityRoleDescriptionUpdated => "security.role.description_updated",
            Self::SecurityRoleDeleted => "security.role.deleted",
        }
    }
}

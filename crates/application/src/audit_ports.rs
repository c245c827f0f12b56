use async_trait::async_trait;

use rolegate_core::{AppResult, TenantId, UserId};
use rolegate_domain::{AuditAction, DetailedPermission, LegacyPermission, RoleName};

/// What one role editor mutation changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleChange {
    /// The role was created with every permission denied.
    Created,
    /// One detailed permission was set.
    DetailedPermission {
        /// Schema entry that was set.
        permission: DetailedPermission,
        /// New value.
        granted: bool,
    },
    /// One configurable legacy flag was set.
    LegacyPermission {
        /// Flag that was set.
        permission: LegacyPermission,
        /// New value.
        granted: bool,
    },
    /// The description was replaced with this text.
    Description(String),
    /// The role was deleted.
    Deleted,
}

impl RoleChange {
    /// Returns the stable audit action for this change.
    #[must_use]
    pub fn action(&self) -> AuditAction {
        match self {
            Self::Created => AuditAction::SecurityRoleCreated,
            Self::DetailedPermission { .. } => AuditAction::SecurityRolePermissionUpdated,
            Self::LegacyPermission { .. } => AuditAction::SecurityRoleLegacyPermissionUpdated,
            Self::Description(_) => AuditAction::SecurityRoleDescriptionUpdated,
            Self::Deleted => AuditAction::SecurityRoleDeleted,
        }
    }
}

/// Audit record of a role configuration change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Tenant owning the role.
    pub tenant_id: TenantId,
    /// Administrator who made the change.
    pub actor_user_id: UserId,
    /// Role that was changed.
    pub role_name: RoleName,
    /// The change itself.
    pub change: RoleChange,
}

impl AuditEvent {
    /// Returns the stable audit action for this event.
    #[must_use]
    pub fn action(&self) -> AuditAction {
        self.change.action()
    }
}

/// Port for persisting append-only role audit events.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Persists one audit event.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;
}

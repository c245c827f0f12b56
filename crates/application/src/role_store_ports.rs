use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use rolegate_core::{AppResult, TenantId, UserId};
use rolegate_domain::{CustomRole, RoleName};

/// Mutation notice for one role configuration row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleConfigChanged {
    /// Tenant owning the mutated row.
    pub tenant_id: TenantId,
    /// Name of the mutated role.
    pub role_name: RoleName,
    /// Time the store applied the mutation.
    pub mutated_at: DateTime<Utc>,
}

/// Receiving half of a tenant-scoped role change subscription.
///
/// The stream ends when the store drops the sending half; consumers treat
/// that as a subscription failure.
pub type RoleChangeStream = mpsc::Receiver<RoleConfigChanged>;

/// Capacity used by stores when opening a change subscription channel.
pub const ROLE_CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Port for role assignments and role configuration rows.
///
/// Implementations own lookup timeouts; a timed out call returns an error.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Returns the role assigned to a member, if any.
    async fn get_assigned_role(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> AppResult<Option<RoleName>>;

    /// Returns the configuration row of a role, if any.
    async fn get_role_config(
        &self,
        tenant_id: TenantId,
        role_name: &RoleName,
    ) -> AppResult<Option<CustomRole>>;

    /// Lists every role configuration row of a tenant.
    async fn list_role_configs(&self, tenant_id: TenantId) -> AppResult<Vec<CustomRole>>;

    /// Inserts a new role row. Fails with `Conflict` when the name is taken.
    async fn insert_role_config(&self, role: CustomRole) -> AppResult<CustomRole>;

    /// Replaces an existing role row. Fails with `NotFound` when it is absent.
    async fn update_role_config(&self, role: CustomRole) -> AppResult<CustomRole>;

    /// Deletes a role row. Fails with `NotFound` when it is absent.
    async fn delete_role_config(&self, tenant_id: TenantId, role_name: &RoleName)
    -> AppResult<()>;

    /// Opens a stream of role row mutations for a tenant.
    async fn subscribe_role_config_changes(&self, tenant_id: TenantId)
    -> AppResult<RoleChangeStream>;
}

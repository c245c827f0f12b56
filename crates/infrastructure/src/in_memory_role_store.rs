use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{RwLock, mpsc};
use tracing::warn;

use rolegate_application::{
    ROLE_CHANGE_CHANNEL_CAPACITY, RoleChangeStream, RoleConfigChanged, RoleStore,
};
use rolegate_core::{AppError, AppResult, TenantId, UserId};
use rolegate_domain::{CustomRole, RoleName};

/// In-memory role store with in-process change fan-out.
///
/// Inserts, updates and deletes of role rows are published to every open
/// subscription of the owning tenant. A subscriber whose buffer is full is
/// disconnected rather than skipped, so its stream ends and the consumer
/// knows it missed changes.
#[derive(Debug, Default)]
pub struct InMemoryRoleStore {
    roles: RwLock<HashMap<(TenantId, RoleName), CustomRole>>,
    assignments: RwLock<HashMap<(UserId, TenantId), RoleName>>,
    subscribers: RwLock<HashMap<TenantId, Vec<mpsc::Sender<RoleConfigChanged>>>>,
}

impl InMemoryRoleStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a role to a member, replacing any previous assignment.
    pub async fn assign_role(&self, user_id: UserId, tenant_id: TenantId, role_name: RoleName) {
        self.assignments
            .write()
            .await
            .insert((user_id, tenant_id), role_name);
    }

    /// Removes a member's role assignment.
    pub async fn unassign_role(&self, user_id: UserId, tenant_id: TenantId) {
        self.assignments.write().await.remove(&(user_id, tenant_id));
    }

    async fn publish(&self, tenant_id: TenantId, role_name: &RoleName) {
        let mut subscribers = self.subscribers.write().await;
        let Some(senders) = subscribers.get_mut(&tenant_id) else {
            return;
        };

        let event = RoleConfigChanged {
            tenant_id,
            role_name: role_name.clone(),
            mutated_at: Utc::now(),
        };
        senders.retain(|sender| match sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(%tenant_id, "disconnecting lagging role change subscriber");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
        if senders.is_empty() {
            subscribers.remove(&tenant_id);
        }
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn get_assigned_role(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> AppResult<Option<RoleName>> {
        Ok(self
            .assignments
            .read()
            .await
            .get(&(user_id, tenant_id))
            .cloned())
    }

    async fn get_role_config(
        &self,
        tenant_id: TenantId,
        role_name: &RoleName,
    ) -> AppResult<Option<CustomRole>> {
        Ok(self
            .roles
            .read()
            .await
            .get(&(tenant_id, role_name.clone()))
            .cloned())
    }

    async fn list_role_configs(&self, tenant_id: TenantId) -> AppResult<Vec<CustomRole>> {
        let roles = self.roles.read().await;

        let mut values: Vec<CustomRole> = roles
            .iter()
            .filter_map(|((stored_tenant_id, _), role)| {
                (stored_tenant_id == &tenant_id).then_some(role.clone())
            })
            .collect();
        values.sort_by(|left, right| {
            left.display_order
                .cmp(&right.display_order)
                .then_with(|| left.role_name.cmp(&right.role_name))
        });

        Ok(values)
    }

    async fn insert_role_config(&self, role: CustomRole) -> AppResult<CustomRole> {
        let key = (role.tenant_id, role.role_name.clone());
        let mut roles = self.roles.write().await;

        if roles.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists for tenant '{}'",
                key.1, key.0
            )));
        }

        roles.insert(key, role.clone());
        drop(roles);

        self.publish(role.tenant_id, &role.role_name).await;
        Ok(role)
    }

    async fn update_role_config(&self, role: CustomRole) -> AppResult<CustomRole> {
        {
            let key = (role.tenant_id, role.role_name.clone());
            let mut roles = self.roles.write().await;
            let Some(stored) = roles.get_mut(&key) else {
                return Err(AppError::NotFound(format!(
                    "role '{}' does not exist for tenant '{}'",
                    key.1, key.0
                )));
            };
            *stored = role.clone();
        }

        self.publish(role.tenant_id, &role.role_name).await;
        Ok(role)
    }

    async fn delete_role_config(
        &self,
        tenant_id: TenantId,
        role_name: &RoleName,
    ) -> AppResult<()> {
        let removed = self
            .roles
            .write()
            .await
            .remove(&(tenant_id, role_name.clone()));
        if removed.is_none() {
            return Err(AppError::NotFound(format!(
                "role '{role_name}' does not exist for tenant '{tenant_id}'"
            )));
        }

        self.publish(tenant_id, role_name).await;
        Ok(())
    }

    async fn subscribe_role_config_changes(
        &self,
        tenant_id: TenantId,
    ) -> AppResult<RoleChangeStream> {
        let (sender, receiver) = mpsc::channel(ROLE_CHANGE_CHANNEL_CAPACITY);
        self.subscribers
            .write()
            .await
            .entry(tenant_id)
            .or_default()
            .push(sender);

        Ok(receiver)
    }
}

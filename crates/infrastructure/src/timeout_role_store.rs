use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use rolegate_application::{RoleChangeStream, RoleStore};
use rolegate_core::{AppError, AppResult, TenantId, UserId};
use rolegate_domain::{CustomRole, RoleName};

/// Role store decorator that bounds every call with a timeout.
///
/// A call that does not finish in time fails with `AppError::Unavailable`; the
/// resolver turns that into a deny-all resolution.
#[derive(Clone)]
pub struct TimeoutRoleStore {
    inner: Arc<dyn RoleStore>,
    timeout: Duration,
}

impl TimeoutRoleStore {
    /// Wraps a store with a per-call timeout.
    #[must_use]
    pub fn new(inner: Arc<dyn RoleStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = AppResult<T>> + Send,
    ) -> AppResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = self.timeout.as_millis();
                warn!(operation, timeout_ms, "role store call timed out");
                Err(AppError::Unavailable(format!(
                    "role store {operation} timed out after {timeout_ms} ms"
                )))
            }
        }
    }
}

#[async_trait]
impl RoleStore for TimeoutRoleStore {
    async fn get_assigned_role(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> AppResult<Option<RoleName>> {
        self.bounded(
            "get_assigned_role",
            self.inner.get_assigned_role(user_id, tenant_id),
        )
        .await
    }

    async fn get_role_config(
        &self,
        tenant_id: TenantId,
        role_name: &RoleName,
    ) -> AppResult<Option<CustomRole>> {
        self.bounded(
            "get_role_config",
            self.inner.get_role_config(tenant_id, role_name),
        )
        .await
    }

    async fn list_role_configs(&self, tenant_id: TenantId) -> AppResult<Vec<CustomRole>> {
        self.bounded("list_role_configs", self.inner.list_role_configs(tenant_id))
            .await
    }

    async fn insert_role_config(&self, role: CustomRole) -> AppResult<CustomRole> {
        self.bounded("insert_role_config", self.inner.insert_role_config(role))
            .await
    }

    async fn update_role_config(&self, role: CustomRole) -> AppResult<CustomRole> {
        self.bounded("update_role_config", self.inner.update_role_config(role))
            .await
    }

    async fn delete_role_config(
        &self,
        tenant_id: TenantId,
        role_name: &RoleName,
    ) -> AppResult<()> {
        self.bounded(
            "delete_role_config",
            self.inner.delete_role_config(tenant_id, role_name),
        )
        .await
    }

    async fn subscribe_role_config_changes(
        &self,
        tenant_id: TenantId,
    ) -> AppResult<RoleChangeStream> {
        self.bounded(
            "subscribe_role_config_changes",
            self.inner.subscribe_role_config_changes(tenant_id),
        )
        .await
    }
}

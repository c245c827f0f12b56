use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

use rolegate_core::{AppError, SessionSnapshot, TenantId, UserId};
use rolegate_domain::RoleName;

use crate::{ResolvedPermissionState, RoleStore};

/// Reasons a resolution fell back to deny-all. Logged, never returned.
#[derive(Debug, Error)]
enum ResolutionFailure {
    #[error("no authenticated user, tenant or tier in session")]
    NoSession,
    #[error("assigned role lookup failed: {0}")]
    RoleLookupFailed(AppError),
    #[error("role '{0}' has no configuration row")]
    RoleConfigMissing(RoleName),
    #[error("role configuration lookup failed: {0}")]
    RoleConfigLookupFailed(AppError),
}

/// Maps a session to its resolved permission state.
///
/// Resolution never fails: every store error, timeout or missing row is
/// absorbed and turned into a deny-all state.
#[derive(Clone)]
pub struct PermissionResolver {
    store: Arc<dyn RoleStore>,
}

impl PermissionResolver {
    /// Creates a resolver over a role store.
    #[must_use]
    pub fn new(store: Arc<dyn RoleStore>) -> Self {
        Self { store }
    }

    /// Returns the role store backing this resolver.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RoleStore> {
        &self.store
    }

    /// Resolves permissions for the session's user in the session's tenant.
    pub async fn resolve(&self, session: &SessionSnapshot) -> ResolvedPermissionState {
        let (Some((user_id, tenant_id)), Some(tier)) = (session.context(), session.tier) else {
            debug!(reason = %ResolutionFailure::NoSession, "resolved deny-all permissions");
            return ResolvedPermissionState::deny_all(Utc::now());
        };

        if tier.bypasses_role_configuration() {
            debug!(%tenant_id, %user_id, tier = %tier, "resolved tier grant");
            return ResolvedPermissionState::tier_grant(tier, Utc::now());
        }

        self.resolve_member(user_id, tenant_id).await
    }

    /// Returns the role currently assigned to a member, defaulting to `Employee`.
    ///
    /// A failed lookup also falls back to the default role; the default is a
    /// lookup continuation and grants nothing by itself.
    pub async fn assigned_role(&self, user_id: UserId, tenant_id: TenantId) -> RoleName {
        match self.store.get_assigned_role(user_id, tenant_id).await {
            Ok(Some(role_name)) => role_name,
            Ok(None) => RoleName::default_role(),
            Err(error) => {
                warn!(
                    %tenant_id,
                    %user_id,
                    reason = %ResolutionFailure::RoleLookupFailed(error),
                    "falling back to default role"
                );
                RoleName::default_role()
            }
        }
    }

    async fn resolve_member(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> ResolvedPermissionState {
        let role_name = self.assigned_role(user_id, tenant_id).await;

        match self.member_state(tenant_id, &role_name).await {
            Ok(state) => {
                debug!(%tenant_id, %user_id, %role_name, "resolved member permissions");
                state
            }
            Err(failure) => {
                warn!(
                    %tenant_id,
                    %user_id,
                    %role_name,
                    reason = %failure,
                    "resolved deny-all permissions"
                );
                ResolvedPermissionState::member_denied(&role_name, Utc::now())
            }
        }
    }

    async fn member_state(
        &self,
        tenant_id: TenantId,
        role_name: &RoleName,
    ) -> Result<ResolvedPermissionState, ResolutionFailure> {
        let role = self
            .store
            .get_role_config(tenant_id, role_name)
            .await
            .map_err(ResolutionFailure::RoleConfigLookupFailed)?
            .ok_or_else(|| ResolutionFailure::RoleConfigMissing(role_name.clone()))?;

        Ok(ResolvedPermissionState::member(
            role_name,
            role.legacy_permissions.with_extended_granted(),
            role.detailed_permissions,
            Utc::now(),
        ))
    }
}

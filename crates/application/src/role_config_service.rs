use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use rolegate_core::{AppError, SessionSnapshot, TenantId, UserId};
use rolegate_domain::{
    CustomRole, DEFAULT_DISPLAY_ORDER, DetailedPermission, LegacyPermission,
    PREDEFINED_ROLE_NAMES, PermissionCategory, RoleName,
};

use crate::{AuditEvent, AuditRepository, PermissionResolver, RoleChange, RoleStore};

/// Typed failures of role configuration edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleEditorError {
    /// A role with the same name already exists in the tenant.
    #[error("role '{0}' already exists")]
    DuplicateRole(String),
    /// Predefined roles cannot be deleted.
    #[error("role '{0}' is predefined and cannot be deleted")]
    ProtectedRole(String),
    /// The category is not part of the permission schema.
    #[error("unknown permission category '{0}'")]
    UnknownCategory(String),
    /// The key is not part of the permission schema or is not configurable.
    #[error("unknown permission key '{0}'")]
    UnknownKey(String),
    /// No role with this name exists in the tenant.
    #[error("role '{0}' does not exist")]
    RoleNotFound(String),
    /// The role name is empty after trimming.
    #[error("invalid role name: {0}")]
    InvalidRoleName(String),
    /// The acting session may not manage roles.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// The role store or audit sink failed.
    #[error(transparent)]
    Store(AppError),
}

impl From<RoleEditorError> for AppError {
    fn from(value: RoleEditorError) -> Self {
        match value {
            RoleEditorError::DuplicateRole(_) => Self::Conflict(value.to_string()),
            RoleEditorError::ProtectedRole(_) | RoleEditorError::Forbidden(_) => {
                Self::Forbidden(value.to_string())
            }
            RoleEditorError::UnknownCategory(_)
            | RoleEditorError::UnknownKey(_)
            | RoleEditorError::InvalidRoleName(_) => Self::Validation(value.to_string()),
            RoleEditorError::RoleNotFound(_) => Self::NotFound(value.to_string()),
            RoleEditorError::Store(error) => error,
        }
    }
}

/// Result type of role configuration edits.
pub type RoleEditorResult<T> = Result<T, RoleEditorError>;

/// Actor resolved for an editor call.
struct EditorActor {
    tenant_id: TenantId,
    user_id: UserId,
}

/// Validated create, update and delete of tenant role configuration.
///
/// Every successful mutation is written through the role store, which
/// publishes the change to subscribed sessions, and is then audited.
#[derive(Clone)]
pub struct RoleConfigService {
    store: Arc<dyn RoleStore>,
    resolver: PermissionResolver,
    audit_repository: Arc<dyn AuditRepository>,
}

impl RoleConfigService {
    /// Creates a new role configuration service.
    #[must_use]
    pub fn new(
        store: Arc<dyn RoleStore>,
        resolver: PermissionResolver,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            store,
            resolver,
            audit_repository,
        }
    }

    /// Lists tenant roles ordered by display order, then name.
    pub async fn list_roles(&self, actor: &SessionSnapshot) -> RoleEditorResult<Vec<CustomRole>> {
        let actor = self.require_role_management(actor).await?;
        let mut roles = self
            .store
            .list_role_configs(actor.tenant_id)
            .await
            .map_err(RoleEditorError::Store)?;
        roles.sort_by(|left, right| {
            left.display_order
                .cmp(&right.display_order)
                .then_with(|| left.role_name.cmp(&right.role_name))
        });
        Ok(roles)
    }

    /// Creates a custom role with every permission denied.
    pub async fn create_role(
        &self,
        actor: &SessionSnapshot,
        name: &str,
        description: &str,
    ) -> RoleEditorResult<CustomRole> {
        let actor = self.require_role_management(actor).await?;
        let role_name = RoleName::new(name)
            .map_err(|error| RoleEditorError::InvalidRoleName(error.to_string()))?;

        let existing = self
            .store
            .list_role_configs(actor.tenant_id)
            .await
            .map_err(RoleEditorError::Store)?;
        if existing.iter().any(|role| role.role_name == role_name) {
            return Err(RoleEditorError::DuplicateRole(role_name.to_string()));
        }
        let display_order = existing
            .iter()
            .map(|role| role.display_order)
            .fold(DEFAULT_DISPLAY_ORDER - 1, i32::max)
            + 1;

        let role = CustomRole::new_custom(
            actor.tenant_id,
            role_name,
            description.trim(),
            display_order,
            Utc::now(),
        );
        let role = self
            .store
            .insert_role_config(role)
            .await
            .map_err(|error| match error {
                AppError::Conflict(_) => RoleEditorError::DuplicateRole(name.trim().to_owned()),
                other => RoleEditorError::Store(other),
            })?;

        self.audit(&actor, &role.role_name, RoleChange::Created).await?;
        info!(tenant_id = %actor.tenant_id, role_name = %role.role_name, "custom role created");

        Ok(role)
    }

    /// Sets one detailed permission of a role.
    pub async fn update_detailed_permission(
        &self,
        actor: &SessionSnapshot,
        role_name: &str,
        category: &str,
        key: &str,
        value: bool,
    ) -> RoleEditorResult<CustomRole> {
        let actor = self.require_role_management(actor).await?;
        let category = category
            .parse::<PermissionCategory>()
            .map_err(|_| RoleEditorError::UnknownCategory(category.to_owned()))?;
        let permission = DetailedPermission::from_parts(category, key)
            .ok_or_else(|| RoleEditorError::UnknownKey(format!("{}.{key}", category.as_str())))?;

        let mut role = self.load_role(&actor, role_name).await?;
        role.detailed_permissions.set(permission, value);
        let role = self.save(role).await?;

        self.audit(
            &actor,
            &role.role_name,
            RoleChange::DetailedPermission {
                permission,
                granted: value,
            },
        )
        .await?;

        Ok(role)
    }

    /// Sets one configurable legacy flag of a role.
    ///
    /// Extended flags are granted to every member unconditionally and are not
    /// configurable, so they are rejected as unknown keys.
    pub async fn update_legacy_permission(
        &self,
        actor: &SessionSnapshot,
        role_name: &str,
        key: &str,
        value: bool,
    ) -> RoleEditorResult<CustomRole> {
        let actor = self.require_role_management(actor).await?;
        let permission = key
            .parse::<LegacyPermission>()
            .ok()
            .filter(LegacyPermission::is_configurable)
            .ok_or_else(|| RoleEditorError::UnknownKey(key.to_owned()))?;

        let mut role = self.load_role(&actor, role_name).await?;
        role.legacy_permissions.set(permission, value);
        let role = self.save(role).await?;

        self.audit(
            &actor,
            &role.role_name,
            RoleChange::LegacyPermission {
                permission,
                granted: value,
            },
        )
        .await?;

        Ok(role)
    }

    /// Replaces the description of a role.
    pub async fn update_description(
        &self,
        actor: &SessionSnapshot,
        role_name: &str,
        description: &str,
    ) -> RoleEditorResult<CustomRole> {
        let actor = self.require_role_management(actor).await?;
        let mut role = self.load_role(&actor, role_name).await?;
        role.description = description.trim().to_owned();
        let role = self.save(role).await?;

        self.audit(
            &actor,
            &role.role_name,
            RoleChange::Description(role.description.clone()),
        )
        .await?;

        Ok(role)
    }

    /// Deletes a custom role.
    ///
    /// Members still assigned to the role re-resolve to deny-all.
    pub async fn delete_role(
        &self,
        actor: &SessionSnapshot,
        role_name: &str,
    ) -> RoleEditorResult<()> {
        let actor = self.require_role_management(actor).await?;
        let role = self.load_role(&actor, role_name).await?;
        if role.is_predefined {
            return Err(RoleEditorError::ProtectedRole(role.role_name.to_string()));
        }

        self.store
            .delete_role_config(actor.tenant_id, &role.role_name)
            .await
            .map_err(|error| match error {
                AppError::NotFound(_) => RoleEditorError::RoleNotFound(role.role_name.to_string()),
                other => RoleEditorError::Store(other),
            })?;

        self.audit(&actor, &role.role_name, RoleChange::Deleted).await?;
        info!(tenant_id = %actor.tenant_id, role_name = %role.role_name, "custom role deleted");

        Ok(())
    }

    /// Creates every predefined role missing from the tenant.
    ///
    /// Existing rows, predefined or not, are left untouched. Returns the rows
    /// that were created.
    pub async fn ensure_predefined_roles(
        &self,
        actor: &SessionSnapshot,
    ) -> RoleEditorResult<Vec<CustomRole>> {
        let actor = self.require_role_management(actor).await?;
        let existing = self
            .store
            .list_role_configs(actor.tenant_id)
            .await
            .map_err(RoleEditorError::Store)?;

        let mut created = Vec::new();
        for name in PREDEFINED_ROLE_NAMES {
            let role_name = RoleName::new(*name).map_err(RoleEditorError::Store)?;
            if existing.iter().any(|role| role.role_name == role_name) {
                continue;
            }

            let role = CustomRole::new_predefined(actor.tenant_id, role_name, Utc::now());
            match self.store.insert_role_config(role).await {
                Ok(role) => created.push(role),
                Err(AppError::Conflict(_)) => continue,
                Err(error) => return Err(RoleEditorError::Store(error)),
            }
        }

        if !created.is_empty() {
            info!(
                tenant_id = %actor.tenant_id,
                created = created.len(),
                "predefined roles created"
            );
        }

        Ok(created)
    }

    async fn require_role_management(
        &self,
        actor: &SessionSnapshot,
    ) -> RoleEditorResult<EditorActor> {
        let Some((user_id, tenant_id)) = actor.context() else {
            return Err(RoleEditorError::Forbidden(
                "an authenticated tenant member is required".to_owned(),
            ));
        };

        let permissions = self.resolver.resolve(actor).await;
        if !permissions.has_detailed_permission(DetailedPermission::SettingsUserRoleManagement) {
            return Err(RoleEditorError::Forbidden(format!(
                "user '{user_id}' may not manage roles in tenant '{tenant_id}'"
            )));
        }

        Ok(EditorActor { tenant_id, user_id })
    }

    async fn load_role(
        &self,
        actor: &EditorActor,
        role_name: &str,
    ) -> RoleEditorResult<CustomRole> {
        let role_name = RoleName::new(role_name)
            .map_err(|_| RoleEditorError::RoleNotFound(role_name.to_owned()))?;

        self.store
            .get_role_config(actor.tenant_id, &role_name)
            .await
            .map_err(RoleEditorError::Store)?
            .ok_or_else(|| RoleEditorError::RoleNotFound(role_name.to_string()))
    }

    async fn save(&self, mut role: CustomRole) -> RoleEditorResult<CustomRole> {
        role.updated_at = Utc::now();
        let role_name = role.role_name.to_string();

        self.store
            .update_role_config(role)
            .await
            .map_err(|error| match error {
                AppError::NotFound(_) => RoleEditorError::RoleNotFound(role_name),
                other => RoleEditorError::Store(other),
            })
    }

    async fn audit(
        &self,
        actor: &EditorActor,
        role_name: &RoleName,
        change: RoleChange,
    ) -> RoleEditorResult<()> {
        self.audit_repository
            .append_event(AuditEvent {
                tenant_id: actor.tenant_id,
                actor_user_id: actor.user_id,
                role_name: role_name.clone(),
                change,
            })
            .await
            .map_err(RoleEditorError::Store)
    }
}

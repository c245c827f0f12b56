use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use sqlx::postgres::{PgListener, PgNotification};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use rolegate_application::{
    ROLE_CHANGE_CHANNEL_CAPACITY, RoleChangeStream, RoleConfigChanged, RoleStore,
};
use rolegate_core::{AppError, AppResult, TenantId, UserId};
use rolegate_domain::{CustomRole, DetailedBitSet, LegacyBitSet, RoleId, RoleName};

/// Notification channel fed by the `custom_roles` change trigger.
pub const ROLE_CHANGE_CHANNEL: &str = "custom_role_changes";

/// PostgreSQL-backed role store.
///
/// Change subscriptions use one `LISTEN` connection each, filtered to the
/// subscribed tenant.
#[derive(Clone)]
pub struct PostgresRoleStore {
    pool: PgPool,
}

impl PostgresRoleStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Assigns a role to a member, replacing any previous assignment.
    pub async fn assign_role(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
        role_name: &RoleName,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO team_members (user_id, company_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, company_id) DO UPDATE SET role = EXCLUDED.role
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(tenant_id.as_uuid())
        .bind(role_name.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to assign member role: {error}")))?;

        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct CustomRoleRow {
    id: Uuid,
    company_id: Uuid,
    role_name: String,
    permissions: Value,
    detailed_permissions: Value,
    description: String,
    is_predefined: bool,
    display_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RoleChangePayload {
    company_id: Uuid,
    role_name: String,
    mutated_at: DateTime<Utc>,
}

fn role_from_row(row: CustomRoleRow) -> AppResult<CustomRole> {
    if !row.permissions.is_object() {
        warn!(role_id = %row.id, "legacy permissions column is not an object; denying all");
    }
    if !row.detailed_permissions.is_object() {
        warn!(role_id = %row.id, "detailed permissions column is not an object; denying all");
    }

    let role_name = RoleName::new(row.role_name).map_err(|error| {
        AppError::Internal(format!("persisted role '{}' has an invalid name: {error}", row.id))
    })?;

    Ok(CustomRole {
        id: RoleId::from_uuid(row.id),
        tenant_id: TenantId::from_uuid(row.company_id),
        role_name,
        legacy_permissions: LegacyBitSet::from(row.permissions),
        detailed_permissions: DetailedBitSet::from(row.detailed_permissions),
        description: row.description,
        is_predefined: row.is_predefined,
        display_order: row.display_order,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn legacy_column(bit_set: LegacyBitSet) -> Json<BTreeMap<String, bool>> {
    Json(bit_set.into())
}

fn detailed_column(bit_set: DetailedBitSet) -> Json<BTreeMap<String, BTreeMap<String, bool>>> {
    Json(bit_set.into())
}

fn change_from_notification(
    notification: &PgNotification,
    tenant_id: TenantId,
) -> Option<RoleConfigChanged> {
    let payload = match serde_json::from_str::<RoleChangePayload>(notification.payload()) {
        Ok(payload) => payload,
        Err(error) => {
            warn!(%error, "ignoring malformed role change notification");
            return None;
        }
    };
    if payload.company_id != tenant_id.as_uuid() {
        return None;
    }

    let role_name = match RoleName::new(payload.role_name) {
        Ok(role_name) => role_name,
        Err(error) => {
            warn!(%error, "ignoring role change notification with invalid role name");
            return None;
        }
    };

    Some(RoleConfigChanged {
        tenant_id,
        role_name,
        mutated_at: payload.mutated_at,
    })
}

async fn forward_changes(
    mut listener: PgListener,
    tenant_id: TenantId,
    sender: mpsc::Sender<RoleConfigChanged>,
) {
    loop {
        let notification = tokio::select! {
            () = sender.closed() => {
                debug!(%tenant_id, "role change subscriber dropped");
                return;
            }
            received = listener.recv() => received,
        };

        let notification = match notification {
            Ok(notification) => notification,
            Err(error) => {
                warn!(%tenant_id, %error, "role change listener failed");
                return;
            }
        };

        let Some(change) = change_from_notification(&notification, tenant_id) else {
            continue;
        };
        if sender.send(change).await.is_err() {
            return;
        }
    }
}

#[async_trait]
impl RoleStore for PostgresRoleStore {
    async fn get_assigned_role(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> AppResult<Option<RoleName>> {
        let row = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT role
            FROM team_members
            WHERE user_id = $1 AND company_id = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(tenant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read member role: {error}")))?;

        // Blank assignments count as unassigned.
        Ok(row
            .and_then(|row| row.role)
            .and_then(|role| RoleName::new(role).ok()))
    }

    async fn get_role_config(
        &self,
        tenant_id: TenantId,
        role_name: &RoleName,
    ) -> AppResult<Option<CustomRole>> {
        let row = sqlx::query_as::<_, CustomRoleRow>(
            r#"
            SELECT id, company_id, role_name, permissions, detailed_permissions,
                   description, is_predefined, display_order, created_at, updated_at
            FROM custom_roles
            WHERE company_id = $1 AND role_name = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_name.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read role config: {error}")))?;

        row.map(role_from_row).transpose()
    }

    async fn list_role_configs(&self, tenant_id: TenantId) -> AppResult<Vec<CustomRole>> {
        let rows = sqlx::query_as::<_, CustomRoleRow>(
            r#"
            SELECT id, company_id, role_name, permissions, detailed_permissions,
                   description, is_predefined, display_order, created_at, updated_at
            FROM custom_roles
            WHERE company_id = $1
            ORDER BY display_order, role_name
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list role configs: {error}")))?;

        rows.into_iter().map(role_from_row).collect()
    }

    async fn insert_role_config(&self, role: CustomRole) -> AppResult<CustomRole> {
        let result = sqlx::query(
            r#"
            INSERT INTO custom_roles (
                id,
                company_id,
                role_name,
                permissions,
                detailed_permissions,
                description,
                is_predefined,
                display_order,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(role.id.as_uuid())
        .bind(role.tenant_id.as_uuid())
        .bind(role.role_name.as_str())
        .bind(legacy_column(role.legacy_permissions))
        .bind(detailed_column(role.detailed_permissions))
        .bind(role.description.as_str())
        .bind(role.is_predefined)
        .bind(role.display_order)
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(role),
            Err(error) => {
                if let sqlx::Error::Database(database_error) = &error
                    && database_error.code().as_deref() == Some("23505")
                {
                    return Err(AppError::Conflict(format!(
                        "role '{}' already exists for tenant '{}'",
                        role.role_name, role.tenant_id
                    )));
                }

                Err(AppError::Internal(format!(
                    "failed to insert role config: {error}"
                )))
            }
        }
    }

    async fn update_role_config(&self, role: CustomRole) -> AppResult<CustomRole> {
        let result = sqlx::query(
            r#"
            UPDATE custom_roles
            SET permissions = $3,
                detailed_permissions = $4,
                description = $5,
                display_order = $6,
                updated_at = $7
            WHERE company_id = $1 AND role_name = $2
            "#,
        )
        .bind(role.tenant_id.as_uuid())
        .bind(role.role_name.as_str())
        .bind(legacy_column(role.legacy_permissions))
        .bind(detailed_column(role.detailed_permissions))
        .bind(role.description.as_str())
        .bind(role.display_order)
        .bind(role.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update role config: {error}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "role '{}' does not exist for tenant '{}'",
                role.role_name, role.tenant_id
            )));
        }

        Ok(role)
    }

    async fn delete_role_config(
        &self,
        tenant_id: TenantId,
        role_name: &RoleName,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM custom_roles
            WHERE company_id = $1 AND role_name = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_name.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete role config: {error}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "role '{role_name}' does not exist for tenant '{tenant_id}'"
            )));
        }

        Ok(())
    }

    async fn subscribe_role_config_changes(
        &self,
        tenant_id: TenantId,
    ) -> AppResult<RoleChangeStream> {
        let mut listener = PgListener::connect_with(&self.pool).await.map_err(|error| {
            AppError::Unavailable(format!("failed to open role change listener: {error}"))
        })?;
        listener.listen(ROLE_CHANGE_CHANNEL).await.map_err(|error| {
            AppError::Unavailable(format!("failed to listen for role changes: {error}"))
        })?;

        let (sender, receiver) = mpsc::channel(ROLE_CHANGE_CHANNEL_CAPACITY);
        tokio::spawn(forward_changes(listener, tenant_id, sender));

        Ok(receiver)
    }
}

use async_trait::async_trait;
use sqlx::PgPool;

use rolegate_application::{AuditEvent, AuditRepository, RoleChange};
use rolegate_core::{AppError, AppResult};

/// PostgreSQL-backed append-only audit trail of role editor changes.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Nullable detail columns of one `role_audit_events` row.
#[derive(Debug, Default, PartialEq, Eq)]
struct ChangeColumns<'a> {
    permission_category: Option<&'static str>,
    permission_key: Option<&'static str>,
    granted: Option<bool>,
    description: Option<&'a str>,
}

impl<'a> From<&'a RoleChange> for ChangeColumns<'a> {
    fn from(change: &'a RoleChange) -> Self {
        match change {
            RoleChange::Created | RoleChange::Deleted => Self::default(),
            RoleChange::DetailedPermission {
                permission,
                granted,
            } => Self {
                permission_category: Some(permission.category().as_str()),
                permission_key: Some(permission.key()),
                granted: Some(*granted),
                description: None,
            },
            RoleChange::LegacyPermission {
                permission,
                granted,
            } => Self {
                permission_key: Some(permission.as_str()),
                granted: Some(*granted),
                ..Self::default()
            },
            RoleChange::Description(text) => Self {
                description: Some(text.as_str()),
                ..Self::default()
            },
        }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        let columns = ChangeColumns::from(&event.change);

        sqlx::query(
            r#"
            INSERT INTO role_audit_events (
                company_id,
                actor_user_id,
                role_name,
                action,
                permission_category,
                permission_key,
                granted,
                description
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.tenant_id.as_uuid())
        .bind(event.actor_user_id.as_uuid())
        .bind(event.role_name.as_str())
        .bind(event.action().as_str())
        .bind(columns.permission_category)
        .bind(columns.permission_key)
        .bind(columns.granted)
        .bind(columns.description)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to append audit event for role '{}': {error}",
                event.role_name
            ))
        })?;

        Ok(())
    }
}

use std::sync::Arc;

use rolegate_application::{
    AuditRepository, PermissionResolver, RoleChangeNotifier, RoleConfigService, RoleStore,
    SubscriptionRetryPolicy,
};
use rolegate_core::{AppError, AppResult, TenantId, UserId};
use rolegate_domain::RoleName;
use rolegate_infrastructure::{
    InMemoryAuditRepository, InMemoryRoleStore, PostgresAuditRepository, PostgresRoleStore,
    TimeoutRoleStore,
};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::api_config::ApiConfig;
use crate::state::AppState;

/// Concrete role store behind the timeout decorator.
pub enum RoleStoreBackend {
    InMemory(Arc<InMemoryRoleStore>),
    Postgres(PostgresRoleStore),
}

impl RoleStoreBackend {
    /// Writes a member assignment. Assignments are owned by the membership
    /// system, so only seeding uses this.
    pub async fn assign_role(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
        role_name: &RoleName,
    ) -> AppResult<()> {
        match self {
            Self::InMemory(store) => {
                store.assign_role(user_id, tenant_id, role_name.clone()).await;
                Ok(())
            }
            Self::Postgres(store) => store.assign_role(user_id, tenant_id, role_name).await,
        }
    }

    fn role_store(&self) -> Arc<dyn RoleStore> {
        match self {
            Self::InMemory(store) => store.clone(),
            Self::Postgres(store) => Arc::new(store.clone()),
        }
    }
}

pub struct ApiServices {
    pub state: AppState,
    pub backend: RoleStoreBackend,
}

pub async fn build_api_services(config: &ApiConfig) -> AppResult<ApiServices> {
    let (backend, audit_repository): (RoleStoreBackend, Arc<dyn AuditRepository>) =
        match &config.database_url {
            Some(database_url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(database_url)
                    .await
                    .map_err(|error| {
                        AppError::Internal(format!("failed to connect to database: {error}"))
                    })?;

                sqlx::migrate!("../../crates/infrastructure/migrations")
                    .run(&pool)
                    .await
                    .map_err(|error| {
                        AppError::Internal(format!("failed to run migrations: {error}"))
                    })?;
                info!("using postgres role store");

                (
                    RoleStoreBackend::Postgres(PostgresRoleStore::new(pool.clone())),
                    Arc::new(PostgresAuditRepository::new(pool)),
                )
            }
            None => {
                info!("DATABASE_URL not set, using in-memory role store");
                (
                    RoleStoreBackend::InMemory(Arc::new(InMemoryRoleStore::new())),
                    Arc::new(InMemoryAuditRepository::new()),
                )
            }
        };

    let store: Arc<dyn RoleStore> = Arc::new(TimeoutRoleStore::new(
        backend.role_store(),
        config.role_store_timeout,
    ));

    Ok(ApiServices {
        state: build_app_state(store, audit_repository, config.subscription_retry),
        backend,
    })
}

pub fn build_app_state(
    store: Arc<dyn RoleStore>,
    audit_repository: Arc<dyn AuditRepository>,
    retry_policy: SubscriptionRetryPolicy,
) -> AppState {
    let resolver = PermissionResolver::new(store.clone());
    let notifier = RoleChangeNotifier::new(store.clone(), retry_policy);
    let role_config_service = RoleConfigService::new(store, resolver.clone(), audit_repository);

    AppState {
        resolver,
        notifier,
        role_config_service,
    }
}

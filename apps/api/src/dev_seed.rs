use rolegate_application::{RoleConfigService, RoleEditorError};
use rolegate_core::{AppError, AppResult, SessionSnapshot, TenantId, Tier, UserId};
use rolegate_domain::RoleName;
use tracing::info;
use uuid::Uuid;

use crate::api_services::RoleStoreBackend;

const DEV_SEED_TENANT_ID: &str = "11111111-1111-1111-1111-111111111111";
const DEV_SEED_ADMIN_USER_ID: &str = "a2c8ea5f-4f39-4724-97f5-932f97f54f76";
const DEV_SEED_STANDARD_USER_ID: &str = "96d11e90-7403-4654-9727-cb1043f8bd31";
const DEV_SEED_INSPECTOR_USER_ID: &str = "4b0f3d1e-2f7a-4c55-9c1b-7d3e8a6f5b20";
const DEV_SEED_INSPECTOR_ROLE: &str = "Inspector";

/// Legacy flags granted to the seeded predefined `Employee` role.
const EMPLOYEE_LEGACY_FLAGS: &[&str] = &["dashboard", "documents"];
/// Detailed flags granted to the seeded predefined `Employee` role.
const EMPLOYEE_DETAILED_FLAGS: &[(&str, &str)] = &[
    ("documents", "view"),
    ("health_examinations", "view_own"),
    ("standard", "collaborate_on_cases"),
];

const INSPECTOR_LEGACY_FLAGS: &[&str] = &["dashboard", "audits", "reports"];
const INSPECTOR_DETAILED_FLAGS: &[(&str, &str)] = &[
    ("audits", "view"),
    ("audits", "create_edit"),
    ("audits", "assign_corrective_actions"),
    ("reports", "view"),
];

/// Seeds a demo tenant with predefined roles, one custom role and member
/// assignments. Safe to run repeatedly.
pub async fn run(service: &RoleConfigService, backend: &RoleStoreBackend) -> AppResult<()> {
    let tenant_id =
        TenantId::from_uuid(parse_uuid_const(DEV_SEED_TENANT_ID, "DEV_SEED_TENANT_ID")?);
    let admin = SessionSnapshot::authenticated(
        UserId::from_uuid(parse_uuid_const(DEV_SEED_ADMIN_USER_ID, "DEV_SEED_ADMIN_USER_ID")?),
        tenant_id,
        Tier::TenantAdmin,
    );

    let created = service.ensure_predefined_roles(&admin).await?;
    let default_role = RoleName::default_role();
    if created.iter().any(|role| role.role_name == default_role) {
        grant_flags(
            service,
            &admin,
            default_role.as_str(),
            EMPLOYEE_LEGACY_FLAGS,
            EMPLOYEE_DETAILED_FLAGS,
        )
        .await?;
    }

    match service
        .create_role(
            &admin,
            DEV_SEED_INSPECTOR_ROLE,
            "Runs site audits and follows up on corrective actions",
        )
        .await
    {
        Ok(_) => {
            grant_flags(
                service,
                &admin,
                DEV_SEED_INSPECTOR_ROLE,
                INSPECTOR_LEGACY_FLAGS,
                INSPECTOR_DETAILED_FLAGS,
            )
            .await?;
        }
        Err(RoleEditorError::DuplicateRole(_)) => {}
        Err(error) => return Err(error.into()),
    }

    let standard_user_id = UserId::from_uuid(parse_uuid_const(
        DEV_SEED_STANDARD_USER_ID,
        "DEV_SEED_STANDARD_USER_ID",
    )?);
    let inspector_user_id = UserId::from_uuid(parse_uuid_const(
        DEV_SEED_INSPECTOR_USER_ID,
        "DEV_SEED_INSPECTOR_USER_ID",
    )?);
    backend
        .assign_role(standard_user_id, tenant_id, &default_role)
        .await?;
    backend
        .assign_role(
            inspector_user_id,
            tenant_id,
            &RoleName::new(DEV_SEED_INSPECTOR_ROLE)?,
        )
        .await?;

    info!(
        %tenant_id,
        admin_user_id = DEV_SEED_ADMIN_USER_ID,
        standard_user_id = DEV_SEED_STANDARD_USER_ID,
        inspector_user_id = DEV_SEED_INSPECTOR_USER_ID,
        "dev seed applied"
    );

    Ok(())
}

async fn grant_flags(
    service: &RoleConfigService,
    admin: &SessionSnapshot,
    role_name: &str,
    legacy: &[&str],
    detailed: &[(&str, &str)],
) -> AppResult<()> {
    for key in legacy {
        service
            .update_legacy_permission(admin, role_name, key, true)
            .await?;
    }
    for (category, key) in detailed {
        service
            .update_detailed_permission(admin, role_name, category, key, true)
            .await?;
    }

    Ok(())
}

fn parse_uuid_const(value: &str, name: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|error| AppError::Internal(format!("invalid {name} constant: {error}")))
}

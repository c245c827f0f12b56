use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;

use rolegate_core::SessionSnapshot;

use crate::dto::{
    CreateRoleRequest, RoleResponse, UpdateDescriptionRequest, UpdateDetailedPermissionRequest,
    UpdateLegacyPermissionRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_roles_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionSnapshot>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .role_config_service
        .list_roles(&session)
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionSnapshot>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let role = state
        .role_config_service
        .create_role(&session, payload.name.as_str(), payload.description.as_str())
        .await?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

pub async fn update_detailed_permission_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionSnapshot>,
    Path(role_name): Path<String>,
    Json(payload): Json<UpdateDetailedPermissionRequest>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .role_config_service
        .update_detailed_permission(
            &session,
            role_name.as_str(),
            payload.category.as_str(),
            payload.key.as_str(),
            payload.value,
        )
        .await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn update_legacy_permission_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionSnapshot>,
    Path(role_name): Path<String>,
    Json(payload): Json<UpdateLegacyPermissionRequest>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .role_config_service
        .update_legacy_permission(
            &session,
            role_name.as_str(),
            payload.key.as_str(),
            payload.value,
        )
        .await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn update_description_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionSnapshot>,
    Path(role_name): Path<String>,
    Json(payload): Json<UpdateDescriptionRequest>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .role_config_service
        .update_description(&session, role_name.as_str(), payload.description.as_str())
        .await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn delete_role_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionSnapshot>,
    Path(role_name): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .role_config_service
        .delete_role(&session, role_name.as_str())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn ensure_predefined_roles_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionSnapshot>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let created = state
        .role_config_service
        .ensure_predefined_roles(&session)
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(created))
}

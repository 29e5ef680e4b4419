use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use strollup_application::{AdminError, RoleAdminService};
use strollup_domain::{Permission, RoleId};

use crate::dto::{
    CreateRoleRequest, NoticeResponse, RenameRoleRequest, RoleResponse, SetRolePermissionRequest,
    SetUserActiveRequest, SetUserRolesRequest, UserResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

/// Reloads administration data; an in-flight write keeps the current view.
async fn reload(service: &RoleAdminService) -> ApiResult<()> {
    match service.load().await {
        Ok(()) | Err(AdminError::AlreadySaving(_)) => Ok(()),
        Err(error) => Err(error.into()),
    }
}

fn role_id(value: String) -> ApiResult<RoleId> {
    Ok(RoleId::from_stored(value)?)
}

pub async fn list_roles_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    reload(&state.role_admin_service).await?;
    let roles = state
        .role_admin_service
        .roles()
        .await
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    reload(&state.role_admin_service).await?;
    let role = state
        .role_admin_service
        .create_role(payload.name.as_str())
        .await?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from(&role))))
}

pub async fn set_role_permission_handler(
    State(state): State<AppState>,
    Path((role_id_value, permission)): Path<(String, String)>,
    Json(payload): Json<SetRolePermissionRequest>,
) -> ApiResult<StatusCode> {
    let role_id = role_id(role_id_value)?;
    let permission = Permission::from_transport(permission.as_str())?;

    reload(&state.role_admin_service).await?;
    state
        .role_admin_service
        .set_role_permission(&role_id, permission, payload.granted)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn rename_role_handler(
    State(state): State<AppState>,
    Path(role_id_value): Path<String>,
    Json(payload): Json<RenameRoleRequest>,
) -> ApiResult<StatusCode> {
    let role_id = role_id(role_id_value)?;

    reload(&state.role_admin_service).await?;
    state
        .role_admin_service
        .rename_role(&role_id, payload.name.as_str())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_role_handler(
    State(state): State<AppState>,
    Path(role_id_value): Path<String>,
) -> ApiResult<StatusCode> {
    let role_id = role_id(role_id_value)?;

    reload(&state.role_admin_service).await?;
    state.role_admin_service.delete_role(&role_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_users_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<UserResponse>>> {
    reload(&state.role_admin_service).await?;
    let users = state
        .role_admin_service
        .users()
        .await
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(users))
}

pub async fn set_user_roles_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<SetUserRolesRequest>,
) -> ApiResult<StatusCode> {
    reload(&state.role_admin_service).await?;
    state
        .role_admin_service
        .set_user_roles(user_id.as_str(), payload.roles)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_user_active_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<SetUserActiveRequest>,
) -> ApiResult<StatusCode> {
    reload(&state.role_admin_service).await?;
    state
        .role_admin_service
        .set_user_active(user_id.as_str(), payload.active)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_notices_handler(State(state): State<AppState>) -> Json<Vec<NoticeResponse>> {
    let notices = state
        .role_admin_service
        .take_notices()
        .await
        .into_iter()
        .map(NoticeResponse::from)
        .collect();

    Json(notices)
}

//! User and role API handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use uuid::Uuid;

use super::handlers::{current_user, require_permission, ApiState, AppError};
use crate::access::models::{NewUser, Role, User, UserUpdate, MANAGE_USERS};
use crate::auth::jwt::Claims;

#[derive(Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,
    pub accessible_project_ids: Vec<Uuid>,
}

/// The resolved identity of the caller.
pub async fn me(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MeResponse>, AppError> {
    let user = current_user(&state, &claims).await?;
    let mut accessible_project_ids: Vec<Uuid> = state
        .access
        .accessible_project_ids(&user)
        .await?
        .into_iter()
        .collect();
    accessible_project_ids.sort();
    Ok(Json(MeResponse {
        user,
        accessible_project_ids,
    }))
}

pub async fn list_users(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<User>>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_USERS)?;
    Ok(Json(state.access.list_users().await?))
}

pub async fn get_user(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_USERS)?;
    Ok(Json(state.access.get_user(id).await?))
}

pub async fn create_user(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Json(fields): Json<NewUser>,
) -> Result<Json<User>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_USERS)?;
    Ok(Json(state.access.create_user(fields, &user.email).await?))
}

pub async fn update_user(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<User>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_USERS)?;
    Ok(Json(state.access.update_user(id, update, &user.email).await?))
}

pub async fn list_roles(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Role>>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_USERS)?;
    Ok(Json(state.access.list_roles().await?))
}

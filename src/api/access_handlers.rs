//! Access administration handlers
//!
//! Scope queries for the caller plus `MANAGE_USERS`-gated administration of
//! user↔project assignments and role project scoping.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::handlers::{current_user, require_permission, ApiState, AppError};
use crate::access::models::{AccessLevel, MANAGE_USERS};
use crate::auth::jwt::Claims;

// ============================================================================
// Scope queries
// ============================================================================

#[derive(Serialize)]
pub struct AccessibleProjectsResponse {
    pub project_ids: Vec<Uuid>,
}

/// Project ids the caller may see. An empty list is a normal answer.
pub async fn accessible_projects(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<AccessibleProjectsResponse>, AppError> {
    let user = current_user(&state, &claims).await?;
    let mut project_ids: Vec<Uuid> = state
        .access
        .accessible_project_ids(&user)
        .await?
        .into_iter()
        .collect();
    project_ids.sort();
    Ok(Json(AccessibleProjectsResponse { project_ids }))
}

#[derive(Serialize)]
pub struct AccessLevelResponse {
    /// None when the caller has no access at all.
    pub access_level: Option<AccessLevel>,
}

/// The caller's access level on one project.
pub async fn access_level(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<AccessLevelResponse>, AppError> {
    let user = current_user(&state, &claims).await?;
    let access_level = state.access.access_level(&user, project_id).await?;
    Ok(Json(AccessLevelResponse { access_level }))
}

// ============================================================================
// Assignment administration
// ============================================================================

#[derive(Deserialize)]
pub struct AssignRequest {
    pub access_level: AccessLevel,
}

pub async fn assign_user_to_project(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path((user_id, project_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<AssignRequest>,
) -> Result<StatusCode, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_USERS)?;

    state
        .access
        .assign_user_to_project(user_id, project_id, req.access_level, &user.email)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_user_from_project(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path((user_id, project_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_USERS)?;

    state
        .access
        .remove_user_from_project(user_id, project_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Role scoping administration
// ============================================================================

#[derive(Deserialize)]
pub struct RoleScopeRequest {
    pub project_ids: Vec<Uuid>,
}

/// Replace a role's project scope. An empty list makes the role global.
pub async fn set_role_scope(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(role_id): Path<Uuid>,
    Json(req): Json<RoleScopeRequest>,
) -> Result<StatusCode, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_USERS)?;

    state.access.set_role_scope(role_id, &req.project_ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

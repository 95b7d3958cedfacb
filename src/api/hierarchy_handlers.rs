//! Hierarchy API handlers
//!
//! Thin plumbing over the hierarchy service: permission check, call, map
//! error. Reads are filtered through the access scope resolver; every
//! mutation requires `MANAGE_STRATEGY`.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::handlers::{
    current_user, require_any_permission, require_permission, ApiState, AppError,
};
use crate::access::models::{MANAGE_STRATEGY, VIEW_STRATEGY};
use crate::auth::jwt::Claims;
use crate::hierarchy::models::*;

// ============================================================================
// Reads
// ============================================================================

/// List active projects visible to the caller.
pub async fn list_projects(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Project>>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_any_permission(&user, &[VIEW_STRATEGY, MANAGE_STRATEGY])?;
    Ok(Json(state.access.visible_projects(&user).await?))
}

/// Full subtree of one project, if the caller can see it.
pub async fn get_project_tree(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectTree>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_any_permission(&user, &[VIEW_STRATEGY, MANAGE_STRATEGY])?;

    if state.access.access_level(&user, project_id).await?.is_none() {
        return Err(AppError::Forbidden("No access to this project".to_string()));
    }
    Ok(Json(state.hierarchy.project_tree(project_id).await?))
}

// ============================================================================
// Creation
// ============================================================================

pub async fn create_project(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Json(fields): Json<NewProject>,
) -> Result<Json<Project>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_STRATEGY)?;
    Ok(Json(
        state.hierarchy.create_project(fields, &user.email).await?,
    ))
}

pub async fn add_initiative(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(project_id): Path<Uuid>,
    Json(fields): Json<NewInitiative>,
) -> Result<Json<StrategicInitiative>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_STRATEGY)?;
    Ok(Json(
        state
            .hierarchy
            .add_initiative(project_id, fields, &user.email)
            .await?,
    ))
}

pub async fn add_goal(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(initiative_id): Path<Uuid>,
    Json(fields): Json<NewGoal>,
) -> Result<Json<Goal>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_STRATEGY)?;
    Ok(Json(
        state
            .hierarchy
            .add_goal(initiative_id, fields, &user.email)
            .await?,
    ))
}

pub async fn add_objective(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(goal_id): Path<Uuid>,
    Json(fields): Json<NewObjective>,
) -> Result<Json<Objective>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_STRATEGY)?;
    Ok(Json(
        state
            .hierarchy
            .add_objective(goal_id, fields, &user.email)
            .await?,
    ))
}

pub async fn add_key_result(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(objective_id): Path<Uuid>,
    Json(fields): Json<NewKeyResult>,
) -> Result<Json<KeyResult>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_STRATEGY)?;
    Ok(Json(
        state
            .hierarchy
            .add_key_result(objective_id, fields, &user.email)
            .await?,
    ))
}

pub async fn add_action_item(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(key_result_id): Path<Uuid>,
    Json(fields): Json<NewActionItem>,
) -> Result<Json<ActionItem>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_STRATEGY)?;
    Ok(Json(
        state
            .hierarchy
            .add_action_item(key_result_id, fields, &user.email)
            .await?,
    ))
}

// ============================================================================
// Partial updates
// ============================================================================

pub async fn update_project(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(update): Json<ProjectUpdate>,
) -> Result<Json<Project>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_STRATEGY)?;
    Ok(Json(
        state.hierarchy.update_project(id, update, &user.email).await?,
    ))
}

pub async fn update_initiative(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(update): Json<InitiativeUpdate>,
) -> Result<Json<StrategicInitiative>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_STRATEGY)?;
    Ok(Json(
        state
            .hierarchy
            .update_initiative(id, update, &user.email)
            .await?,
    ))
}

pub async fn update_goal(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(update): Json<GoalUpdate>,
) -> Result<Json<Goal>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_STRATEGY)?;
    Ok(Json(
        state.hierarchy.update_goal(id, update, &user.email).await?,
    ))
}

pub async fn update_objective(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(update): Json<ObjectiveUpdate>,
) -> Result<Json<Objective>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_STRATEGY)?;
    Ok(Json(
        state
            .hierarchy
            .update_objective(id, update, &user.email)
            .await?,
    ))
}

pub async fn update_key_result(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(update): Json<KeyResultUpdate>,
) -> Result<Json<KeyResult>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_STRATEGY)?;
    Ok(Json(
        state
            .hierarchy
            .update_key_result(id, update, &user.email)
            .await?,
    ))
}

pub async fn update_action_item(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(update): Json<ActionItemUpdate>,
) -> Result<Json<ActionItem>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_STRATEGY)?;
    Ok(Json(
        state
            .hierarchy
            .update_action_item(id, update, &user.email)
            .await?,
    ))
}

// ============================================================================
// Activation and recompute
// ============================================================================

#[derive(Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

/// Flip a node's active flag with full cascade.
pub async fn set_active(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path((level, id)): Path<(String, Uuid)>,
    Json(req): Json<SetActiveRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_STRATEGY)?;

    let level: Level = level
        .parse()
        .map_err(|e: String| AppError::BadRequest(e))?;
    state
        .hierarchy
        .set_active(level, id, req.active, &user.email)
        .await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

/// Explicit full-project recompute (also used after bulk import).
pub async fn recompute_project(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectTree>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_STRATEGY)?;
    Ok(Json(state.hierarchy.recompute_project(project_id).await?))
}

// ============================================================================
// Archive
// ============================================================================

/// Soft-deleted projects.
pub async fn list_archive(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Project>>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_any_permission(&user, &[VIEW_STRATEGY, MANAGE_STRATEGY])?;
    Ok(Json(state.hierarchy.list_archived_projects().await?))
}

/// Restore an archived node (and its descendants) by level and id.
pub async fn restore_item(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path((level, id)): Path<(String, Uuid)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_STRATEGY)?;

    let level: Level = level
        .parse()
        .map_err(|e: String| AppError::BadRequest(e))?;
    state.hierarchy.set_active(level, id, true, &user.email).await?;
    Ok(Json(serde_json::json!({ "status": "restored" })))
}

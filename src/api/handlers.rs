//! Shared API state, error mapping, and the health endpoint

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::access::models::User;
use crate::access::AccessService;
use crate::auth::jwt::Claims;
use crate::hierarchy::{HierarchyError, HierarchyService};
use crate::neo4j::HierarchyStore;
use crate::AuthConfig;

/// Shared server state
pub struct ServerState {
    pub hierarchy: HierarchyService,
    pub access: AccessService,
    pub store: Arc<dyn HierarchyStore>,
    /// Auth config — None means deny-by-default
    pub auth_config: Option<AuthConfig>,
}

pub type ApiState = Arc<ServerState>;

impl ServerState {
    pub fn new(store: Arc<dyn HierarchyStore>, auth_config: Option<AuthConfig>) -> Self {
        Self {
            hierarchy: HierarchyService::new(store.clone()),
            access: AccessService::new(store.clone()),
            store,
            auth_config,
        }
    }
}

// ============================================================================
// Identity and permission helpers
// ============================================================================

/// Resolve the token identity to an active user record.
pub async fn current_user(state: &ServerState, claims: &Claims) -> Result<User, AppError> {
    state
        .access
        .resolve_user(&claims.email)
        .await
        .map_err(|_| AppError::Unauthorized("User not found or inactive".to_string()))
}

/// Require one specific permission on the user's active roles.
pub fn require_permission(user: &User, permission: &str) -> Result<(), AppError> {
    if user.has_permission(permission) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Missing permission: {}",
            permission
        )))
    }
}

/// Require at least one of the listed permissions.
pub fn require_any_permission(user: &User, permissions: &[&str]) -> Result<(), AppError> {
    if permissions.iter().any(|p| user.has_permission(p)) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Requires one of: {}",
            permissions.join(", ")
        )))
    }
}

// ============================================================================
// Health check
// ============================================================================

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub store: String,
}

/// Health check handler — verifies the store answers a trivial query.
pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let store = match state.store.list_active_project_ids().await {
        Ok(_) => "connected".to_string(),
        Err(e) => format!("error: {}", e),
    };
    let status = if store == "connected" { "ok" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store,
    })
}

// ============================================================================
// Error mapping
// ============================================================================

pub enum AppError {
    Internal(anyhow::Error),
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::Internal(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<HierarchyError> for AppError {
    fn from(err: HierarchyError) -> Self {
        match err {
            HierarchyError::NotFound { .. } => AppError::NotFound(err.to_string()),
            HierarchyError::InvalidState(msg) => AppError::Conflict(msg),
            HierarchyError::Store(e) => AppError::Internal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::models::Level;
    use uuid::Uuid;

    #[test]
    fn test_hierarchy_error_mapping() {
        let err: AppError = HierarchyError::not_found(Level::Goal, Uuid::new_v4()).into();
        assert!(matches!(err, AppError::NotFound(_)));

        let err: AppError = HierarchyError::InvalidState("nope".to_string()).into();
        assert!(matches!(err, AppError::Conflict(_)));

        let err: AppError = HierarchyError::Store(anyhow::anyhow!("boom")).into();
        assert!(matches!(err, AppError::Internal(_)));
    }
}

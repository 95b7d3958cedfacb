//! API route definitions

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::access_handlers;
use super::handlers::{self, ApiState};
use super::hierarchy_handlers;
use super::import_handlers;
use super::user_handlers;
use crate::auth::require_auth;

/// Create the API router
pub fn create_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected = Router::new()
        // ====================================================================
        // Hierarchy
        // ====================================================================
        .route(
            "/api/hierarchy/projects",
            get(hierarchy_handlers::list_projects).post(hierarchy_handlers::create_project),
        )
        .route(
            "/api/hierarchy/projects/{id}",
            put(hierarchy_handlers::update_project),
        )
        .route(
            "/api/hierarchy/projects/{id}/tree",
            get(hierarchy_handlers::get_project_tree),
        )
        .route(
            "/api/hierarchy/projects/{id}/recompute",
            post(hierarchy_handlers::recompute_project),
        )
        .route(
            "/api/hierarchy/projects/{id}/initiatives",
            post(hierarchy_handlers::add_initiative),
        )
        .route(
            "/api/hierarchy/initiatives/{id}",
            put(hierarchy_handlers::update_initiative),
        )
        .route(
            "/api/hierarchy/initiatives/{id}/goals",
            post(hierarchy_handlers::add_goal),
        )
        .route(
            "/api/hierarchy/goals/{id}",
            put(hierarchy_handlers::update_goal),
        )
        .route(
            "/api/hierarchy/goals/{id}/objectives",
            post(hierarchy_handlers::add_objective),
        )
        .route(
            "/api/hierarchy/objectives/{id}",
            put(hierarchy_handlers::update_objective),
        )
        .route(
            "/api/hierarchy/objectives/{id}/key-results",
            post(hierarchy_handlers::add_key_result),
        )
        .route(
            "/api/hierarchy/key-results/{id}",
            put(hierarchy_handlers::update_key_result),
        )
        .route(
            "/api/hierarchy/key-results/{id}/action-items",
            post(hierarchy_handlers::add_action_item),
        )
        .route(
            "/api/hierarchy/action-items/{id}",
            put(hierarchy_handlers::update_action_item),
        )
        .route(
            "/api/hierarchy/{level}/{id}/active",
            put(hierarchy_handlers::set_active),
        )
        // ====================================================================
        // Archive
        // ====================================================================
        .route("/api/archive", get(hierarchy_handlers::list_archive))
        .route(
            "/api/archive/restore/{level}/{id}",
            post(hierarchy_handlers::restore_item),
        )
        // ====================================================================
        // Access scope
        // ====================================================================
        .route(
            "/api/access/projects",
            get(access_handlers::accessible_projects),
        )
        .route(
            "/api/access/projects/{id}/level",
            get(access_handlers::access_level),
        )
        .route(
            "/api/access/users/{user_id}/projects/{project_id}",
            post(access_handlers::assign_user_to_project)
                .delete(access_handlers::remove_user_from_project),
        )
        .route(
            "/api/access/roles/{id}/projects",
            put(access_handlers::set_role_scope),
        )
        // ====================================================================
        // Users and roles
        // ====================================================================
        .route("/api/users/me", get(user_handlers::me))
        .route(
            "/api/users",
            get(user_handlers::list_users).post(user_handlers::create_user),
        )
        .route(
            "/api/users/{id}",
            get(user_handlers::get_user).put(user_handlers::update_user),
        )
        .route("/api/roles", get(user_handlers::list_roles))
        // ====================================================================
        // Import
        // ====================================================================
        .route(
            "/api/import/hierarchy",
            post(import_handlers::import_hierarchy),
        )
        .layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        // Health check stays open
        .route("/health", get(handlers::health))
        .merge(protected)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

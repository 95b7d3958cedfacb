//! HierarchyStore trait definition
//!
//! Abstract interface over the Neo4j persistence layer: point lookups,
//! full-subtree fetch, and upserts for the six hierarchy levels plus the
//! access-control records. Mirrors the public async methods of
//! `Neo4jClient`, enabling testing with the in-memory mock and future
//! backend swaps.
//!
//! Batched write methods (`apply_progress_writes`, `apply_activation_writes`)
//! are expected to apply all-or-nothing: a cascade plus its follow-up
//! recompute rides on that unit of work.

use crate::access::models::{Role, User, UserProjectAssignment};
use crate::hierarchy::models::*;
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait HierarchyStore: Send + Sync {
    // ========================================================================
    // Project operations
    // ========================================================================

    async fn create_project(&self, project: &Project) -> Result<()>;

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>>;

    /// Active projects only.
    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Soft-deleted projects (the archive view).
    async fn list_archived_projects(&self) -> Result<Vec<Project>>;

    /// Ids of all active projects (for the VIEW_ALL_PROJECTS bypass).
    async fn list_active_project_ids(&self) -> Result<Vec<Uuid>>;

    /// Overwrite a project's mutable fields.
    async fn update_project(&self, project: &Project) -> Result<()>;

    // ========================================================================
    // Child entity operations
    // ========================================================================

    async fn create_initiative(&self, initiative: &StrategicInitiative) -> Result<()>;
    async fn get_initiative(&self, id: Uuid) -> Result<Option<StrategicInitiative>>;
    async fn update_initiative(&self, initiative: &StrategicInitiative) -> Result<()>;

    async fn create_goal(&self, goal: &Goal) -> Result<()>;
    async fn get_goal(&self, id: Uuid) -> Result<Option<Goal>>;
    async fn update_goal(&self, goal: &Goal) -> Result<()>;

    async fn create_objective(&self, objective: &Objective) -> Result<()>;
    async fn get_objective(&self, id: Uuid) -> Result<Option<Objective>>;
    async fn update_objective(&self, objective: &Objective) -> Result<()>;

    async fn create_key_result(&self, key_result: &KeyResult) -> Result<()>;
    async fn get_key_result(&self, id: Uuid) -> Result<Option<KeyResult>>;
    async fn update_key_result(&self, key_result: &KeyResult) -> Result<()>;

    async fn create_action_item(&self, action_item: &ActionItem) -> Result<()>;
    async fn get_action_item(&self, id: Uuid) -> Result<Option<ActionItem>>;
    async fn update_action_item(&self, action_item: &ActionItem) -> Result<()>;

    // ========================================================================
    // Subtree / traversal operations
    // ========================================================================

    /// Fetch the whole subtree of a project, active and inactive nodes
    /// alike. The aggregator and the cascade both work from this snapshot.
    async fn fetch_project_tree(&self, project_id: Uuid) -> Result<Option<ProjectTree>>;

    /// Walk parent links from any node up to its owning project.
    async fn find_owning_project(&self, level: Level, id: Uuid) -> Result<Option<Uuid>>;

    // ========================================================================
    // Batched writes
    // ========================================================================

    /// Apply recomputed progress values in one unit of work.
    async fn apply_progress_writes(&self, writes: &[ProgressWrite]) -> Result<()>;

    /// Apply a cascade's activation flips in one unit of work.
    async fn apply_activation_writes(&self, writes: &[ActivationWrite]) -> Result<()>;

    // ========================================================================
    // User operations
    // ========================================================================

    async fn create_user(&self, user: &User) -> Result<()>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    /// Look up a user by email, roles hydrated with their current scopes.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn list_users(&self) -> Result<Vec<User>>;

    async fn update_user(&self, user: &User) -> Result<()>;

    // ========================================================================
    // Role operations
    // ========================================================================

    async fn create_role(&self, role: &Role) -> Result<()>;

    async fn get_role(&self, id: Uuid) -> Result<Option<Role>>;

    async fn get_role_by_name(&self, name: &str) -> Result<Option<Role>>;

    async fn list_roles(&self) -> Result<Vec<Role>>;

    /// Replace a role's project scope wholesale.
    async fn set_role_scope(&self, role_id: Uuid, project_ids: &[Uuid]) -> Result<()>;

    // ========================================================================
    // User↔project assignment operations
    // ========================================================================

    async fn list_assignments_for_user(&self, user_id: Uuid)
        -> Result<Vec<UserProjectAssignment>>;

    /// Upsert a direct assignment (one per user/project pair).
    async fn assign_user_to_project(&self, assignment: &UserProjectAssignment) -> Result<()>;

    async fn remove_user_from_project(&self, user_id: Uuid, project_id: Uuid) -> Result<()>;
}

//! `HierarchyStore` implementation for `Neo4jClient`.
//!
//! Every method simply delegates to the corresponding inherent method on
//! `Neo4jClient`.

use async_trait::async_trait;
use uuid::Uuid;

use super::client::Neo4jClient;
use super::traits::HierarchyStore;
use crate::access::models::{Role, User, UserProjectAssignment};
use crate::hierarchy::models::*;

#[async_trait]
impl HierarchyStore for Neo4jClient {
    // ========================================================================
    // Project operations
    // ========================================================================

    async fn create_project(&self, project: &Project) -> anyhow::Result<()> {
        self.create_project(project).await
    }

    async fn get_project(&self, id: Uuid) -> anyhow::Result<Option<Project>> {
        self.get_project(id).await
    }

    async fn list_projects(&self) -> anyhow::Result<Vec<Project>> {
        self.list_projects().await
    }

    async fn list_archived_projects(&self) -> anyhow::Result<Vec<Project>> {
        self.list_archived_projects().await
    }

    async fn list_active_project_ids(&self) -> anyhow::Result<Vec<Uuid>> {
        self.list_active_project_ids().await
    }

    async fn update_project(&self, project: &Project) -> anyhow::Result<()> {
        self.update_project(project).await
    }

    // ========================================================================
    // Child entity operations
    // ========================================================================

    async fn create_initiative(&self, initiative: &StrategicInitiative) -> anyhow::Result<()> {
        self.create_initiative(initiative).await
    }

    async fn get_initiative(&self, id: Uuid) -> anyhow::Result<Option<StrategicInitiative>> {
        self.get_initiative(id).await
    }

    async fn update_initiative(&self, initiative: &StrategicInitiative) -> anyhow::Result<()> {
        self.update_initiative(initiative).await
    }

    async fn create_goal(&self, goal: &Goal) -> anyhow::Result<()> {
        self.create_goal(goal).await
    }

    async fn get_goal(&self, id: Uuid) -> anyhow::Result<Option<Goal>> {
        self.get_goal(id).await
    }

    async fn update_goal(&self, goal: &Goal) -> anyhow::Result<()> {
        self.update_goal(goal).await
    }

    async fn create_objective(&self, objective: &Objective) -> anyhow::Result<()> {
        self.create_objective(objective).await
    }

    async fn get_objective(&self, id: Uuid) -> anyhow::Result<Option<Objective>> {
        self.get_objective(id).await
    }

    async fn update_objective(&self, objective: &Objective) -> anyhow::Result<()> {
        self.update_objective(objective).await
    }

    async fn create_key_result(&self, key_result: &KeyResult) -> anyhow::Result<()> {
        self.create_key_result(key_result).await
    }

    async fn get_key_result(&self, id: Uuid) -> anyhow::Result<Option<KeyResult>> {
        self.get_key_result(id).await
    }

    async fn update_key_result(&self, key_result: &KeyResult) -> anyhow::Result<()> {
        self.update_key_result(key_result).await
    }

    async fn create_action_item(&self, action_item: &ActionItem) -> anyhow::Result<()> {
        self.create_action_item(action_item).await
    }

    async fn get_action_item(&self, id: Uuid) -> anyhow::Result<Option<ActionItem>> {
        self.get_action_item(id).await
    }

    async fn update_action_item(&self, action_item: &ActionItem) -> anyhow::Result<()> {
        self.update_action_item(action_item).await
    }

    // ========================================================================
    // Subtree / traversal operations
    // ========================================================================

    async fn fetch_project_tree(&self, project_id: Uuid) -> anyhow::Result<Option<ProjectTree>> {
        self.fetch_project_tree(project_id).await
    }

    async fn find_owning_project(&self, level: Level, id: Uuid) -> anyhow::Result<Option<Uuid>> {
        self.find_owning_project(level, id).await
    }

    // ========================================================================
    // Batched writes
    // ========================================================================

    async fn apply_progress_writes(&self, writes: &[ProgressWrite]) -> anyhow::Result<()> {
        self.apply_progress_writes(writes).await
    }

    async fn apply_activation_writes(&self, writes: &[ActivationWrite]) -> anyhow::Result<()> {
        self.apply_activation_writes(writes).await
    }

    // ========================================================================
    // User operations
    // ========================================================================

    async fn create_user(&self, user: &User) -> anyhow::Result<()> {
        self.create_user(user).await
    }

    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        self.get_user(id).await
    }

    async fn get_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        self.get_user_by_email(email).await
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        self.list_users().await
    }

    async fn update_user(&self, user: &User) -> anyhow::Result<()> {
        self.update_user(user).await
    }

    // ========================================================================
    // Role operations
    // ========================================================================

    async fn create_role(&self, role: &Role) -> anyhow::Result<()> {
        self.create_role(role).await
    }

    async fn get_role(&self, id: Uuid) -> anyhow::Result<Option<Role>> {
        self.get_role(id).await
    }

    async fn get_role_by_name(&self, name: &str) -> anyhow::Result<Option<Role>> {
        self.get_role_by_name(name).await
    }

    async fn list_roles(&self) -> anyhow::Result<Vec<Role>> {
        self.list_roles().await
    }

    async fn set_role_scope(&self, role_id: Uuid, project_ids: &[Uuid]) -> anyhow::Result<()> {
        self.set_role_scope(role_id, project_ids).await
    }

    // ========================================================================
    // User↔project assignment operations
    // ========================================================================

    async fn list_assignments_for_user(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<UserProjectAssignment>> {
        self.list_assignments_for_user(user_id).await
    }

    async fn assign_user_to_project(
        &self,
        assignment: &UserProjectAssignment,
    ) -> anyhow::Result<()> {
        self.assign_user_to_project(assignment).await
    }

    async fn remove_user_from_project(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> anyhow::Result<()> {
        self.remove_user_from_project(user_id, project_id).await
    }
}

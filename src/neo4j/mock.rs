//! In-memory mock implementation of HierarchyStore for testing.
//!
//! Backs every store operation with `tokio::sync::RwLock<HashMap<K, V>>`
//! collections. Conditionally compiled with `#[cfg(test)]`.

use crate::access::models::{Role, User, UserProjectAssignment};
use crate::hierarchy::models::*;
use crate::neo4j::traits::HierarchyStore;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory mock implementation of HierarchyStore for testing.
pub struct MockHierarchyStore {
    pub projects: RwLock<HashMap<Uuid, Project>>,
    pub initiatives: RwLock<HashMap<Uuid, StrategicInitiative>>,
    pub goals: RwLock<HashMap<Uuid, Goal>>,
    pub objectives: RwLock<HashMap<Uuid, Objective>>,
    pub key_results: RwLock<HashMap<Uuid, KeyResult>>,
    pub action_items: RwLock<HashMap<Uuid, ActionItem>>,

    pub users: RwLock<HashMap<Uuid, User>>,
    pub roles: RwLock<HashMap<Uuid, Role>>,
    pub assignments: RwLock<Vec<UserProjectAssignment>>,
}

impl MockHierarchyStore {
    pub fn new() -> Self {
        Self {
            projects: RwLock::new(HashMap::new()),
            initiatives: RwLock::new(HashMap::new()),
            goals: RwLock::new(HashMap::new()),
            objectives: RwLock::new(HashMap::new()),
            key_results: RwLock::new(HashMap::new()),
            action_items: RwLock::new(HashMap::new()),
            users: RwLock::new(HashMap::new()),
            roles: RwLock::new(HashMap::new()),
            assignments: RwLock::new(Vec::new()),
        }
    }

    // ========================================================================
    // Builder / seeding methods for tests
    // ========================================================================

    pub async fn with_project(self, project: Project) -> Self {
        self.projects.write().await.insert(project.id, project);
        self
    }

    pub async fn with_initiative(self, initiative: StrategicInitiative) -> Self {
        self.initiatives
            .write()
            .await
            .insert(initiative.id, initiative);
        self
    }

    pub async fn with_goal(self, goal: Goal) -> Self {
        self.goals.write().await.insert(goal.id, goal);
        self
    }

    pub async fn with_objective(self, objective: Objective) -> Self {
        self.objectives.write().await.insert(objective.id, objective);
        self
    }

    pub async fn with_key_result(self, key_result: KeyResult) -> Self {
        self.key_results
            .write()
            .await
            .insert(key_result.id, key_result);
        self
    }

    pub async fn with_action_item(self, action_item: ActionItem) -> Self {
        self.action_items
            .write()
            .await
            .insert(action_item.id, action_item);
        self
    }

    pub async fn with_user(self, user: User) -> Self {
        for role in &user.roles {
            self.roles
                .write()
                .await
                .entry(role.id)
                .or_insert_with(|| role.clone());
        }
        self.users.write().await.insert(user.id, user);
        self
    }

    pub async fn with_role(self, role: Role) -> Self {
        self.roles.write().await.insert(role.id, role);
        self
    }

    /// Refresh a user's embedded roles from the role map so scope updates
    /// made after seeding are visible, the way the real store re-joins
    /// user→role→scope on every lookup.
    async fn hydrate(&self, mut user: User) -> User {
        let roles = self.roles.read().await;
        for role in &mut user.roles {
            if let Some(current) = roles.get(&role.id) {
                *role = current.clone();
            }
        }
        user
    }
}

impl Default for MockHierarchyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HierarchyStore for MockHierarchyStore {
    // ========================================================================
    // Project operations
    // ========================================================================

    async fn create_project(&self, project: &Project) -> Result<()> {
        self.projects
            .write()
            .await
            .insert(project.id, project.clone());
        Ok(())
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        Ok(self.projects.read().await.get(&id).cloned())
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let mut projects: Vec<Project> = self
            .projects
            .read()
            .await
            .values()
            .filter(|p| p.audit.is_active)
            .cloned()
            .collect();
        projects.sort_by_key(|p| p.audit.created_date);
        Ok(projects)
    }

    async fn list_archived_projects(&self) -> Result<Vec<Project>> {
        let mut projects: Vec<Project> = self
            .projects
            .read()
            .await
            .values()
            .filter(|p| !p.audit.is_active)
            .cloned()
            .collect();
        projects.sort_by_key(|p| p.audit.created_date);
        Ok(projects)
    }

    async fn list_active_project_ids(&self) -> Result<Vec<Uuid>> {
        Ok(self
            .projects
            .read()
            .await
            .values()
            .filter(|p| p.audit.is_active)
            .map(|p| p.id)
            .collect())
    }

    async fn update_project(&self, project: &Project) -> Result<()> {
        self.projects
            .write()
            .await
            .insert(project.id, project.clone());
        Ok(())
    }

    // ========================================================================
    // Child entity operations
    // ========================================================================

    async fn create_initiative(&self, initiative: &StrategicInitiative) -> Result<()> {
        self.initiatives
            .write()
            .await
            .insert(initiative.id, initiative.clone());
        Ok(())
    }

    async fn get_initiative(&self, id: Uuid) -> Result<Option<StrategicInitiative>> {
        Ok(self.initiatives.read().await.get(&id).cloned())
    }

    async fn update_initiative(&self, initiative: &StrategicInitiative) -> Result<()> {
        self.initiatives
            .write()
            .await
            .insert(initiative.id, initiative.clone());
        Ok(())
    }

    async fn create_goal(&self, goal: &Goal) -> Result<()> {
        self.goals.write().await.insert(goal.id, goal.clone());
        Ok(())
    }

    async fn get_goal(&self, id: Uuid) -> Result<Option<Goal>> {
        Ok(self.goals.read().await.get(&id).cloned())
    }

    async fn update_goal(&self, goal: &Goal) -> Result<()> {
        self.goals.write().await.insert(goal.id, goal.clone());
        Ok(())
    }

    async fn create_objective(&self, objective: &Objective) -> Result<()> {
        self.objectives
            .write()
            .await
            .insert(objective.id, objective.clone());
        Ok(())
    }

    async fn get_objective(&self, id: Uuid) -> Result<Option<Objective>> {
        Ok(self.objectives.read().await.get(&id).cloned())
    }

    async fn update_objective(&self, objective: &Objective) -> Result<()> {
        self.objectives
            .write()
            .await
            .insert(objective.id, objective.clone());
        Ok(())
    }

    async fn create_key_result(&self, key_result: &KeyResult) -> Result<()> {
        self.key_results
            .write()
            .await
            .insert(key_result.id, key_result.clone());
        Ok(())
    }

    async fn get_key_result(&self, id: Uuid) -> Result<Option<KeyResult>> {
        Ok(self.key_results.read().await.get(&id).cloned())
    }

    async fn update_key_result(&self, key_result: &KeyResult) -> Result<()> {
        self.key_results
            .write()
            .await
            .insert(key_result.id, key_result.clone());
        Ok(())
    }

    async fn create_action_item(&self, action_item: &ActionItem) -> Result<()> {
        self.action_items
            .write()
            .await
            .insert(action_item.id, action_item.clone());
        Ok(())
    }

    async fn get_action_item(&self, id: Uuid) -> Result<Option<ActionItem>> {
        Ok(self.action_items.read().await.get(&id).cloned())
    }

    async fn update_action_item(&self, action_item: &ActionItem) -> Result<()> {
        self.action_items
            .write()
            .await
            .insert(action_item.id, action_item.clone());
        Ok(())
    }

    // ========================================================================
    // Subtree / traversal operations
    // ========================================================================

    async fn fetch_project_tree(&self, project_id: Uuid) -> Result<Option<ProjectTree>> {
        let project = match self.projects.read().await.get(&project_id).cloned() {
            Some(p) => p,
            None => return Ok(None),
        };

        let initiatives = self.initiatives.read().await;
        let goals = self.goals.read().await;
        let objectives = self.objectives.read().await;
        let key_results = self.key_results.read().await;
        let action_items = self.action_items.read().await;

        let mut initiative_trees = Vec::new();
        let mut inits: Vec<_> = initiatives
            .values()
            .filter(|i| i.project_id == project_id)
            .cloned()
            .collect();
        inits.sort_by_key(|i| i.audit.created_date);

        for initiative in inits {
            let mut goal_trees = Vec::new();
            let mut gs: Vec<_> = goals
                .values()
                .filter(|g| g.initiative_id == initiative.id)
                .cloned()
                .collect();
            gs.sort_by_key(|g| g.audit.created_date);

            for goal in gs {
                let mut objective_trees = Vec::new();
                let mut os: Vec<_> = objectives
                    .values()
                    .filter(|o| o.goal_id == goal.id)
                    .cloned()
                    .collect();
                os.sort_by_key(|o| o.audit.created_date);

                for objective in os {
                    let mut kr_trees = Vec::new();
                    let mut krs: Vec<_> = key_results
                        .values()
                        .filter(|k| k.objective_id == objective.id)
                        .cloned()
                        .collect();
                    krs.sort_by_key(|k| k.audit.created_date);

                    for key_result in krs {
                        let mut ais: Vec<_> = action_items
                            .values()
                            .filter(|a| a.key_result_id == key_result.id)
                            .cloned()
                            .collect();
                        ais.sort_by_key(|a| a.audit.created_date);
                        kr_trees.push(KeyResultTree {
                            key_result,
                            action_items: ais,
                        });
                    }
                    objective_trees.push(ObjectiveTree {
                        objective,
                        key_results: kr_trees,
                    });
                }
                goal_trees.push(GoalTree {
                    goal,
                    objectives: objective_trees,
                });
            }
            initiative_trees.push(InitiativeTree {
                initiative,
                goals: goal_trees,
            });
        }

        Ok(Some(ProjectTree {
            project,
            initiatives: initiative_trees,
        }))
    }

    async fn find_owning_project(&self, level: Level, id: Uuid) -> Result<Option<Uuid>> {
        let mut level = level;
        let mut id = id;
        loop {
            match level {
                Level::Project => {
                    return Ok(self.projects.read().await.get(&id).map(|p| p.id));
                }
                Level::Initiative => {
                    match self.initiatives.read().await.get(&id) {
                        Some(i) => {
                            id = i.project_id;
                            level = Level::Project;
                        }
                        None => return Ok(None),
                    }
                }
                Level::Goal => match self.goals.read().await.get(&id) {
                    Some(g) => {
                        id = g.initiative_id;
                        level = Level::Initiative;
                    }
                    None => return Ok(None),
                },
                Level::Objective => match self.objectives.read().await.get(&id) {
                    Some(o) => {
                        id = o.goal_id;
                        level = Level::Goal;
                    }
                    None => return Ok(None),
                },
                Level::KeyResult => match self.key_results.read().await.get(&id) {
                    Some(k) => {
                        id = k.objective_id;
                        level = Level::Objective;
                    }
                    None => return Ok(None),
                },
                Level::ActionItem => match self.action_items.read().await.get(&id) {
                    Some(a) => {
                        id = a.key_result_id;
                        level = Level::KeyResult;
                    }
                    None => return Ok(None),
                },
            }
        }
    }

    // ========================================================================
    // Batched writes
    // ========================================================================

    async fn apply_progress_writes(&self, writes: &[ProgressWrite]) -> Result<()> {
        for w in writes {
            match w.level {
                Level::Project => {
                    if let Some(p) = self.projects.write().await.get_mut(&w.id) {
                        p.progress = w.progress;
                    }
                }
                Level::Initiative => {
                    if let Some(i) = self.initiatives.write().await.get_mut(&w.id) {
                        i.progress = w.progress;
                    }
                }
                Level::Goal => {
                    if let Some(g) = self.goals.write().await.get_mut(&w.id) {
                        g.progress = w.progress;
                    }
                }
                Level::Objective => {
                    if let Some(o) = self.objectives.write().await.get_mut(&w.id) {
                        o.progress = w.progress;
                    }
                }
                Level::KeyResult => {
                    if let Some(k) = self.key_results.write().await.get_mut(&w.id) {
                        k.progress = w.progress;
                    }
                }
                Level::ActionItem => {
                    if let Some(a) = self.action_items.write().await.get_mut(&w.id) {
                        a.progress = w.progress;
                    }
                }
            }
        }
        Ok(())
    }

    async fn apply_activation_writes(&self, writes: &[ActivationWrite]) -> Result<()> {
        for w in writes {
            let apply = |audit: &mut Audit| {
                audit.is_active = w.active;
                audit.closed_by = w.closed_by.clone();
                audit.closed_date = w.closed_date;
            };
            match w.level {
                Level::Project => {
                    if let Some(p) = self.projects.write().await.get_mut(&w.id) {
                        apply(&mut p.audit);
                    }
                }
                Level::Initiative => {
                    if let Some(i) = self.initiatives.write().await.get_mut(&w.id) {
                        apply(&mut i.audit);
                    }
                }
                Level::Goal => {
                    if let Some(g) = self.goals.write().await.get_mut(&w.id) {
                        apply(&mut g.audit);
                    }
                }
                Level::Objective => {
                    if let Some(o) = self.objectives.write().await.get_mut(&w.id) {
                        apply(&mut o.audit);
                    }
                }
                Level::KeyResult => {
                    if let Some(k) = self.key_results.write().await.get_mut(&w.id) {
                        apply(&mut k.audit);
                    }
                }
                Level::ActionItem => {
                    if let Some(a) = self.action_items.write().await.get_mut(&w.id) {
                        apply(&mut a.audit);
                    }
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // User operations
    // ========================================================================

    async fn create_user(&self, user: &User) -> Result<()> {
        let users = self.users.read().await;
        if users.values().any(|u| u.login == user.login) {
            bail!("login already taken: {}", user.login);
        }
        drop(users);
        self.users.write().await.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        match self.users.read().await.get(&id).cloned() {
            Some(user) => Ok(Some(self.hydrate(user).await)),
            None => Ok(None),
        }
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned();
        match user {
            Some(user) => Ok(Some(self.hydrate(user).await)),
            None => Ok(None),
        }
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let users: Vec<User> = self.users.read().await.values().cloned().collect();
        let mut hydrated = Vec::with_capacity(users.len());
        for user in users {
            hydrated.push(self.hydrate(user).await);
        }
        hydrated.sort_by_key(|u| u.audit.created_date);
        Ok(hydrated)
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        self.users.write().await.insert(user.id, user.clone());
        Ok(())
    }

    // ========================================================================
    // Role operations
    // ========================================================================

    async fn create_role(&self, role: &Role) -> Result<()> {
        self.roles.write().await.insert(role.id, role.clone());
        Ok(())
    }

    async fn get_role(&self, id: Uuid) -> Result<Option<Role>> {
        Ok(self.roles.read().await.get(&id).cloned())
    }

    async fn get_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        Ok(self
            .roles
            .read()
            .await
            .values()
            .find(|r| r.name == name)
            .cloned())
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        let mut roles: Vec<Role> = self.roles.read().await.values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn set_role_scope(&self, role_id: Uuid, project_ids: &[Uuid]) -> Result<()> {
        match self.roles.write().await.get_mut(&role_id) {
            Some(role) => {
                role.scoped_project_ids = project_ids.to_vec();
                Ok(())
            }
            None => bail!("role not found: {}", role_id),
        }
    }

    // ========================================================================
    // User↔project assignment operations
    // ========================================================================

    async fn list_assignments_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<UserProjectAssignment>> {
        Ok(self
            .assignments
            .read()
            .await
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn assign_user_to_project(&self, assignment: &UserProjectAssignment) -> Result<()> {
        let mut assignments = self.assignments.write().await;
        assignments
            .retain(|a| !(a.user_id == assignment.user_id && a.project_id == assignment.project_id));
        assignments.push(assignment.clone());
        Ok(())
    }

    async fn remove_user_from_project(&self, user_id: Uuid, project_id: Uuid) -> Result<()> {
        self.assignments
            .write()
            .await
            .retain(|a| !(a.user_id == user_id && a.project_id == project_id));
        Ok(())
    }
}

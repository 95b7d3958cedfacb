//! Hierarchy orchestration service
//!
//! The write path for the whole tree: attach-under-parent creation,
//! field-level partial updates, activation cascades, and the follow-up
//! project roll-up. Every mutation resolves the owning project by walking
//! parent links and recomputes that whole project, never a partial subtree.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::aggregator;
use super::cascade::{cascade_at, ActorStamp};
use super::models::*;
use super::HierarchyError;
use crate::neo4j::HierarchyStore;

type Result<T> = std::result::Result<T, HierarchyError>;

/// How a key-result update moves the manual override lock.
///
/// Decided explicitly per update call so the transition stays auditable:
/// editing any metric field unlocks, editing progress directly locks,
/// anything else leaves the lock alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockTransition {
    Lock,
    Unlock,
    Keep,
}

/// Decide the lock transition for a key-result update.
pub fn lock_transition(update: &KeyResultUpdate, original: &KeyResult) -> LockTransition {
    let metrics_changed = update
        .metric_start
        .is_some_and(|v| Some(v) != original.metric_start)
        || update
            .metric_target
            .is_some_and(|v| Some(v) != original.metric_target)
        || update
            .metric_current
            .is_some_and(|v| Some(v) != original.metric_current);
    let progress_changed = update.progress.is_some_and(|p| p != original.progress);

    if metrics_changed {
        LockTransition::Unlock
    } else if progress_changed {
        LockTransition::Lock
    } else {
        LockTransition::Keep
    }
}

/// Service over the hierarchy store.
pub struct HierarchyService {
    store: Arc<dyn HierarchyStore>,
}

impl HierarchyService {
    pub fn new(store: Arc<dyn HierarchyStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn HierarchyStore> {
        &self.store
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(self.store.list_projects().await?)
    }

    pub async fn list_archived_projects(&self) -> Result<Vec<Project>> {
        Ok(self.store.list_archived_projects().await?)
    }

    pub async fn project_tree(&self, project_id: Uuid) -> Result<ProjectTree> {
        self.store
            .fetch_project_tree(project_id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(Level::Project, project_id))
    }

    // ========================================================================
    // Creation ("add under parent")
    // ========================================================================

    pub async fn create_project(&self, fields: NewProject, actor: &str) -> Result<Project> {
        let project = Project {
            id: Uuid::new_v4(),
            title: fields.title,
            description: fields.description,
            progress: 0,
            audit: Audit::new(actor),
        };
        self.store.create_project(&project).await?;
        debug!(project_id = %project.id, "created project");
        Ok(project)
    }

    pub async fn add_initiative(
        &self,
        project_id: Uuid,
        fields: NewInitiative,
        actor: &str,
    ) -> Result<StrategicInitiative> {
        let parent = self
            .store
            .get_project(project_id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(Level::Project, project_id))?;
        require_active_parent(Level::Project, &parent.audit)?;

        let initiative = StrategicInitiative {
            id: Uuid::new_v4(),
            project_id,
            title: fields.title,
            description: fields.description,
            progress: 0,
            audit: Audit::new(actor),
        };
        self.store.create_initiative(&initiative).await?;
        self.recompute_project(project_id).await?;
        Ok(self
            .store
            .get_initiative(initiative.id)
            .await?
            .unwrap_or(initiative))
    }

    pub async fn add_goal(&self, initiative_id: Uuid, fields: NewGoal, actor: &str) -> Result<Goal> {
        let parent = self
            .store
            .get_initiative(initiative_id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(Level::Initiative, initiative_id))?;
        require_active_parent(Level::Initiative, &parent.audit)?;

        let goal = Goal {
            id: Uuid::new_v4(),
            initiative_id,
            title: fields.title,
            description: fields.description,
            progress: 0,
            audit: Audit::new(actor),
        };
        self.store.create_goal(&goal).await?;
        self.recompute_project(parent.project_id).await?;
        Ok(self.store.get_goal(goal.id).await?.unwrap_or(goal))
    }

    pub async fn add_objective(
        &self,
        goal_id: Uuid,
        fields: NewObjective,
        actor: &str,
    ) -> Result<Objective> {
        let parent = self
            .store
            .get_goal(goal_id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(Level::Goal, goal_id))?;
        require_active_parent(Level::Goal, &parent.audit)?;

        let objective = Objective {
            id: Uuid::new_v4(),
            goal_id,
            title: fields.title,
            description: fields.description,
            assignee: fields.assignee,
            year: fields.year,
            quarter: fields.quarter,
            due_date: fields.due_date,
            progress: 0,
            audit: Audit::new(actor),
        };
        self.store.create_objective(&objective).await?;
        let project_id = self.owning_project(Level::Goal, goal_id).await?;
        self.recompute_project(project_id).await?;
        Ok(self
            .store
            .get_objective(objective.id)
            .await?
            .unwrap_or(objective))
    }

    pub async fn add_key_result(
        &self,
        objective_id: Uuid,
        fields: NewKeyResult,
        actor: &str,
    ) -> Result<KeyResult> {
        let parent = self
            .store
            .get_objective(objective_id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(Level::Objective, objective_id))?;
        require_active_parent(Level::Objective, &parent.audit)?;

        let key_result = KeyResult {
            id: Uuid::new_v4(),
            objective_id,
            title: fields.title,
            description: fields.description,
            assignee: fields.assignee,
            metric_start: fields.metric_start,
            metric_target: fields.metric_target,
            metric_current: fields.metric_current,
            unit: fields.unit,
            manual_progress_set: false,
            progress: 0,
            audit: Audit::new(actor),
        };
        self.store.create_key_result(&key_result).await?;
        let project_id = self.owning_project(Level::Objective, objective_id).await?;
        self.recompute_project(project_id).await?;
        Ok(self
            .store
            .get_key_result(key_result.id)
            .await?
            .unwrap_or(key_result))
    }

    pub async fn add_action_item(
        &self,
        key_result_id: Uuid,
        fields: NewActionItem,
        actor: &str,
    ) -> Result<ActionItem> {
        let parent = self
            .store
            .get_key_result(key_result_id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(Level::KeyResult, key_result_id))?;
        require_active_parent(Level::KeyResult, &parent.audit)?;

        let is_completed = fields.is_completed.unwrap_or(false);
        let action_item = ActionItem {
            id: Uuid::new_v4(),
            key_result_id,
            title: fields.title,
            description: fields.description,
            assignee: fields.assignee,
            due_date: fields.due_date,
            is_completed,
            // completion and progress stay equivalent from the start
            progress: if is_completed { 100 } else { 0 },
            audit: Audit::new(actor),
        };
        self.store.create_action_item(&action_item).await?;
        let project_id = self.owning_project(Level::KeyResult, key_result_id).await?;
        self.recompute_project(project_id).await?;
        Ok(self
            .store
            .get_action_item(action_item.id)
            .await?
            .unwrap_or(action_item))
    }

    // ========================================================================
    // Partial updates — None leaves the field unchanged
    // ========================================================================

    pub async fn update_project(
        &self,
        id: Uuid,
        update: ProjectUpdate,
        actor: &str,
    ) -> Result<Project> {
        let mut project = self
            .store
            .get_project(id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(Level::Project, id))?;

        if let Some(title) = update.title {
            project.title = title;
        }
        if let Some(description) = update.description {
            project.description = Some(description);
        }
        if let Some(progress) = update.progress {
            project.progress = progress;
        }
        project.audit.touch(actor);
        self.store.update_project(&project).await?;

        match update.is_active {
            Some(active) => self.set_active(Level::Project, id, active, actor).await?,
            None => {
                self.recompute_project(id).await?;
            }
        }

        self.store
            .get_project(id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(Level::Project, id))
    }

    pub async fn update_initiative(
        &self,
        id: Uuid,
        update: InitiativeUpdate,
        actor: &str,
    ) -> Result<StrategicInitiative> {
        let mut initiative = self
            .store
            .get_initiative(id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(Level::Initiative, id))?;

        if let Some(title) = update.title {
            initiative.title = title;
        }
        if let Some(description) = update.description {
            initiative.description = Some(description);
        }
        if let Some(progress) = update.progress {
            initiative.progress = progress;
        }
        initiative.audit.touch(actor);
        self.store.update_initiative(&initiative).await?;

        match update.is_active {
            Some(active) => self.set_active(Level::Initiative, id, active, actor).await?,
            None => {
                self.recompute_project(initiative.project_id).await?;
            }
        }

        self.store
            .get_initiative(id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(Level::Initiative, id))
    }

    pub async fn update_goal(&self, id: Uuid, update: GoalUpdate, actor: &str) -> Result<Goal> {
        let mut goal = self
            .store
            .get_goal(id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(Level::Goal, id))?;

        if let Some(title) = update.title {
            goal.title = title;
        }
        if let Some(description) = update.description {
            goal.description = Some(description);
        }
        if let Some(progress) = update.progress {
            goal.progress = progress;
        }
        goal.audit.touch(actor);
        self.store.update_goal(&goal).await?;

        let project_id = self.owning_project(Level::Goal, id).await?;
        match update.is_active {
            Some(active) => self.set_active(Level::Goal, id, active, actor).await?,
            None => {
                self.recompute_project(project_id).await?;
            }
        }

        self.store
            .get_goal(id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(Level::Goal, id))
    }

    pub async fn update_objective(
        &self,
        id: Uuid,
        update: ObjectiveUpdate,
        actor: &str,
    ) -> Result<Objective> {
        let mut objective = self
            .store
            .get_objective(id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(Level::Objective, id))?;

        if let Some(title) = update.title {
            objective.title = title;
        }
        if let Some(description) = update.description {
            objective.description = Some(description);
        }
        if let Some(assignee) = update.assignee {
            objective.assignee = Some(assignee);
        }
        if let Some(year) = update.year {
            objective.year = Some(year);
        }
        if let Some(quarter) = update.quarter {
            objective.quarter = Some(quarter);
        }
        if let Some(due_date) = update.due_date {
            objective.due_date = Some(due_date);
        }
        if let Some(progress) = update.progress {
            objective.progress = progress;
        }
        objective.audit.touch(actor);
        self.store.update_objective(&objective).await?;

        let project_id = self.owning_project(Level::Objective, id).await?;
        match update.is_active {
            Some(active) => self.set_active(Level::Objective, id, active, actor).await?,
            None => {
                self.recompute_project(project_id).await?;
            }
        }

        self.store
            .get_objective(id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(Level::Objective, id))
    }

    pub async fn update_key_result(
        &self,
        id: Uuid,
        update: KeyResultUpdate,
        actor: &str,
    ) -> Result<KeyResult> {
        let mut key_result = self
            .store
            .get_key_result(id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(Level::KeyResult, id))?;

        let transition = lock_transition(&update, &key_result);
        let needs_recompute =
            transition != LockTransition::Keep || update.is_active.is_some();

        if let Some(title) = update.title {
            key_result.title = title;
        }
        if let Some(description) = update.description {
            key_result.description = Some(description);
        }
        if let Some(assignee) = update.assignee {
            key_result.assignee = Some(assignee);
        }
        if let Some(metric_start) = update.metric_start {
            key_result.metric_start = Some(metric_start);
        }
        if let Some(metric_target) = update.metric_target {
            key_result.metric_target = Some(metric_target);
        }
        if let Some(metric_current) = update.metric_current {
            key_result.metric_current = Some(metric_current);
        }
        if let Some(unit) = update.unit {
            key_result.unit = Some(unit);
        }
        if let Some(progress) = update.progress {
            key_result.progress = progress;
        }

        match transition {
            LockTransition::Lock => {
                debug!(key_result_id = %id, "progress edited directly, locking");
                key_result.manual_progress_set = true;
            }
            LockTransition::Unlock => {
                debug!(key_result_id = %id, "metrics edited, unlocking");
                key_result.manual_progress_set = false;
            }
            LockTransition::Keep => {}
        }

        key_result.audit.touch(actor);
        self.store.update_key_result(&key_result).await?;

        let project_id = self.owning_project(Level::KeyResult, id).await?;
        if let Some(active) = update.is_active {
            self.set_active(Level::KeyResult, id, active, actor).await?;
        } else if needs_recompute {
            self.recompute_project(project_id).await?;
        }

        self.store
            .get_key_result(id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(Level::KeyResult, id))
    }

    pub async fn update_action_item(
        &self,
        id: Uuid,
        update: ActionItemUpdate,
        actor: &str,
    ) -> Result<ActionItem> {
        let mut action_item = self
            .store
            .get_action_item(id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(Level::ActionItem, id))?;

        if let Some(title) = update.title {
            action_item.title = title;
        }
        if let Some(description) = update.description {
            action_item.description = Some(description);
        }
        if let Some(assignee) = update.assignee {
            action_item.assignee = Some(assignee);
        }
        if let Some(due_date) = update.due_date {
            action_item.due_date = Some(due_date);
        }

        // Keep progress and is_completed equivalent. An explicit non-zero
        // progress is the edit-dialog path and drives completion; otherwise
        // a completion toggle drives progress to 100/0.
        match (update.progress, update.is_completed) {
            (Some(progress), _) if progress > 0 => {
                action_item.progress = progress.clamp(0, 100);
                action_item.is_completed = action_item.progress >= 100;
            }
            (_, Some(is_completed)) => {
                action_item.is_completed = is_completed;
                action_item.progress = if is_completed { 100 } else { 0 };
            }
            _ => {}
        }

        action_item.audit.touch(actor);
        self.store.update_action_item(&action_item).await?;

        if let Some(active) = update.is_active {
            self.set_active(Level::ActionItem, id, active, actor).await?;
        }

        // Any action-item mutation unlocks the owning key result so the
        // roll-up derives from action items again.
        if let Some(mut kr) = self.store.get_key_result(action_item.key_result_id).await? {
            if kr.manual_progress_set {
                kr.manual_progress_set = false;
                self.store.update_key_result(&kr).await?;
            }
            let project_id = self
                .owning_project(Level::KeyResult, kr.id)
                .await?;
            self.recompute_project(project_id).await?;
        }

        self.store
            .get_action_item(id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(Level::ActionItem, id))
    }

    // ========================================================================
    // Activation cascade
    // ========================================================================

    /// Flip a node's active flag, cascade the flip through its descendants,
    /// then recompute the owning project.
    pub async fn set_active(
        &self,
        level: Level,
        id: Uuid,
        active: bool,
        actor: &str,
    ) -> Result<()> {
        let project_id = self.owning_project(level, id).await?;
        let tree = self
            .store
            .fetch_project_tree(project_id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(Level::Project, project_id))?;

        let stamp = ActorStamp::new(actor);
        let writes = cascade_at(&tree, level, id, active, &stamp)
            .ok_or_else(|| HierarchyError::not_found(level, id))?;

        debug!(
            %level,
            %id,
            active,
            nodes = writes.len(),
            "applying activation cascade"
        );
        self.store.apply_activation_writes(&writes).await?;
        self.recompute_project(project_id).await?;
        Ok(())
    }

    // ========================================================================
    // Roll-up
    // ========================================================================

    /// Recompute the whole project subtree bottom-up and persist changed
    /// values. Idempotent: a second call with no intervening mutation
    /// writes nothing.
    pub async fn recompute_project(&self, project_id: Uuid) -> Result<ProjectTree> {
        let mut tree = self
            .store
            .fetch_project_tree(project_id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(Level::Project, project_id))?;

        let writes = aggregator::rollup(&mut tree);
        if !writes.is_empty() {
            self.store.apply_progress_writes(&writes).await?;
        }
        debug!(%project_id, changed = writes.len(), "recomputed project");
        Ok(tree)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn owning_project(&self, level: Level, id: Uuid) -> Result<Uuid> {
        self.store
            .find_owning_project(level, id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(level, id))
    }
}

fn require_active_parent(level: Level, audit: &Audit) -> Result<()> {
    if !audit.is_active {
        return Err(HierarchyError::InvalidState(format!(
            "cannot attach a child under a soft-deleted {}",
            level
        )));
    }
    Ok(())
}

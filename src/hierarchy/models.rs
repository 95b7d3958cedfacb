//! Hierarchy entity models and DTOs
//!
//! Six levels of the strategic-planning tree:
//! Project → Strategic Initiative → Goal → Objective → Key Result → Action Item.
//! Every level carries the same audit block and an integer progress in [0,100]
//! that the aggregator rolls up from active children.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Levels
// ============================================================================

/// The six hierarchy levels, top to bottom.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Project,
    Initiative,
    Goal,
    Objective,
    KeyResult,
    ActionItem,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project => write!(f, "project"),
            Self::Initiative => write!(f, "initiative"),
            Self::Goal => write!(f, "goal"),
            Self::Objective => write!(f, "objective"),
            Self::KeyResult => write!(f, "key_result"),
            Self::ActionItem => write!(f, "action_item"),
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "project" | "projects" => Ok(Self::Project),
            "initiative" | "initiatives" | "strategic_initiative" => Ok(Self::Initiative),
            "goal" | "goals" => Ok(Self::Goal),
            "objective" | "objectives" => Ok(Self::Objective),
            "key_result" | "key_results" => Ok(Self::KeyResult),
            "action_item" | "action_items" => Ok(Self::ActionItem),
            _ => Err(format!("Unknown hierarchy level: {}", s)),
        }
    }
}

// ============================================================================
// Audit block
// ============================================================================

/// Audit fields shared by every hierarchy entity.
///
/// `closed_by`/`closed_date` are only present while the entity is
/// soft-deleted; restore clears them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Audit {
    pub is_active: bool,
    pub created_by: String,
    pub created_date: DateTime<Utc>,
    pub updated_by: String,
    pub updated_date: DateTime<Utc>,
    pub closed_by: Option<String>,
    pub closed_date: Option<DateTime<Utc>>,
}

impl Audit {
    /// Fresh audit block for a newly created entity.
    pub fn new(actor: &str) -> Self {
        let now = Utc::now();
        Self {
            is_active: true,
            created_by: actor.to_string(),
            created_date: now,
            updated_by: actor.to_string(),
            updated_date: now,
            closed_by: None,
            closed_date: None,
        }
    }

    /// Record a mutation by `actor`.
    pub fn touch(&mut self, actor: &str) {
        self.updated_by = actor.to_string();
        self.updated_date = Utc::now();
    }

    /// Soft-delete: deactivate and stamp who closed it.
    pub fn soft_delete(&mut self, actor: &str) {
        self.is_active = false;
        self.closed_by = Some(actor.to_string());
        self.closed_date = Some(Utc::now());
    }

    /// Restore: reactivate and clear the closed stamp.
    pub fn restore(&mut self) {
        self.is_active = true;
        self.closed_by = None;
        self.closed_date = None;
    }
}

// ============================================================================
// Entities
// ============================================================================

/// Root of the hierarchy. Progress is the mean of active initiatives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub progress: i32,
    #[serde(flatten)]
    pub audit: Audit,
}

/// A strategic initiative under a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategicInitiative {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub progress: i32,
    #[serde(flatten)]
    pub audit: Audit,
}

/// A goal under an initiative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub initiative_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub progress: i32,
    #[serde(flatten)]
    pub audit: Audit,
}

/// An objective under a goal, pinned to a planning period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Objective {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub year: Option<i32>,
    /// "Q1".."Q4"
    pub quarter: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub progress: i32,
    #[serde(flatten)]
    pub audit: Audit,
}

/// A key result under an objective.
///
/// Progress is derived from action items or from the metric range unless
/// `manual_progress_set` locks the stored value against recomputation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyResult {
    pub id: Uuid,
    pub objective_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub metric_start: Option<f64>,
    pub metric_target: Option<f64>,
    pub metric_current: Option<f64>,
    /// "%", "$", "users", ...
    pub unit: Option<String>,
    pub manual_progress_set: bool,
    pub progress: i32,
    #[serde(flatten)]
    pub audit: Audit,
}

/// Leaf of the hierarchy. `is_completed` and `progress == 100` are kept
/// equivalent after every committed mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionItem {
    pub id: Uuid,
    pub key_result_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub is_completed: bool,
    pub progress: i32,
    #[serde(flatten)]
    pub audit: Audit,
}

// ============================================================================
// Subtree views
// ============================================================================

/// Full project subtree as returned by the store's subtree fetch.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectTree {
    pub project: Project,
    pub initiatives: Vec<InitiativeTree>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitiativeTree {
    pub initiative: StrategicInitiative,
    pub goals: Vec<GoalTree>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalTree {
    pub goal: Goal,
    pub objectives: Vec<ObjectiveTree>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectiveTree {
    pub objective: Objective,
    pub key_results: Vec<KeyResultTree>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyResultTree {
    pub key_result: KeyResult,
    pub action_items: Vec<ActionItem>,
}

// ============================================================================
// Create payloads ("add under parent")
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProject {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewInitiative {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewGoal {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewObjective {
    pub title: String,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub year: Option<i32>,
    pub quarter: Option<String>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewKeyResult {
    pub title: String,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub metric_start: Option<f64>,
    pub metric_target: Option<f64>,
    pub metric_current: Option<f64>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewActionItem {
    pub title: String,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub is_completed: Option<bool>,
}

// ============================================================================
// Partial update payloads — None means "leave unchanged"
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub progress: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitiativeUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub progress: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoalUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub progress: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectiveUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub year: Option<i32>,
    pub quarter: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub progress: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyResultUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub metric_start: Option<f64>,
    pub metric_target: Option<f64>,
    pub metric_current: Option<f64>,
    pub unit: Option<String>,
    pub progress: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionItemUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub progress: Option<i32>,
    pub is_completed: Option<bool>,
    pub is_active: Option<bool>,
}

// ============================================================================
// Batched store writes
// ============================================================================

/// One recomputed progress value, applied in a single batch per project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressWrite {
    pub level: Level,
    pub id: Uuid,
    pub progress: i32,
}

/// One activation flip from a cascade, applied in a single batch so the
/// store can wrap the whole cascade in one unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationWrite {
    pub level: Level,
    pub id: Uuid,
    pub active: bool,
    pub closed_by: Option<String>,
    pub closed_date: Option<DateTime<Utc>>,
}

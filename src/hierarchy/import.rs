//! Bulk hierarchy import
//!
//! Consumes pre-parsed spreadsheet rows where each row may name an entity at
//! every level. Rows are processed top-down against an explicit cursor of
//! "current node per level" that is passed in and returned per row — no
//! service-level mutable state, so concurrent imports cannot trample each
//! other. Entities are found by title under the current parent or created;
//! action items are always created fresh. Every project touched by the
//! batch is recomputed once the rows are done.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::models::*;
use super::service::HierarchyService;
use super::HierarchyError;

type Result<T> = std::result::Result<T, HierarchyError>;

/// One row of a hierarchy import. Empty titles mean "no entity at this
/// level in this row"; the cursor carries the previous row's entities down.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportRow {
    pub project_title: Option<String>,
    pub project_description: Option<String>,
    pub initiative_title: Option<String>,
    pub initiative_description: Option<String>,
    pub goal_title: Option<String>,
    pub goal_description: Option<String>,
    pub objective_title: Option<String>,
    pub objective_description: Option<String>,
    pub objective_assignee: Option<String>,
    pub objective_year: Option<i32>,
    pub objective_quarter: Option<String>,
    pub objective_due_date: Option<NaiveDate>,
    pub kr_title: Option<String>,
    pub kr_description: Option<String>,
    pub kr_assignee: Option<String>,
    pub kr_metric_start: Option<f64>,
    pub kr_metric_target: Option<f64>,
    pub kr_metric_current: Option<f64>,
    pub kr_unit: Option<String>,
    pub action_item_title: Option<String>,
    pub action_item_description: Option<String>,
    pub action_item_assignee: Option<String>,
    pub action_item_due_date: Option<NaiveDate>,
    pub action_item_is_completed: Option<bool>,
}

/// Current node at each level while streaming rows. Local to one import
/// call; reset happens by dropping the lower levels whenever an upper
/// level changes.
#[derive(Debug, Default)]
pub struct ImportCursor {
    project: Option<Project>,
    initiative: Option<StrategicInitiative>,
    goal: Option<Goal>,
    objective: Option<Objective>,
    key_result: Option<KeyResult>,
}

/// Counts of what an import run did.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ImportSummary {
    pub rows: usize,
    pub projects_created: usize,
    pub initiatives_created: usize,
    pub goals_created: usize,
    pub objectives_created: usize,
    pub key_results_created: usize,
    pub action_items_created: usize,
    pub projects_recomputed: usize,
}

/// Run a batch of rows through the hierarchy service.
pub async fn import_rows(
    service: &HierarchyService,
    rows: &[ImportRow],
    actor: &str,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary {
        rows: rows.len(),
        ..Default::default()
    };
    let mut cursor = ImportCursor::default();
    let mut touched: HashSet<Uuid> = HashSet::new();

    for row in rows {
        cursor = process_row(service, cursor, row, actor, &mut summary).await?;
        if let Some(project) = &cursor.project {
            touched.insert(project.id);
        }
    }

    // Each touched project gets one final roll-up over its full tree.
    for project_id in &touched {
        service.recompute_project(*project_id).await?;
        summary.projects_recomputed += 1;
    }

    debug!(
        rows = summary.rows,
        projects = summary.projects_created,
        action_items = summary.action_items_created,
        recomputed = summary.projects_recomputed,
        "hierarchy import finished"
    );
    Ok(summary)
}

/// Advance the cursor through one row, creating missing entities as it
/// descends. Takes the cursor by value and hands it back, keeping the
/// import reentrant.
async fn process_row(
    service: &HierarchyService,
    mut cursor: ImportCursor,
    row: &ImportRow,
    actor: &str,
    summary: &mut ImportSummary,
) -> Result<ImportCursor> {
    // 1. Project
    if let Some(title) = non_empty(&row.project_title) {
        let stale = cursor
            .project
            .as_ref()
            .map(|p| p.title != title)
            .unwrap_or(true);
        if stale {
            let existing = service
                .list_projects()
                .await?
                .into_iter()
                .find(|p| p.title == title);
            let project = match existing {
                Some(p) => p,
                None => {
                    summary.projects_created += 1;
                    service
                        .create_project(
                            NewProject {
                                title,
                                description: row.project_description.clone(),
                            },
                            actor,
                        )
                        .await?
                }
            };
            cursor = ImportCursor {
                project: Some(project),
                ..Default::default()
            };
        }
    }
    let Some(project) = cursor.project.clone() else {
        return Ok(cursor);
    };

    // 2. Strategic initiative
    if let Some(title) = non_empty(&row.initiative_title) {
        let stale = cursor
            .initiative
            .as_ref()
            .map(|i| i.title != title)
            .unwrap_or(true);
        if stale {
            let existing = service
                .project_tree(project.id)
                .await?
                .initiatives
                .into_iter()
                .map(|t| t.initiative)
                .find(|i| i.title == title);
            let initiative = match existing {
                Some(i) => i,
                None => {
                    summary.initiatives_created += 1;
                    service
                        .add_initiative(
                            project.id,
                            NewInitiative {
                                title,
                                description: row.initiative_description.clone(),
                            },
                            actor,
                        )
                        .await?
                }
            };
            cursor.initiative = Some(initiative);
            cursor.goal = None;
            cursor.objective = None;
            cursor.key_result = None;
        }
    }
    let Some(initiative) = cursor.initiative.clone() else {
        return Ok(cursor);
    };

    // 3. Goal
    if let Some(title) = non_empty(&row.goal_title) {
        let stale = cursor
            .goal
            .as_ref()
            .map(|g| g.title != title)
            .unwrap_or(true);
        if stale {
            let existing = service
                .project_tree(project.id)
                .await?
                .initiatives
                .into_iter()
                .find(|t| t.initiative.id == initiative.id)
                .map(|t| t.goals)
                .unwrap_or_default()
                .into_iter()
                .map(|t| t.goal)
                .find(|g| g.title == title);
            let goal = match existing {
                Some(g) => g,
                None => {
                    summary.goals_created += 1;
                    service
                        .add_goal(
                            initiative.id,
                            NewGoal {
                                title,
                                description: row.goal_description.clone(),
                            },
                            actor,
                        )
                        .await?
                }
            };
            cursor.goal = Some(goal);
            cursor.objective = None;
            cursor.key_result = None;
        }
    }
    let Some(goal) = cursor.goal.clone() else {
        return Ok(cursor);
    };

    // 4. Objective
    if let Some(title) = non_empty(&row.objective_title) {
        let stale = cursor
            .objective
            .as_ref()
            .map(|o| o.title != title)
            .unwrap_or(true);
        if stale {
            let existing = service
                .project_tree(project.id)
                .await?
                .initiatives
                .into_iter()
                .flat_map(|t| t.goals)
                .find(|t| t.goal.id == goal.id)
                .map(|t| t.objectives)
                .unwrap_or_default()
                .into_iter()
                .map(|t| t.objective)
                .find(|o| o.title == title);
            let objective = match existing {
                Some(o) => o,
                None => {
                    summary.objectives_created += 1;
                    service
                        .add_objective(
                            goal.id,
                            NewObjective {
                                title,
                                description: row.objective_description.clone(),
                                assignee: row.objective_assignee.clone(),
                                year: row.objective_year,
                                quarter: row.objective_quarter.clone(),
                                due_date: row.objective_due_date,
                            },
                            actor,
                        )
                        .await?
                }
            };
            cursor.objective = Some(objective);
            cursor.key_result = None;
        }
    }
    let Some(objective) = cursor.objective.clone() else {
        return Ok(cursor);
    };

    // 5. Key result
    if let Some(title) = non_empty(&row.kr_title) {
        let stale = cursor
            .key_result
            .as_ref()
            .map(|k| k.title != title)
            .unwrap_or(true);
        if stale {
            let existing = service
                .project_tree(project.id)
                .await?
                .initiatives
                .into_iter()
                .flat_map(|t| t.goals)
                .flat_map(|t| t.objectives)
                .find(|t| t.objective.id == objective.id)
                .map(|t| t.key_results)
                .unwrap_or_default()
                .into_iter()
                .map(|t| t.key_result)
                .find(|k| k.title == title);
            let key_result = match existing {
                Some(k) => k,
                None => {
                    summary.key_results_created += 1;
                    service
                        .add_key_result(
                            objective.id,
                            NewKeyResult {
                                title,
                                description: row.kr_description.clone(),
                                assignee: row.kr_assignee.clone(),
                                metric_start: Some(row.kr_metric_start.unwrap_or(0.0)),
                                metric_target: Some(row.kr_metric_target.unwrap_or(0.0)),
                                metric_current: Some(row.kr_metric_current.unwrap_or(0.0)),
                                unit: row.kr_unit.clone(),
                            },
                            actor,
                        )
                        .await?
                }
            };
            cursor.key_result = Some(key_result);
        }
    }
    let Some(key_result) = cursor.key_result.clone() else {
        return Ok(cursor);
    };

    // 6. Action item — no find-or-create, each mention is a new item
    if let Some(title) = non_empty(&row.action_item_title) {
        summary.action_items_created += 1;
        service
            .add_action_item(
                key_result.id,
                NewActionItem {
                    title,
                    description: row.action_item_description.clone(),
                    assignee: row.action_item_assignee.clone(),
                    due_date: row.action_item_due_date,
                    is_completed: row.action_item_is_completed,
                },
                actor,
            )
            .await?;
    }

    Ok(cursor)
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

//! Bottom-up progress roll-up
//!
//! Pure computation over a fetched [`ProjectTree`]: strict post-order, leaves
//! to root, honoring the per-key-result manual override lock. The caller
//! persists the returned writes in one batch, so running the roll-up twice
//! against an unchanged tree yields no writes at all.

use super::models::{ActionItem, KeyResult, Level, ProgressWrite, ProjectTree};

/// Roll progress up through the whole tree.
///
/// Mutates the in-memory tree so callers can return the freshly computed
/// subtree without re-fetching, and returns the set of nodes whose stored
/// progress actually changed. Inactive nodes are skipped entirely and keep
/// their stored values.
pub fn rollup(tree: &mut ProjectTree) -> Vec<ProgressWrite> {
    let mut writes = Vec::new();

    let mut initiative_values = Vec::new();
    for init_tree in &mut tree.initiatives {
        if !init_tree.initiative.audit.is_active {
            continue;
        }

        let mut goal_values = Vec::new();
        for goal_tree in &mut init_tree.goals {
            if !goal_tree.goal.audit.is_active {
                continue;
            }

            let mut objective_values = Vec::new();
            for obj_tree in &mut goal_tree.objectives {
                if !obj_tree.objective.audit.is_active {
                    continue;
                }

                let mut kr_values = Vec::new();
                for kr_tree in &mut obj_tree.key_results {
                    if !kr_tree.key_result.audit.is_active {
                        continue;
                    }
                    let progress =
                        key_result_progress(&kr_tree.key_result, &kr_tree.action_items);
                    record(
                        &mut writes,
                        Level::KeyResult,
                        kr_tree.key_result.id,
                        &mut kr_tree.key_result.progress,
                        progress,
                    );
                    kr_values.push(progress);
                }

                let progress = mean_progress(&kr_values);
                record(
                    &mut writes,
                    Level::Objective,
                    obj_tree.objective.id,
                    &mut obj_tree.objective.progress,
                    progress,
                );
                objective_values.push(progress);
            }

            let progress = mean_progress(&objective_values);
            record(
                &mut writes,
                Level::Goal,
                goal_tree.goal.id,
                &mut goal_tree.goal.progress,
                progress,
            );
            goal_values.push(progress);
        }

        let progress = mean_progress(&goal_values);
        record(
            &mut writes,
            Level::Initiative,
            init_tree.initiative.id,
            &mut init_tree.initiative.progress,
            progress,
        );
        initiative_values.push(progress);
    }

    let progress = mean_progress(&initiative_values);
    record(
        &mut writes,
        Level::Project,
        tree.project.id,
        &mut tree.project.progress,
        progress,
    );

    writes
}

/// Progress of a single key result from its action items or metric range.
///
/// Order matters: the manual lock wins outright; any existing action items
/// (active or not) take the roll-up path; only then does the metric range
/// apply; with neither, the stored value stands.
pub fn key_result_progress(kr: &KeyResult, action_items: &[ActionItem]) -> i32 {
    if kr.manual_progress_set {
        return kr.progress.clamp(0, 100);
    }

    if !action_items.is_empty() {
        let active: Vec<i64> = action_items
            .iter()
            .filter(|ai| ai.audit.is_active)
            .map(|ai| ai.progress as i64)
            .collect();
        if active.is_empty() {
            // Every action item was soft-deleted: the key result collapses
            // to 0 rather than keeping a stale derived value.
            return 0;
        }
        let mean = active.iter().sum::<i64>() as f64 / active.len() as f64;
        return (mean.round() as i32).clamp(0, 100);
    }

    if let (Some(target), Some(current)) = (kr.metric_target, kr.metric_current) {
        let start = kr.metric_start.unwrap_or(0.0);
        if target == start {
            // Zero metric range is defined as 0%, not an error.
            return 0;
        }
        let ratio = ((current - start) / (target - start)).clamp(0.0, 1.0);
        return (ratio * 100.0).round() as i32;
    }

    kr.progress.clamp(0, 100)
}

/// Round-half-up mean of child progress values; exactly 0 for no children.
fn mean_progress(values: &[i32]) -> i32 {
    if values.is_empty() {
        return 0;
    }
    let mean = values.iter().map(|v| *v as i64).sum::<i64>() as f64 / values.len() as f64;
    (mean.round() as i32).clamp(0, 100)
}

fn record(
    writes: &mut Vec<ProgressWrite>,
    level: Level,
    id: uuid::Uuid,
    stored: &mut i32,
    computed: i32,
) {
    if *stored != computed {
        writes.push(ProgressWrite {
            level,
            id,
            progress: computed,
        });
        *stored = computed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        action_item, chain_tree, goal, initiative, key_result, objective, project,
    };
    use crate::hierarchy::models::{
        GoalTree, InitiativeTree, KeyResultTree, ObjectiveTree, ProjectTree,
    };

    #[test]
    fn test_binary_action_item_rollup_propagates_to_project() {
        // 1 of 2 action items complete → 50% at every level of a single chain
        let mut tree = chain_tree();
        let kr_id = tree.initiatives[0].goals[0].objectives[0].key_results[0]
            .key_result
            .id;
        tree.initiatives[0].goals[0].objectives[0].key_results[0]
            .action_items = vec![
            action_item(kr_id, "done", true),
            action_item(kr_id, "pending", false),
        ];

        let writes = rollup(&mut tree);

        assert_eq!(tree.project.progress, 50);
        assert_eq!(tree.initiatives[0].initiative.progress, 50);
        assert_eq!(tree.initiatives[0].goals[0].goal.progress, 50);
        assert_eq!(
            tree.initiatives[0].goals[0].objectives[0].objective.progress,
            50
        );
        assert_eq!(
            tree.initiatives[0].goals[0].objectives[0].key_results[0]
                .key_result
                .progress,
            50
        );
        // one write per level of the chain
        assert_eq!(writes.len(), 5);
    }

    #[test]
    fn test_metric_based_progress() {
        let mut kr = key_result(uuid::Uuid::new_v4(), "metric kr");
        kr.metric_start = Some(10.0);
        kr.metric_target = Some(110.0);
        kr.metric_current = Some(35.0);
        assert_eq!(key_result_progress(&kr, &[]), 25);
    }

    #[test]
    fn test_metric_start_defaults_to_zero() {
        let mut kr = key_result(uuid::Uuid::new_v4(), "no start");
        kr.metric_target = Some(200.0);
        kr.metric_current = Some(50.0);
        assert_eq!(key_result_progress(&kr, &[]), 25);
    }

    #[test]
    fn test_zero_metric_range_is_zero_not_error() {
        let mut kr = key_result(uuid::Uuid::new_v4(), "flat");
        kr.metric_start = Some(50.0);
        kr.metric_target = Some(50.0);
        kr.metric_current = Some(9999.0);
        assert_eq!(key_result_progress(&kr, &[]), 0);
    }

    #[test]
    fn test_metric_progress_clamps_to_range() {
        let mut kr = key_result(uuid::Uuid::new_v4(), "overshoot");
        kr.metric_start = Some(0.0);
        kr.metric_target = Some(100.0);

        kr.metric_current = Some(250.0);
        assert_eq!(key_result_progress(&kr, &[]), 100);

        kr.metric_current = Some(-40.0);
        assert_eq!(key_result_progress(&kr, &[]), 0);
    }

    #[test]
    fn test_missing_metric_current_keeps_stored_value() {
        let mut kr = key_result(uuid::Uuid::new_v4(), "incomplete metrics");
        kr.metric_target = Some(100.0);
        kr.metric_current = None;
        // fresh KR stores 0, so "keep stored" resolves to 0
        assert_eq!(key_result_progress(&kr, &[]), 0);

        kr.progress = 42;
        assert_eq!(key_result_progress(&kr, &[]), 42);
    }

    #[test]
    fn test_manual_lock_wins_over_action_items_and_metrics() {
        let mut kr = key_result(uuid::Uuid::new_v4(), "locked");
        kr.manual_progress_set = true;
        kr.progress = 73;
        kr.metric_target = Some(100.0);
        kr.metric_current = Some(1.0);
        let ais = vec![action_item(kr.id, "done", true)];
        assert_eq!(key_result_progress(&kr, &ais), 73);
    }

    #[test]
    fn test_all_action_items_inactive_collapses_to_zero() {
        let mut kr = key_result(uuid::Uuid::new_v4(), "emptied");
        kr.progress = 80;
        let mut ai = action_item(kr.id, "gone", true);
        ai.audit.soft_delete("admin@example.com");
        assert_eq!(key_result_progress(&kr, &[ai]), 0);
    }

    #[test]
    fn test_action_item_mean_rounds_half_up() {
        let kr = key_result(uuid::Uuid::new_v4(), "thirds");
        let ais = vec![
            action_item(kr.id, "a", true),
            action_item(kr.id, "b", false),
            action_item(kr.id, "c", false),
        ];
        // 100 / 3 = 33.33 → 33
        assert_eq!(key_result_progress(&kr, &ais), 33);

        let ais = vec![
            action_item(kr.id, "a", true),
            action_item(kr.id, "b", true),
            action_item(kr.id, "c", false),
        ];
        // 200 / 3 = 66.67 → 67
        assert_eq!(key_result_progress(&kr, &ais), 67);
    }

    #[test]
    fn test_inactive_initiative_excluded_from_project_mean() {
        // Initiative A at 0, initiative B manually at 100 then soft-deleted:
        // the project drops from 50 to 0.
        let p = project("two initiatives");
        let init_a = initiative(p.id, "A");
        let mut init_b = initiative(p.id, "B");
        init_b.progress = 100;

        let mut tree = ProjectTree {
            project: p,
            initiatives: vec![
                InitiativeTree {
                    initiative: init_a,
                    goals: vec![],
                },
                InitiativeTree {
                    initiative: init_b.clone(),
                    goals: vec![],
                },
            ],
        };

        // B has no children, so its own progress recomputes to 0 while
        // active; give it a locked chain instead to hold 100.
        let g = goal(init_b.id, "g");
        let o = objective(g.id, "o");
        let mut kr = key_result(o.id, "kr");
        kr.manual_progress_set = true;
        kr.progress = 100;
        tree.initiatives[1].goals = vec![GoalTree {
            goal: g,
            objectives: vec![ObjectiveTree {
                objective: o,
                key_results: vec![KeyResultTree {
                    key_result: kr,
                    action_items: vec![],
                }],
            }],
        }];

        rollup(&mut tree);
        assert_eq!(tree.project.progress, 50);

        tree.initiatives[1]
            .initiative
            .audit
            .soft_delete("admin@example.com");
        rollup(&mut tree);
        assert_eq!(tree.project.progress, 0);
    }

    #[test]
    fn test_empty_active_children_yield_zero_at_every_level() {
        let mut tree = chain_tree();
        tree.project.progress = 77;
        tree.initiatives.clear();
        let writes = rollup(&mut tree);
        assert_eq!(tree.project.progress, 0);
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].level, Level::Project);
        assert_eq!(writes[0].progress, 0);
    }

    #[test]
    fn test_rollup_is_idempotent() {
        let mut tree = chain_tree();
        let kr_id = tree.initiatives[0].goals[0].objectives[0].key_results[0]
            .key_result
            .id;
        tree.initiatives[0].goals[0].objectives[0].key_results[0]
            .action_items = vec![
            action_item(kr_id, "done", true),
            action_item(kr_id, "pending", false),
        ];

        let first = rollup(&mut tree);
        assert!(!first.is_empty());
        let second = rollup(&mut tree);
        assert!(second.is_empty(), "second pass must not change anything");
    }

    #[test]
    fn test_kr_under_inactive_objective_keeps_stored_progress() {
        let mut tree = chain_tree();
        {
            let obj_tree = &mut tree.initiatives[0].goals[0].objectives[0];
            obj_tree.objective.audit.soft_delete("admin@example.com");
            let kr_tree = &mut obj_tree.key_results[0];
            kr_tree.key_result.progress = 64;
            let kr_id = kr_tree.key_result.id;
            kr_tree.action_items = vec![action_item(kr_id, "done", true)];
        }

        rollup(&mut tree);
        // the KR is not touched and the goal sees no active objectives
        assert_eq!(
            tree.initiatives[0].goals[0].objectives[0].key_results[0]
                .key_result
                .progress,
            64
        );
        assert_eq!(tree.initiatives[0].goals[0].goal.progress, 0);
    }
}

//! Soft-delete / restore cascade
//!
//! Propagates an activation flip from a node to every descendant, one level
//! type at a time, as a set of batched writes. One function per level — each
//! knows only its own child collection, so there is no runtime type
//! dispatch. The cascade never recomputes progress itself; the service that
//! invoked it triggers the project roll-up afterwards.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::{
    ActionItem, ActivationWrite, Audit, GoalTree, InitiativeTree, KeyResultTree, Level,
    ObjectiveTree, ProjectTree,
};

/// Who flipped the flag, and when. Every node touched by one cascade gets
/// the same stamp.
#[derive(Debug, Clone)]
pub struct ActorStamp {
    pub actor: String,
    pub at: DateTime<Utc>,
}

impl ActorStamp {
    pub fn new(actor: &str) -> Self {
        Self {
            actor: actor.to_string(),
            at: Utc::now(),
        }
    }
}

/// Collect the activation writes for flipping the node `(level, id)` and its
/// descendants inside `tree`. Returns `None` when the node is not part of
/// the tree.
pub fn cascade_at(
    tree: &ProjectTree,
    level: Level,
    id: Uuid,
    active: bool,
    stamp: &ActorStamp,
) -> Option<Vec<ActivationWrite>> {
    let mut writes = Vec::new();
    let found = match level {
        Level::Project => {
            if tree.project.id != id {
                return None;
            }
            cascade_project(tree, active, stamp, &mut writes);
            true
        }
        Level::Initiative => tree
            .initiatives
            .iter()
            .find(|t| t.initiative.id == id)
            .map(|t| cascade_initiative(t, active, stamp, &mut writes))
            .is_some(),
        Level::Goal => tree
            .initiatives
            .iter()
            .flat_map(|i| &i.goals)
            .find(|t| t.goal.id == id)
            .map(|t| cascade_goal(t, active, stamp, &mut writes))
            .is_some(),
        Level::Objective => tree
            .initiatives
            .iter()
            .flat_map(|i| &i.goals)
            .flat_map(|g| &g.objectives)
            .find(|t| t.objective.id == id)
            .map(|t| cascade_objective(t, active, stamp, &mut writes))
            .is_some(),
        Level::KeyResult => tree
            .initiatives
            .iter()
            .flat_map(|i| &i.goals)
            .flat_map(|g| &g.objectives)
            .flat_map(|o| &o.key_results)
            .find(|t| t.key_result.id == id)
            .map(|t| cascade_key_result(t, active, stamp, &mut writes))
            .is_some(),
        Level::ActionItem => tree
            .initiatives
            .iter()
            .flat_map(|i| &i.goals)
            .flat_map(|g| &g.objectives)
            .flat_map(|o| &o.key_results)
            .flat_map(|k| &k.action_items)
            .find(|ai| ai.id == id)
            .map(|ai| cascade_action_item(ai, active, stamp, &mut writes))
            .is_some(),
    };

    found.then_some(writes)
}

pub fn cascade_project(
    tree: &ProjectTree,
    active: bool,
    stamp: &ActorStamp,
    out: &mut Vec<ActivationWrite>,
) {
    push_write(Level::Project, tree.project.id, &tree.project.audit, active, stamp, out);
    for init_tree in &tree.initiatives {
        cascade_initiative(init_tree, active, stamp, out);
    }
}

pub fn cascade_initiative(
    tree: &InitiativeTree,
    active: bool,
    stamp: &ActorStamp,
    out: &mut Vec<ActivationWrite>,
) {
    push_write(
        Level::Initiative,
        tree.initiative.id,
        &tree.initiative.audit,
        active,
        stamp,
        out,
    );
    for goal_tree in &tree.goals {
        cascade_goal(goal_tree, active, stamp, out);
    }
}

pub fn cascade_goal(
    tree: &GoalTree,
    active: bool,
    stamp: &ActorStamp,
    out: &mut Vec<ActivationWrite>,
) {
    push_write(Level::Goal, tree.goal.id, &tree.goal.audit, active, stamp, out);
    for obj_tree in &tree.objectives {
        cascade_objective(obj_tree, active, stamp, out);
    }
}

pub fn cascade_objective(
    tree: &ObjectiveTree,
    active: bool,
    stamp: &ActorStamp,
    out: &mut Vec<ActivationWrite>,
) {
    push_write(
        Level::Objective,
        tree.objective.id,
        &tree.objective.audit,
        active,
        stamp,
        out,
    );
    for kr_tree in &tree.key_results {
        cascade_key_result(kr_tree, active, stamp, out);
    }
}

pub fn cascade_key_result(
    tree: &KeyResultTree,
    active: bool,
    stamp: &ActorStamp,
    out: &mut Vec<ActivationWrite>,
) {
    push_write(
        Level::KeyResult,
        tree.key_result.id,
        &tree.key_result.audit,
        active,
        stamp,
        out,
    );
    for ai in &tree.action_items {
        cascade_action_item(ai, active, stamp, out);
    }
}

/// Action items are leaves; nothing cascades below them.
pub fn cascade_action_item(
    ai: &ActionItem,
    active: bool,
    stamp: &ActorStamp,
    out: &mut Vec<ActivationWrite>,
) {
    push_write(Level::ActionItem, ai.id, &ai.audit, active, stamp, out);
}

/// Deactivation only stamps currently-active nodes; restore only touches
/// currently-inactive ones. Nodes already in the target state keep their
/// existing stamps, but recursion continues past them so an active node
/// stranded under an inactive ancestor still gets swept up.
fn push_write(
    level: Level,
    id: Uuid,
    audit: &Audit,
    active: bool,
    stamp: &ActorStamp,
    out: &mut Vec<ActivationWrite>,
) {
    if audit.is_active == active {
        return;
    }
    let (closed_by, closed_date) = if active {
        (None, None)
    } else {
        (Some(stamp.actor.clone()), Some(stamp.at))
    };
    out.push(ActivationWrite {
        level,
        id,
        active,
        closed_by,
        closed_date,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{action_item, chain_tree};

    fn stamp() -> ActorStamp {
        ActorStamp::new("admin@example.com")
    }

    #[test]
    fn test_deactivate_project_touches_every_active_descendant() {
        let mut tree = chain_tree();
        let kr_id = tree.initiatives[0].goals[0].objectives[0].key_results[0]
            .key_result
            .id;
        tree.initiatives[0].goals[0].objectives[0].key_results[0]
            .action_items = vec![
            action_item(kr_id, "a", false),
            action_item(kr_id, "b", true),
        ];

        let stamp = stamp();
        let writes = cascade_at(&tree, Level::Project, tree.project.id, false, &stamp).unwrap();

        // project + initiative + goal + objective + key result + 2 action items
        assert_eq!(writes.len(), 7);
        for w in &writes {
            assert!(!w.active);
            assert_eq!(w.closed_by.as_deref(), Some("admin@example.com"));
            assert_eq!(w.closed_date, Some(stamp.at));
        }
    }

    #[test]
    fn test_deactivate_skips_already_inactive_nodes() {
        let mut tree = chain_tree();
        tree.initiatives[0].goals[0]
            .goal
            .audit
            .soft_delete("earlier@example.com");

        let writes =
            cascade_at(&tree, Level::Project, tree.project.id, false, &stamp()).unwrap();

        // the goal keeps its original stamp; its still-active descendants
        // are swept anyway
        assert!(!writes.iter().any(|w| w.level == Level::Goal));
        assert!(writes.iter().any(|w| w.level == Level::Objective));
        assert!(writes.iter().any(|w| w.level == Level::KeyResult));
    }

    #[test]
    fn test_cascade_from_mid_level_only_covers_subtree() {
        let tree = chain_tree();
        let goal_id = tree.initiatives[0].goals[0].goal.id;

        let writes = cascade_at(&tree, Level::Goal, goal_id, false, &stamp()).unwrap();

        assert_eq!(writes.len(), 3); // goal + objective + key result
        assert!(!writes.iter().any(|w| w.level == Level::Project));
        assert!(!writes.iter().any(|w| w.level == Level::Initiative));
    }

    #[test]
    fn test_restore_clears_stamps_on_inactive_descendants() {
        let mut tree = chain_tree();
        // deactivate everything first
        let down = cascade_at(&tree, Level::Project, tree.project.id, false, &stamp()).unwrap();
        assert_eq!(down.len(), 5);
        tree.project.audit.soft_delete("x");
        tree.initiatives[0].initiative.audit.soft_delete("x");
        tree.initiatives[0].goals[0].goal.audit.soft_delete("x");
        tree.initiatives[0].goals[0].objectives[0]
            .objective
            .audit
            .soft_delete("x");
        tree.initiatives[0].goals[0].objectives[0].key_results[0]
            .key_result
            .audit
            .soft_delete("x");

        let up = cascade_at(&tree, Level::Project, tree.project.id, true, &stamp()).unwrap();
        assert_eq!(up.len(), 5);
        for w in &up {
            assert!(w.active);
            assert!(w.closed_by.is_none());
            assert!(w.closed_date.is_none());
        }
    }

    #[test]
    fn test_restore_is_noop_on_active_tree() {
        let tree = chain_tree();
        let writes =
            cascade_at(&tree, Level::Project, tree.project.id, true, &stamp()).unwrap();
        assert!(writes.is_empty());
    }

    #[test]
    fn test_unknown_node_returns_none() {
        let tree = chain_tree();
        assert!(cascade_at(&tree, Level::Goal, Uuid::new_v4(), false, &stamp()).is_none());
    }

    #[test]
    fn test_action_item_does_not_cascade_further() {
        let mut tree = chain_tree();
        let kr_id = tree.initiatives[0].goals[0].objectives[0].key_results[0]
            .key_result
            .id;
        let ai = action_item(kr_id, "leaf", false);
        let ai_id = ai.id;
        tree.initiatives[0].goals[0].objectives[0].key_results[0]
            .action_items = vec![ai];

        let writes = cascade_at(&tree, Level::ActionItem, ai_id, false, &stamp()).unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].level, Level::ActionItem);
    }
}

//! Access scope resolution
//!
//! Pure functions from a user's roles, role scopes, direct assignments, and
//! primary project to the set of visible projects and the per-project access
//! level. Callers fetch the inputs; nothing here touches the store.
//!
//! Note the two readings of an empty role scope: `accessible_projects`
//! treats it as contributing nothing, while `access_level_for` treats the
//! same emptiness as "global role → viewer everywhere". Both readings are
//! deliberate, preserved from the system this replaces, and pinned by the
//! tests below; see DESIGN.md before "fixing" either one.

use std::collections::HashSet;
use uuid::Uuid;

use super::models::{AccessLevel, User, UserProjectAssignment, VIEW_ALL_PROJECTS};

/// Project ids `user` may see.
///
/// `VIEW_ALL_PROJECTS` on any active role short-circuits to every active
/// project. Otherwise the result is the union of direct assignments,
/// explicitly scoped role projects, and the legacy primary project. An
/// empty result means the user sees nothing — that is a normal outcome,
/// not an error.
pub fn accessible_projects(
    user: &User,
    assignments: &[UserProjectAssignment],
    active_project_ids: &[Uuid],
) -> HashSet<Uuid> {
    if user.has_permission(VIEW_ALL_PROJECTS) {
        return active_project_ids.iter().copied().collect();
    }

    let mut accessible: HashSet<Uuid> = assignments
        .iter()
        .filter(|a| a.user_id == user.id)
        .map(|a| a.project_id)
        .collect();

    for role in user.roles.iter().filter(|r| r.audit.is_active) {
        // An empty scope list contributes nothing here; it does NOT mean
        // "every project".
        accessible.extend(role.scoped_project_ids.iter().copied());
    }

    if let Some(primary) = user.primary_project_id {
        accessible.insert(primary);
    }

    accessible
}

/// Most specific access level `user` holds on `project_id`, or `None` for
/// no access.
///
/// Priority: a direct assignment's explicit level, then membership via a
/// role scoped to the project, then viewer via a global (empty-scope) role,
/// then viewer via `VIEW_ALL_PROJECTS`.
pub fn access_level_for(
    user: &User,
    assignments: &[UserProjectAssignment],
    project_id: Uuid,
) -> Option<AccessLevel> {
    if let Some(assignment) = assignments
        .iter()
        .find(|a| a.user_id == user.id && a.project_id == project_id)
    {
        return Some(assignment.access_level);
    }

    let active_roles: Vec<_> = user.roles.iter().filter(|r| r.audit.is_active).collect();

    if active_roles
        .iter()
        .any(|r| r.scoped_project_ids.contains(&project_id))
    {
        return Some(AccessLevel::Member);
    }

    if active_roles.iter().any(|r| r.is_global()) {
        return Some(AccessLevel::Viewer);
    }

    if user.has_permission(VIEW_ALL_PROJECTS) {
        return Some(AccessLevel::Viewer);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::models::{Role, MANAGE_STRATEGY, VIEW_STRATEGY};
    use crate::hierarchy::models::Audit;
    use chrono::Utc;

    fn role(name: &str, permissions: &[&str], scope: Vec<Uuid>) -> Role {
        Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            is_system: false,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            scoped_project_ids: scope,
            audit: Audit::new("seed"),
        }
    }

    fn user(roles: Vec<Role>) -> User {
        User {
            id: Uuid::new_v4(),
            first_name: Some("Ada".to_string()),
            last_name: None,
            email: "ada@example.com".to_string(),
            login: "ada".to_string(),
            avatar: None,
            primary_project_id: None,
            roles,
            audit: Audit::new("seed"),
        }
    }

    fn assignment(user_id: Uuid, project_id: Uuid, level: AccessLevel) -> UserProjectAssignment {
        UserProjectAssignment {
            user_id,
            project_id,
            access_level: level,
            assigned_by: Some("seed".to_string()),
            assigned_date: Utc::now(),
        }
    }

    #[test]
    fn test_view_all_short_circuits_to_all_active_projects() {
        let all: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let u = user(vec![role("admin", &[VIEW_ALL_PROJECTS], vec![])]);
        // even a direct assignment to a project outside the active list
        // is irrelevant once the bypass applies
        let extra = assignment(u.id, Uuid::new_v4(), AccessLevel::Owner);

        let ids = accessible_projects(&u, &[extra], &all);
        assert_eq!(ids, all.iter().copied().collect());
    }

    #[test]
    fn test_union_of_assignments_scopes_and_primary() {
        let direct = Uuid::new_v4();
        let scoped = Uuid::new_v4();
        let primary = Uuid::new_v4();

        let mut u = user(vec![role("pm", &[VIEW_STRATEGY], vec![scoped])]);
        u.primary_project_id = Some(primary);
        let a = assignment(u.id, direct, AccessLevel::Member);

        let ids = accessible_projects(&u, &[a], &[]);
        assert_eq!(ids, [direct, scoped, primary].into_iter().collect());
    }

    #[test]
    fn test_empty_role_scope_contributes_no_projects() {
        // Pinned: in the accessible-set computation an empty scope is NOT
        // "all projects".
        let u = user(vec![role("pm", &[VIEW_STRATEGY, MANAGE_STRATEGY], vec![])]);
        let all: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        assert!(accessible_projects(&u, &[], &all).is_empty());
    }

    #[test]
    fn test_empty_role_scope_grants_global_viewer_level() {
        // Pinned: the same empty scope reads as "global role" in the
        // level lookup and yields viewer access anywhere.
        let u = user(vec![role("pm", &[VIEW_STRATEGY], vec![])]);
        let anywhere = Uuid::new_v4();
        assert_eq!(
            access_level_for(&u, &[], anywhere),
            Some(AccessLevel::Viewer)
        );
    }

    #[test]
    fn test_direct_assignment_level_takes_priority() {
        let project = Uuid::new_v4();
        let u = user(vec![role("pm", &[VIEW_STRATEGY], vec![project])]);
        let a = assignment(u.id, project, AccessLevel::Owner);
        assert_eq!(
            access_level_for(&u, &[a], project),
            Some(AccessLevel::Owner)
        );
    }

    #[test]
    fn test_scoped_role_beats_global_role() {
        // "Most specific wins": a role scoped to the project yields member
        // even when another role is global.
        let project = Uuid::new_v4();
        let u = user(vec![
            role("global-viewer", &[VIEW_STRATEGY], vec![]),
            role("team", &[VIEW_STRATEGY], vec![project]),
        ]);
        assert_eq!(
            access_level_for(&u, &[], project),
            Some(AccessLevel::Member)
        );
    }

    #[test]
    fn test_view_all_grants_viewer_level() {
        let u = user(vec![role("auditor", &[VIEW_ALL_PROJECTS], vec![])]);
        // an empty-scope role also matches the global-role rule first, so
        // use a scoped role to isolate the VIEW_ALL fallback
        let scoped_elsewhere = Uuid::new_v4();
        let u2 = user(vec![role(
            "auditor",
            &[VIEW_ALL_PROJECTS],
            vec![scoped_elsewhere],
        )]);
        let target = Uuid::new_v4();
        assert_eq!(access_level_for(&u, &[], target), Some(AccessLevel::Viewer));
        assert_eq!(
            access_level_for(&u2, &[], target),
            Some(AccessLevel::Viewer)
        );
    }

    #[test]
    fn test_no_access_is_absence_not_error() {
        let u = user(vec![role("pm", &[VIEW_STRATEGY], vec![Uuid::new_v4()])]);
        assert_eq!(access_level_for(&u, &[], Uuid::new_v4()), None);
        assert!(accessible_projects(&u, &[], &[]).len() == 1);
    }

    #[test]
    fn test_inactive_role_is_ignored() {
        let project = Uuid::new_v4();
        let mut r = role("pm", &[VIEW_ALL_PROJECTS], vec![project]);
        r.audit.soft_delete("seed");
        let u = user(vec![r]);

        assert!(accessible_projects(&u, &[], &[project]).is_empty());
        assert_eq!(access_level_for(&u, &[], project), None);
    }

    #[test]
    fn test_assignments_of_other_users_do_not_leak() {
        let project = Uuid::new_v4();
        let u = user(vec![]);
        let someone_else = assignment(Uuid::new_v4(), project, AccessLevel::Owner);

        assert!(accessible_projects(&u, &[someone_else.clone()], &[]).is_empty());
        assert_eq!(access_level_for(&u, &[someone_else], project), None);
    }
}

//! Access service
//!
//! Fetches the inputs the pure resolver needs (user, assignments, active
//! project ids) and exposes the administration operations: user CRUD,
//! user↔project assignment, and role project scoping.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use super::models::{AccessLevel, NewUser, Role, User, UserProjectAssignment, UserUpdate};
use super::resolver;
use crate::hierarchy::models::{Audit, Level, Project};
use crate::hierarchy::HierarchyError;
use crate::neo4j::HierarchyStore;

type Result<T> = std::result::Result<T, HierarchyError>;

pub struct AccessService {
    store: Arc<dyn HierarchyStore>,
}

impl AccessService {
    pub fn new(store: Arc<dyn HierarchyStore>) -> Self {
        Self { store }
    }

    // ========================================================================
    // Identity resolution
    // ========================================================================

    /// Resolve the authenticated identity to an active user record.
    pub async fn resolve_user(&self, email: &str) -> Result<User> {
        self.store
            .get_user_by_email(email)
            .await?
            .filter(|u| u.audit.is_active)
            .ok_or_else(|| HierarchyError::missing("user", email))
    }

    // ========================================================================
    // Scope resolution
    // ========================================================================

    /// Project ids the user may see.
    pub async fn accessible_project_ids(&self, user: &User) -> Result<HashSet<Uuid>> {
        let assignments = self.store.list_assignments_for_user(user.id).await?;
        let active_ids = self.store.list_active_project_ids().await?;
        Ok(resolver::accessible_projects(user, &assignments, &active_ids))
    }

    /// The user's access level on one project, or `None` for no access.
    pub async fn access_level(&self, user: &User, project_id: Uuid) -> Result<Option<AccessLevel>> {
        let assignments = self.store.list_assignments_for_user(user.id).await?;
        Ok(resolver::access_level_for(user, &assignments, project_id))
    }

    /// Active projects filtered down to the user's accessible set.
    pub async fn visible_projects(&self, user: &User) -> Result<Vec<Project>> {
        let accessible = self.accessible_project_ids(user).await?;
        if accessible.is_empty() {
            return Ok(Vec::new());
        }
        let projects = self.store.list_projects().await?;
        Ok(projects
            .into_iter()
            .filter(|p| accessible.contains(&p.id))
            .collect())
    }

    // ========================================================================
    // Assignments and role scoping
    // ========================================================================

    pub async fn assign_user_to_project(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        access_level: AccessLevel,
        actor: &str,
    ) -> Result<()> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| HierarchyError::missing("user", user_id))?;
        self.store
            .get_project(project_id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(Level::Project, project_id))?;

        self.store
            .assign_user_to_project(&UserProjectAssignment {
                user_id,
                project_id,
                access_level,
                assigned_by: Some(actor.to_string()),
                assigned_date: Utc::now(),
            })
            .await?;
        debug!(%user_id, %project_id, %access_level, "assigned user to project");
        Ok(())
    }

    pub async fn remove_user_from_project(&self, user_id: Uuid, project_id: Uuid) -> Result<()> {
        Ok(self
            .store
            .remove_user_from_project(user_id, project_id)
            .await?)
    }

    /// Replace a role's project scope wholesale. Every referenced project
    /// must exist.
    pub async fn set_role_scope(&self, role_id: Uuid, project_ids: &[Uuid]) -> Result<()> {
        self.store
            .get_role(role_id)
            .await?
            .ok_or_else(|| HierarchyError::missing("role", role_id))?;
        for project_id in project_ids {
            self.store
                .get_project(*project_id)
                .await?
                .ok_or_else(|| HierarchyError::not_found(Level::Project, *project_id))?;
        }
        self.store.set_role_scope(role_id, project_ids).await?;
        debug!(%role_id, scoped = project_ids.len(), "updated role project scope");
        Ok(())
    }

    // ========================================================================
    // User administration
    // ========================================================================

    pub async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.store.list_users().await?)
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| HierarchyError::missing("user", id))
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>> {
        Ok(self.store.list_roles().await?)
    }

    pub async fn create_user(&self, fields: NewUser, actor: &str) -> Result<User> {
        let roles = self.resolve_roles(&fields.roles).await?;
        let avatar = fields
            .avatar
            .or_else(|| initials(fields.first_name.as_deref(), fields.last_name.as_deref()));

        let user = User {
            id: Uuid::new_v4(),
            first_name: fields.first_name,
            last_name: fields.last_name,
            email: fields.email,
            login: fields.login,
            avatar,
            primary_project_id: fields.primary_project_id,
            roles,
            audit: Audit::new(actor),
        };
        self.store.create_user(&user).await?;
        Ok(user)
    }

    pub async fn update_user(&self, id: Uuid, update: UserUpdate, actor: &str) -> Result<User> {
        let mut user = self.get_user(id).await?;

        if let Some(first_name) = update.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = update.last_name {
            user.last_name = Some(last_name);
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(avatar) = update.avatar {
            user.avatar = Some(avatar);
        }
        if let Some(primary) = update.primary_project_id {
            user.primary_project_id = Some(primary);
        }
        if let Some(role_names) = update.roles {
            user.roles = self.resolve_roles(&role_names).await?;
        }
        match update.is_active {
            Some(false) if user.audit.is_active => user.audit.soft_delete(actor),
            Some(true) if !user.audit.is_active => user.audit.restore(),
            _ => {}
        }
        user.audit.touch(actor);

        self.store.update_user(&user).await?;
        self.get_user(id).await
    }

    async fn resolve_roles(&self, names: &[String]) -> Result<Vec<Role>> {
        let mut roles = Vec::with_capacity(names.len());
        for name in names {
            let role = self
                .store
                .get_role_by_name(name)
                .await?
                .ok_or_else(|| HierarchyError::missing("role", name))?;
            roles.push(role);
        }
        Ok(roles)
    }
}

/// "Ada Lovelace" → "AL". Used when no explicit avatar is supplied.
fn initials(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let mut out = String::new();
    for name in [first, last].into_iter().flatten() {
        if let Some(c) = name.chars().next() {
            out.extend(c.to_uppercase());
        }
    }
    (!out.is_empty()).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::models::{MANAGE_STRATEGY, VIEW_STRATEGY};
    use crate::neo4j::mock::MockHierarchyStore;
    use crate::test_helpers::{project, role_named};

    const ACTOR: &str = "admin@example.com";

    async fn seeded() -> (AccessService, Uuid, Uuid) {
        let store = MockHierarchyStore::new();
        let p1 = project("Alpha");
        let p2 = project("Beta");
        let (p1_id, p2_id) = (p1.id, p2.id);
        let store = store
            .with_project(p1)
            .await
            .with_project(p2)
            .await
            .with_role(role_named("strategy-manager", &[VIEW_STRATEGY, MANAGE_STRATEGY]))
            .await;
        (AccessService::new(Arc::new(store)), p1_id, p2_id)
    }

    #[tokio::test]
    async fn test_create_and_resolve_user() {
        let (service, _, _) = seeded().await;
        let user = service
            .create_user(
                NewUser {
                    first_name: Some("Ada".to_string()),
                    last_name: Some("Lovelace".to_string()),
                    email: "ada@example.com".to_string(),
                    login: "ada".to_string(),
                    roles: vec!["strategy-manager".to_string()],
                    ..Default::default()
                },
                ACTOR,
            )
            .await
            .unwrap();
        assert_eq!(user.avatar.as_deref(), Some("AL"));
        assert_eq!(user.roles.len(), 1);

        let resolved = service.resolve_user("ada@example.com").await.unwrap();
        assert_eq!(resolved.id, user.id);
        assert!(resolved.has_permission(MANAGE_STRATEGY));
    }

    #[tokio::test]
    async fn test_unknown_role_name_is_rejected() {
        let (service, _, _) = seeded().await;
        let err = service
            .create_user(
                NewUser {
                    email: "x@example.com".to_string(),
                    login: "x".to_string(),
                    roles: vec!["does-not-exist".to_string()],
                    ..Default::default()
                },
                ACTOR,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, HierarchyError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_deactivated_user_cannot_resolve() {
        let (service, _, _) = seeded().await;
        let user = service
            .create_user(
                NewUser {
                    email: "gone@example.com".to_string(),
                    login: "gone".to_string(),
                    ..Default::default()
                },
                ACTOR,
            )
            .await
            .unwrap();

        service
            .update_user(
                user.id,
                UserUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
                ACTOR,
            )
            .await
            .unwrap();

        assert!(service.resolve_user("gone@example.com").await.is_err());
    }

    #[tokio::test]
    async fn test_assignment_flow_feeds_resolver() {
        let (service, p1, p2) = seeded().await;
        let user = service
            .create_user(
                NewUser {
                    email: "bob@example.com".to_string(),
                    login: "bob".to_string(),
                    ..Default::default()
                },
                ACTOR,
            )
            .await
            .unwrap();

        assert!(service
            .accessible_project_ids(&user)
            .await
            .unwrap()
            .is_empty());

        service
            .assign_user_to_project(user.id, p1, AccessLevel::Manager, ACTOR)
            .await
            .unwrap();

        let ids = service.accessible_project_ids(&user).await.unwrap();
        assert_eq!(ids, [p1].into_iter().collect());
        assert_eq!(
            service.access_level(&user, p1).await.unwrap(),
            Some(AccessLevel::Manager)
        );
        assert_eq!(service.access_level(&user, p2).await.unwrap(), None);

        let visible = service.visible_projects(&user).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, p1);

        service
            .remove_user_from_project(user.id, p1)
            .await
            .unwrap();
        assert!(service
            .accessible_project_ids(&user)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_role_scope_update_requires_known_projects() {
        let (service, p1, _) = seeded().await;
        let roles = service.list_roles().await.unwrap();
        let role_id = roles[0].id;

        let err = service
            .set_role_scope(role_id, &[Uuid::new_v4()])
            .await
            .unwrap_err();
        assert!(matches!(err, HierarchyError::NotFound { .. }));

        service.set_role_scope(role_id, &[p1]).await.unwrap();

        // a user holding the role now sees the scoped project
        let user = service
            .create_user(
                NewUser {
                    email: "eve@example.com".to_string(),
                    login: "eve".to_string(),
                    roles: vec!["strategy-manager".to_string()],
                    ..Default::default()
                },
                ACTOR,
            )
            .await
            .unwrap();
        let resolved = service.resolve_user("eve@example.com").await.unwrap();
        let ids = service.accessible_project_ids(&resolved).await.unwrap();
        assert_eq!(ids, [p1].into_iter().collect());
    }
}

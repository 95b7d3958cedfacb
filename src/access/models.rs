//! Access-control models
//!
//! Users hold roles; roles carry permission strings and an optional
//! project scope. Direct user↔project assignments carry an explicit
//! access level and are managed separately from roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::hierarchy::models::Audit;

// ============================================================================
// Permissions
// ============================================================================

/// Bypass: grants visibility of every active project.
pub const VIEW_ALL_PROJECTS: &str = "VIEW_ALL_PROJECTS";
/// Read the strategy hierarchy.
pub const VIEW_STRATEGY: &str = "VIEW_STRATEGY";
/// Create/update/soft-delete hierarchy nodes.
pub const MANAGE_STRATEGY: &str = "MANAGE_STRATEGY";
/// User and role administration, bulk import.
pub const MANAGE_USERS: &str = "MANAGE_USERS";

// ============================================================================
// Access level
// ============================================================================

/// Access level of a user↔project assignment, most to least privileged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Full control, including member management.
    Owner,
    /// Can manage hierarchy within the project.
    Manager,
    /// Can edit items assigned to them.
    Member,
    /// Read-only.
    Viewer,
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owner => write!(f, "owner"),
            Self::Manager => write!(f, "manager"),
            Self::Member => write!(f, "member"),
            Self::Viewer => write!(f, "viewer"),
        }
    }
}

impl FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "manager" => Ok(Self::Manager),
            "member" => Ok(Self::Member),
            "viewer" => Ok(Self::Viewer),
            _ => Err(format!("Unknown access level: {}", s)),
        }
    }
}

// ============================================================================
// Role / User
// ============================================================================

/// A named permission bundle, optionally scoped to specific projects.
///
/// An empty `scoped_project_ids` marks a **global** role — "no restriction",
/// not "no projects". See [`crate::access::resolver`] for how the two
/// resolver queries read that emptiness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// System roles cannot be deleted or renamed by administrators.
    pub is_system: bool,
    pub permissions: Vec<String>,
    pub scoped_project_ids: Vec<Uuid>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Role {
    pub fn is_global(&self) -> bool {
        self.scoped_project_ids.is_empty()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// An account identified by email/login, carrying its roles eagerly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub login: String,
    /// Initials shown in the UI.
    pub avatar: Option<String>,
    /// Kept for backward compatibility with single-project accounts.
    pub primary_project_id: Option<Uuid>,
    pub roles: Vec<Role>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl User {
    /// True when any active role grants `permission`.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.roles
            .iter()
            .filter(|r| r.audit.is_active)
            .any(|r| r.has_permission(permission))
    }
}

/// Direct user↔project assignment with an explicit access level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProjectAssignment {
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub access_level: AccessLevel,
    pub assigned_by: Option<String>,
    pub assigned_date: DateTime<Utc>,
}

// ============================================================================
// Admin payloads
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub login: String,
    pub avatar: Option<String>,
    pub primary_project_id: Option<Uuid>,
    /// Role names to attach; unknown names are rejected.
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub primary_project_id: Option<Uuid>,
    pub roles: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_level_roundtrip() {
        for s in ["owner", "manager", "member", "viewer"] {
            let level: AccessLevel = s.parse().unwrap();
            assert_eq!(level.to_string(), s);
        }
        assert_eq!("OWNER".parse::<AccessLevel>().unwrap(), AccessLevel::Owner);
        assert!("admin".parse::<AccessLevel>().is_err());
    }

    #[test]
    fn test_role_globality() {
        let mut role = Role {
            id: Uuid::new_v4(),
            name: "strategy-viewer".to_string(),
            description: None,
            is_system: false,
            permissions: vec![VIEW_STRATEGY.to_string()],
            scoped_project_ids: vec![],
            audit: Audit::new("seed"),
        };
        assert!(role.is_global());
        role.scoped_project_ids.push(Uuid::new_v4());
        assert!(!role.is_global());
    }

    #[test]
    fn test_inactive_role_grants_nothing() {
        let mut role = Role {
            id: Uuid::new_v4(),
            name: "admin".to_string(),
            description: None,
            is_system: true,
            permissions: vec![MANAGE_USERS.to_string()],
            scoped_project_ids: vec![],
            audit: Audit::new("seed"),
        };
        role.audit.soft_delete("seed");

        let user = User {
            id: Uuid::new_v4(),
            first_name: None,
            last_name: None,
            email: "a@example.com".to_string(),
            login: "a".to_string(),
            avatar: None,
            primary_project_id: None,
            roles: vec![role],
            audit: Audit::new("seed"),
        };
        assert!(!user.has_permission(MANAGE_USERS));
    }
}

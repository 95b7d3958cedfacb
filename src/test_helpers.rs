//! Test helper factories and mock state builders
//!
//! Convenience functions for creating test entities with sensible defaults
//! and for building a ServerState over the in-memory mock store.
#![allow(dead_code)]

use std::sync::Arc;

use uuid::Uuid;

use crate::access::models::Role;
use crate::api::{ApiState, ServerState};
use crate::hierarchy::models::*;
use crate::neo4j::mock::MockHierarchyStore;
use crate::AuthConfig;

pub const TEST_SECRET: &str = "test-secret-key-minimum-32-chars!!";

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: TEST_SECRET.to_string(),
        jwt_expiry_secs: 3600,
        allowed_email_domain: None,
    }
}

/// ServerState over an empty in-memory store.
pub fn mock_server_state(auth: Option<AuthConfig>) -> ApiState {
    Arc::new(ServerState::new(Arc::new(MockHierarchyStore::new()), auth))
}

// ============================================================================
// Entity factories
// ============================================================================

const SEED_ACTOR: &str = "seed@example.com";

pub fn project(title: &str) -> Project {
    Project {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: None,
        progress: 0,
        audit: Audit::new(SEED_ACTOR),
    }
}

pub fn initiative(project_id: Uuid, title: &str) -> StrategicInitiative {
    StrategicInitiative {
        id: Uuid::new_v4(),
        project_id,
        title: title.to_string(),
        description: None,
        progress: 0,
        audit: Audit::new(SEED_ACTOR),
    }
}

pub fn goal(initiative_id: Uuid, title: &str) -> Goal {
    Goal {
        id: Uuid::new_v4(),
        initiative_id,
        title: title.to_string(),
        description: None,
        progress: 0,
        audit: Audit::new(SEED_ACTOR),
    }
}

pub fn objective(goal_id: Uuid, title: &str) -> Objective {
    Objective {
        id: Uuid::new_v4(),
        goal_id,
        title: title.to_string(),
        description: None,
        assignee: None,
        year: None,
        quarter: None,
        due_date: None,
        progress: 0,
        audit: Audit::new(SEED_ACTOR),
    }
}

pub fn key_result(objective_id: Uuid, title: &str) -> KeyResult {
    KeyResult {
        id: Uuid::new_v4(),
        objective_id,
        title: title.to_string(),
        description: None,
        assignee: None,
        metric_start: None,
        metric_target: None,
        metric_current: None,
        unit: None,
        manual_progress_set: false,
        progress: 0,
        audit: Audit::new(SEED_ACTOR),
    }
}

/// Completed items get progress 100, open ones 0.
pub fn action_item(key_result_id: Uuid, title: &str, completed: bool) -> ActionItem {
    ActionItem {
        id: Uuid::new_v4(),
        key_result_id,
        title: title.to_string(),
        description: None,
        assignee: None,
        due_date: None,
        is_completed: completed,
        progress: if completed { 100 } else { 0 },
        audit: Audit::new(SEED_ACTOR),
    }
}

pub fn role_named(name: &str, permissions: &[&str]) -> Role {
    Role {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: None,
        is_system: false,
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
        scoped_project_ids: Vec::new(),
        audit: Audit::new(SEED_ACTOR),
    }
}

// ============================================================================
// Tree builders
// ============================================================================

/// Single project → initiative → goal → objective → key result chain with
/// no action items.
pub fn chain_tree() -> ProjectTree {
    let p = project("Chain Project");
    let i = initiative(p.id, "Chain Initiative");
    let g = goal(i.id, "Chain Goal");
    let o = objective(g.id, "Chain Objective");
    let k = key_result(o.id, "Chain Key Result");

    ProjectTree {
        project: p,
        initiatives: vec![InitiativeTree {
            initiative: i,
            goals: vec![GoalTree {
                goal: g,
                objectives: vec![ObjectiveTree {
                    objective: o,
                    key_results: vec![KeyResultTree {
                        key_result: k,
                        action_items: vec![],
                    }],
                }],
            }],
        }],
    }
}

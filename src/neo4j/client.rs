//! Neo4j client for the planning hierarchy graph
//!
//! Nodes carry one label per hierarchy level; parent/child links are typed
//! relationships (`HAS_INITIATIVE` … `HAS_ACTION_ITEM`). Access-control
//! records live alongside: `(:User)-[:HAS_ROLE]->(:Role)`,
//! `(:Role)-[:SCOPED_TO]->(:Project)` and
//! `(:User)-[:ASSIGNED_TO {access_level}]->(:Project)`.
//! Timestamps are stored as RFC 3339 strings, dates as ISO dates.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use neo4rs::{query, Graph, Query};
use uuid::Uuid;

use crate::access::models::{AccessLevel, Role, User, UserProjectAssignment};
use crate::hierarchy::models::*;

/// Client for Neo4j operations
pub struct Neo4jClient {
    graph: Arc<Graph>,
}

/// Node label for a hierarchy level.
fn label(level: Level) -> &'static str {
    match level {
        Level::Project => "Project",
        Level::Initiative => "Initiative",
        Level::Goal => "Goal",
        Level::Objective => "Objective",
        Level::KeyResult => "KeyResult",
        Level::ActionItem => "ActionItem",
    }
}

impl Neo4jClient {
    /// Connect and prepare schema constraints.
    pub async fn new(uri: &str, user: &str, password: &str) -> Result<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .context("Failed to connect to Neo4j")?;
        let client = Self {
            graph: Arc::new(graph),
        };
        client.init_schema().await?;
        Ok(client)
    }

    /// Uniqueness constraints per label, plus a user email index.
    async fn init_schema(&self) -> Result<()> {
        let statements = [
            "CREATE CONSTRAINT project_id IF NOT EXISTS FOR (n:Project) REQUIRE n.id IS UNIQUE",
            "CREATE CONSTRAINT initiative_id IF NOT EXISTS FOR (n:Initiative) REQUIRE n.id IS UNIQUE",
            "CREATE CONSTRAINT goal_id IF NOT EXISTS FOR (n:Goal) REQUIRE n.id IS UNIQUE",
            "CREATE CONSTRAINT objective_id IF NOT EXISTS FOR (n:Objective) REQUIRE n.id IS UNIQUE",
            "CREATE CONSTRAINT key_result_id IF NOT EXISTS FOR (n:KeyResult) REQUIRE n.id IS UNIQUE",
            "CREATE CONSTRAINT action_item_id IF NOT EXISTS FOR (n:ActionItem) REQUIRE n.id IS UNIQUE",
            "CREATE CONSTRAINT user_id IF NOT EXISTS FOR (n:User) REQUIRE n.id IS UNIQUE",
            "CREATE CONSTRAINT role_id IF NOT EXISTS FOR (n:Role) REQUIRE n.id IS UNIQUE",
            "CREATE INDEX user_email IF NOT EXISTS FOR (n:User) ON (n.email)",
        ];
        for statement in statements {
            self.graph.run(query(statement)).await?;
        }
        Ok(())
    }

    /// Liveness probe for the health endpoint.
    pub async fn ping(&self) -> Result<()> {
        self.graph.run(query("RETURN 1")).await?;
        Ok(())
    }

    // ========================================================================
    // Audit helpers
    // ========================================================================

    fn with_audit_params(q: Query, audit: &Audit) -> Query {
        q.param("is_active", audit.is_active)
            .param("created_by", audit.created_by.clone())
            .param("created_date", audit.created_date.to_rfc3339())
            .param("updated_by", audit.updated_by.clone())
            .param("updated_date", audit.updated_date.to_rfc3339())
            .param("closed_by", audit.closed_by.clone())
            .param(
                "closed_date",
                audit.closed_date.map(|d| d.to_rfc3339()),
            )
    }

    fn node_audit(node: &neo4rs::Node) -> Result<Audit> {
        Ok(Audit {
            is_active: node.get("is_active")?,
            created_by: node.get("created_by")?,
            created_date: node.get::<String>("created_date")?.parse()?,
            updated_by: node.get("updated_by")?,
            updated_date: node.get::<String>("updated_date")?.parse()?,
            closed_by: node.get::<Option<String>>("closed_by")?,
            closed_date: node
                .get::<Option<String>>("closed_date")?
                .map(|s| s.parse())
                .transpose()?,
        })
    }

    const AUDIT_PROPS: &'static str = "is_active: $is_active, created_by: $created_by, \
         created_date: $created_date, updated_by: $updated_by, \
         updated_date: $updated_date, closed_by: $closed_by, closed_date: $closed_date";

    const AUDIT_SET: &'static str = "n.is_active = $is_active, n.updated_by = $updated_by, \
         n.updated_date = $updated_date, n.closed_by = $closed_by, n.closed_date = $closed_date";

    // ========================================================================
    // Project operations
    // ========================================================================

    pub async fn create_project(&self, project: &Project) -> Result<()> {
        let q = query(&format!(
            "CREATE (n:Project {{id: $id, title: $title, description: $description, \
             progress: $progress, {}}})",
            Self::AUDIT_PROPS
        ))
        .param("id", project.id.to_string())
        .param("title", project.title.clone())
        .param("description", project.description.clone())
        .param("progress", project.progress as i64);

        self.graph
            .run(Self::with_audit_params(q, &project.audit))
            .await?;
        Ok(())
    }

    pub async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        let q = query("MATCH (n:Project {id: $id}) RETURN n").param("id", id.to_string());
        let mut result = self.graph.execute(q).await?;
        if let Some(row) = result.next().await? {
            let node: neo4rs::Node = row.get("n")?;
            Ok(Some(Self::node_to_project(&node)?))
        } else {
            Ok(None)
        }
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        self.list_projects_where(true).await
    }

    pub async fn list_archived_projects(&self) -> Result<Vec<Project>> {
        self.list_projects_where(false).await
    }

    async fn list_projects_where(&self, active: bool) -> Result<Vec<Project>> {
        let q = query(
            "MATCH (n:Project {is_active: $active}) RETURN n ORDER BY n.created_date",
        )
        .param("active", active);
        let mut result = self.graph.execute(q).await?;
        let mut projects = Vec::new();
        while let Some(row) = result.next().await? {
            let node: neo4rs::Node = row.get("n")?;
            projects.push(Self::node_to_project(&node)?);
        }
        Ok(projects)
    }

    pub async fn list_active_project_ids(&self) -> Result<Vec<Uuid>> {
        let q = query("MATCH (n:Project {is_active: true}) RETURN n.id AS id");
        let mut result = self.graph.execute(q).await?;
        let mut ids = Vec::new();
        while let Some(row) = result.next().await? {
            ids.push(row.get::<String>("id")?.parse()?);
        }
        Ok(ids)
    }

    pub async fn update_project(&self, project: &Project) -> Result<()> {
        let q = query(&format!(
            "MATCH (n:Project {{id: $id}}) SET n.title = $title, \
             n.description = $description, n.progress = $progress, {}",
            Self::AUDIT_SET
        ))
        .param("id", project.id.to_string())
        .param("title", project.title.clone())
        .param("description", project.description.clone())
        .param("progress", project.progress as i64);

        self.graph
            .run(Self::with_audit_params(q, &project.audit))
            .await?;
        Ok(())
    }

    fn node_to_project(node: &neo4rs::Node) -> Result<Project> {
        Ok(Project {
            id: node.get::<String>("id")?.parse()?,
            title: node.get("title")?,
            description: node.get::<Option<String>>("description")?,
            progress: node.get::<i64>("progress")? as i32,
            audit: Self::node_audit(node)?,
        })
    }

    // ========================================================================
    // Initiative operations
    // ========================================================================

    pub async fn create_initiative(&self, initiative: &StrategicInitiative) -> Result<()> {
        let q = query(&format!(
            "MATCH (p:Project {{id: $project_id}}) \
             CREATE (p)-[:HAS_INITIATIVE]->(n:Initiative {{id: $id, \
             project_id: $project_id, title: $title, description: $description, \
             progress: $progress, {}}})",
            Self::AUDIT_PROPS
        ))
        .param("id", initiative.id.to_string())
        .param("project_id", initiative.project_id.to_string())
        .param("title", initiative.title.clone())
        .param("description", initiative.description.clone())
        .param("progress", initiative.progress as i64);

        self.graph
            .run(Self::with_audit_params(q, &initiative.audit))
            .await?;
        Ok(())
    }

    pub async fn get_initiative(&self, id: Uuid) -> Result<Option<StrategicInitiative>> {
        let q = query("MATCH (n:Initiative {id: $id}) RETURN n").param("id", id.to_string());
        let mut result = self.graph.execute(q).await?;
        if let Some(row) = result.next().await? {
            let node: neo4rs::Node = row.get("n")?;
            Ok(Some(Self::node_to_initiative(&node)?))
        } else {
            Ok(None)
        }
    }

    pub async fn update_initiative(&self, initiative: &StrategicInitiative) -> Result<()> {
        let q = query(&format!(
            "MATCH (n:Initiative {{id: $id}}) SET n.title = $title, \
             n.description = $description, n.progress = $progress, {}",
            Self::AUDIT_SET
        ))
        .param("id", initiative.id.to_string())
        .param("title", initiative.title.clone())
        .param("description", initiative.description.clone())
        .param("progress", initiative.progress as i64);

        self.graph
            .run(Self::with_audit_params(q, &initiative.audit))
            .await?;
        Ok(())
    }

    fn node_to_initiative(node: &neo4rs::Node) -> Result<StrategicInitiative> {
        Ok(StrategicInitiative {
            id: node.get::<String>("id")?.parse()?,
            project_id: node.get::<String>("project_id")?.parse()?,
            title: node.get("title")?,
            description: node.get::<Option<String>>("description")?,
            progress: node.get::<i64>("progress")? as i32,
            audit: Self::node_audit(node)?,
        })
    }

    // ========================================================================
    // Goal operations
    // ========================================================================

    pub async fn create_goal(&self, goal: &Goal) -> Result<()> {
        let q = query(&format!(
            "MATCH (i:Initiative {{id: $initiative_id}}) \
             CREATE (i)-[:HAS_GOAL]->(n:Goal {{id: $id, initiative_id: $initiative_id, \
             title: $title, description: $description, progress: $progress, {}}})",
            Self::AUDIT_PROPS
        ))
        .param("id", goal.id.to_string())
        .param("initiative_id", goal.initiative_id.to_string())
        .param("title", goal.title.clone())
        .param("description", goal.description.clone())
        .param("progress", goal.progress as i64);

        self.graph
            .run(Self::with_audit_params(q, &goal.audit))
            .await?;
        Ok(())
    }

    pub async fn get_goal(&self, id: Uuid) -> Result<Option<Goal>> {
        let q = query("MATCH (n:Goal {id: $id}) RETURN n").param("id", id.to_string());
        let mut result = self.graph.execute(q).await?;
        if let Some(row) = result.next().await? {
            let node: neo4rs::Node = row.get("n")?;
            Ok(Some(Self::node_to_goal(&node)?))
        } else {
            Ok(None)
        }
    }

    pub async fn update_goal(&self, goal: &Goal) -> Result<()> {
        let q = query(&format!(
            "MATCH (n:Goal {{id: $id}}) SET n.title = $title, \
             n.description = $description, n.progress = $progress, {}",
            Self::AUDIT_SET
        ))
        .param("id", goal.id.to_string())
        .param("title", goal.title.clone())
        .param("description", goal.description.clone())
        .param("progress", goal.progress as i64);

        self.graph
            .run(Self::with_audit_params(q, &goal.audit))
            .await?;
        Ok(())
    }

    fn node_to_goal(node: &neo4rs::Node) -> Result<Goal> {
        Ok(Goal {
            id: node.get::<String>("id")?.parse()?,
            initiative_id: node.get::<String>("initiative_id")?.parse()?,
            title: node.get("title")?,
            description: node.get::<Option<String>>("description")?,
            progress: node.get::<i64>("progress")? as i32,
            audit: Self::node_audit(node)?,
        })
    }

    // ========================================================================
    // Objective operations
    // ========================================================================

    pub async fn create_objective(&self, objective: &Objective) -> Result<()> {
        let q = query(&format!(
            "MATCH (g:Goal {{id: $goal_id}}) \
             CREATE (g)-[:HAS_OBJECTIVE]->(n:Objective {{id: $id, goal_id: $goal_id, \
             title: $title, description: $description, assignee: $assignee, \
             year: $year, quarter: $quarter, due_date: $due_date, \
             progress: $progress, {}}})",
            Self::AUDIT_PROPS
        ))
        .param("id", objective.id.to_string())
        .param("goal_id", objective.goal_id.to_string())
        .param("title", objective.title.clone())
        .param("description", objective.description.clone())
        .param("assignee", objective.assignee.clone())
        .param("year", objective.year.map(|y| y as i64))
        .param("quarter", objective.quarter.clone())
        .param("due_date", objective.due_date.map(|d| d.to_string()))
        .param("progress", objective.progress as i64);

        self.graph
            .run(Self::with_audit_params(q, &objective.audit))
            .await?;
        Ok(())
    }

    pub async fn get_objective(&self, id: Uuid) -> Result<Option<Objective>> {
        let q = query("MATCH (n:Objective {id: $id}) RETURN n").param("id", id.to_string());
        let mut result = self.graph.execute(q).await?;
        if let Some(row) = result.next().await? {
            let node: neo4rs::Node = row.get("n")?;
            Ok(Some(Self::node_to_objective(&node)?))
        } else {
            Ok(None)
        }
    }

    pub async fn update_objective(&self, objective: &Objective) -> Result<()> {
        let q = query(&format!(
            "MATCH (n:Objective {{id: $id}}) SET n.title = $title, \
             n.description = $description, n.assignee = $assignee, n.year = $year, \
             n.quarter = $quarter, n.due_date = $due_date, n.progress = $progress, {}",
            Self::AUDIT_SET
        ))
        .param("id", objective.id.to_string())
        .param("title", objective.title.clone())
        .param("description", objective.description.clone())
        .param("assignee", objective.assignee.clone())
        .param("year", objective.year.map(|y| y as i64))
        .param("quarter", objective.quarter.clone())
        .param("due_date", objective.due_date.map(|d| d.to_string()))
        .param("progress", objective.progress as i64);

        self.graph
            .run(Self::with_audit_params(q, &objective.audit))
            .await?;
        Ok(())
    }

    fn node_to_objective(node: &neo4rs::Node) -> Result<Objective> {
        Ok(Objective {
            id: node.get::<String>("id")?.parse()?,
            goal_id: node.get::<String>("goal_id")?.parse()?,
            title: node.get("title")?,
            description: node.get::<Option<String>>("description")?,
            assignee: node.get::<Option<String>>("assignee")?,
            year: node.get::<Option<i64>>("year")?.map(|y| y as i32),
            quarter: node.get::<Option<String>>("quarter")?,
            due_date: node
                .get::<Option<String>>("due_date")?
                .map(|s| s.parse())
                .transpose()?,
            progress: node.get::<i64>("progress")? as i32,
            audit: Self::node_audit(node)?,
        })
    }

    // ========================================================================
    // Key result operations
    // ========================================================================

    pub async fn create_key_result(&self, key_result: &KeyResult) -> Result<()> {
        let q = query(&format!(
            "MATCH (o:Objective {{id: $objective_id}}) \
             CREATE (o)-[:HAS_KEY_RESULT]->(n:KeyResult {{id: $id, \
             objective_id: $objective_id, title: $title, description: $description, \
             assignee: $assignee, metric_start: $metric_start, \
             metric_target: $metric_target, metric_current: $metric_current, \
             unit: $unit, manual_progress_set: $manual_progress_set, \
             progress: $progress, {}}})",
            Self::AUDIT_PROPS
        ))
        .param("id", key_result.id.to_string())
        .param("objective_id", key_result.objective_id.to_string())
        .param("title", key_result.title.clone())
        .param("description", key_result.description.clone())
        .param("assignee", key_result.assignee.clone())
        .param("metric_start", key_result.metric_start)
        .param("metric_target", key_result.metric_target)
        .param("metric_current", key_result.metric_current)
        .param("unit", key_result.unit.clone())
        .param("manual_progress_set", key_result.manual_progress_set)
        .param("progress", key_result.progress as i64);

        self.graph
            .run(Self::with_audit_params(q, &key_result.audit))
            .await?;
        Ok(())
    }

    pub async fn get_key_result(&self, id: Uuid) -> Result<Option<KeyResult>> {
        let q = query("MATCH (n:KeyResult {id: $id}) RETURN n").param("id", id.to_string());
        let mut result = self.graph.execute(q).await?;
        if let Some(row) = result.next().await? {
            let node: neo4rs::Node = row.get("n")?;
            Ok(Some(Self::node_to_key_result(&node)?))
        } else {
            Ok(None)
        }
    }

    pub async fn update_key_result(&self, key_result: &KeyResult) -> Result<()> {
        let q = query(&format!(
            "MATCH (n:KeyResult {{id: $id}}) SET n.title = $title, \
             n.description = $description, n.assignee = $assignee, \
             n.metric_start = $metric_start, n.metric_target = $metric_target, \
             n.metric_current = $metric_current, n.unit = $unit, \
             n.manual_progress_set = $manual_progress_set, n.progress = $progress, {}",
            Self::AUDIT_SET
        ))
        .param("id", key_result.id.to_string())
        .param("title", key_result.title.clone())
        .param("description", key_result.description.clone())
        .param("assignee", key_result.assignee.clone())
        .param("metric_start", key_result.metric_start)
        .param("metric_target", key_result.metric_target)
        .param("metric_current", key_result.metric_current)
        .param("unit", key_result.unit.clone())
        .param("manual_progress_set", key_result.manual_progress_set)
        .param("progress", key_result.progress as i64);

        self.graph
            .run(Self::with_audit_params(q, &key_result.audit))
            .await?;
        Ok(())
    }

    fn node_to_key_result(node: &neo4rs::Node) -> Result<KeyResult> {
        Ok(KeyResult {
            id: node.get::<String>("id")?.parse()?,
            objective_id: node.get::<String>("objective_id")?.parse()?,
            title: node.get("title")?,
            description: node.get::<Option<String>>("description")?,
            assignee: node.get::<Option<String>>("assignee")?,
            metric_start: node.get::<Option<f64>>("metric_start")?,
            metric_target: node.get::<Option<f64>>("metric_target")?,
            metric_current: node.get::<Option<f64>>("metric_current")?,
            unit: node.get::<Option<String>>("unit")?,
            manual_progress_set: node.get("manual_progress_set")?,
            progress: node.get::<i64>("progress")? as i32,
            audit: Self::node_audit(node)?,
        })
    }

    // ========================================================================
    // Action item operations
    // ========================================================================

    pub async fn create_action_item(&self, action_item: &ActionItem) -> Result<()> {
        let q = query(&format!(
            "MATCH (k:KeyResult {{id: $key_result_id}}) \
             CREATE (k)-[:HAS_ACTION_ITEM]->(n:ActionItem {{id: $id, \
             key_result_id: $key_result_id, title: $title, \
             description: $description, assignee: $assignee, due_date: $due_date, \
             is_completed: $is_completed, progress: $progress, {}}})",
            Self::AUDIT_PROPS
        ))
        .param("id", action_item.id.to_string())
        .param("key_result_id", action_item.key_result_id.to_string())
        .param("title", action_item.title.clone())
        .param("description", action_item.description.clone())
        .param("assignee", action_item.assignee.clone())
        .param("due_date", action_item.due_date.map(|d| d.to_string()))
        .param("is_completed", action_item.is_completed)
        .param("progress", action_item.progress as i64);

        self.graph
            .run(Self::with_audit_params(q, &action_item.audit))
            .await?;
        Ok(())
    }

    pub async fn get_action_item(&self, id: Uuid) -> Result<Option<ActionItem>> {
        let q = query("MATCH (n:ActionItem {id: $id}) RETURN n").param("id", id.to_string());
        let mut result = self.graph.execute(q).await?;
        if let Some(row) = result.next().await? {
            let node: neo4rs::Node = row.get("n")?;
            Ok(Some(Self::node_to_action_item(&node)?))
        } else {
            Ok(None)
        }
    }

    pub async fn update_action_item(&self, action_item: &ActionItem) -> Result<()> {
        let q = query(&format!(
            "MATCH (n:ActionItem {{id: $id}}) SET n.title = $title, \
             n.description = $description, n.assignee = $assignee, \
             n.due_date = $due_date, n.is_completed = $is_completed, \
             n.progress = $progress, {}",
            Self::AUDIT_SET
        ))
        .param("id", action_item.id.to_string())
        .param("title", action_item.title.clone())
        .param("description", action_item.description.clone())
        .param("assignee", action_item.assignee.clone())
        .param("due_date", action_item.due_date.map(|d| d.to_string()))
        .param("is_completed", action_item.is_completed)
        .param("progress", action_item.progress as i64);

        self.graph
            .run(Self::with_audit_params(q, &action_item.audit))
            .await?;
        Ok(())
    }

    fn node_to_action_item(node: &neo4rs::Node) -> Result<ActionItem> {
        Ok(ActionItem {
            id: node.get::<String>("id")?.parse()?,
            key_result_id: node.get::<String>("key_result_id")?.parse()?,
            title: node.get("title")?,
            description: node.get::<Option<String>>("description")?,
            assignee: node.get::<Option<String>>("assignee")?,
            due_date: node
                .get::<Option<String>>("due_date")?
                .map(|s| s.parse())
                .transpose()?,
            is_completed: node.get("is_completed")?,
            progress: node.get::<i64>("progress")? as i32,
            audit: Self::node_audit(node)?,
        })
    }

    // ========================================================================
    // Subtree fetch
    // ========================================================================

    /// One query per level, grouped in memory by the parent id each child
    /// node carries. Active and inactive nodes are both returned; the
    /// aggregator and the cascade decide what to skip.
    pub async fn fetch_project_tree(&self, project_id: Uuid) -> Result<Option<ProjectTree>> {
        let project = match self.get_project(project_id).await? {
            Some(p) => p,
            None => return Ok(None),
        };
        let pid = project_id.to_string();

        let initiatives = {
            let q = query(
                "MATCH (:Project {id: $pid})-[:HAS_INITIATIVE]->(n:Initiative) \
                 RETURN n ORDER BY n.created_date",
            )
            .param("pid", pid.clone());
            let mut result = self.graph.execute(q).await?;
            let mut items = Vec::new();
            while let Some(row) = result.next().await? {
                let node: neo4rs::Node = row.get("n")?;
                items.push(Self::node_to_initiative(&node)?);
            }
            items
        };

        let mut goals_by_parent: HashMap<Uuid, Vec<Goal>> = HashMap::new();
        {
            let q = query(
                "MATCH (:Project {id: $pid})-[:HAS_INITIATIVE]->(:Initiative)\
                 -[:HAS_GOAL]->(n:Goal) RETURN n ORDER BY n.created_date",
            )
            .param("pid", pid.clone());
            let mut result = self.graph.execute(q).await?;
            while let Some(row) = result.next().await? {
                let node: neo4rs::Node = row.get("n")?;
                let goal = Self::node_to_goal(&node)?;
                goals_by_parent.entry(goal.initiative_id).or_default().push(goal);
            }
        }

        let mut objectives_by_parent: HashMap<Uuid, Vec<Objective>> = HashMap::new();
        {
            let q = query(
                "MATCH (:Project {id: $pid})-[:HAS_INITIATIVE]->(:Initiative)\
                 -[:HAS_GOAL]->(:Goal)-[:HAS_OBJECTIVE]->(n:Objective) \
                 RETURN n ORDER BY n.created_date",
            )
            .param("pid", pid.clone());
            let mut result = self.graph.execute(q).await?;
            while let Some(row) = result.next().await? {
                let node: neo4rs::Node = row.get("n")?;
                let objective = Self::node_to_objective(&node)?;
                objectives_by_parent
                    .entry(objective.goal_id)
                    .or_default()
                    .push(objective);
            }
        }

        let mut key_results_by_parent: HashMap<Uuid, Vec<KeyResult>> = HashMap::new();
        {
            let q = query(
                "MATCH (:Project {id: $pid})-[:HAS_INITIATIVE]->(:Initiative)\
                 -[:HAS_GOAL]->(:Goal)-[:HAS_OBJECTIVE]->(:Objective)\
                 -[:HAS_KEY_RESULT]->(n:KeyResult) RETURN n ORDER BY n.created_date",
            )
            .param("pid", pid.clone());
            let mut result = self.graph.execute(q).await?;
            while let Some(row) = result.next().await? {
                let node: neo4rs::Node = row.get("n")?;
                let key_result = Self::node_to_key_result(&node)?;
                key_results_by_parent
                    .entry(key_result.objective_id)
                    .or_default()
                    .push(key_result);
            }
        }

        let mut action_items_by_parent: HashMap<Uuid, Vec<ActionItem>> = HashMap::new();
        {
            let q = query(
                "MATCH (:Project {id: $pid})-[:HAS_INITIATIVE]->(:Initiative)\
                 -[:HAS_GOAL]->(:Goal)-[:HAS_OBJECTIVE]->(:Objective)\
                 -[:HAS_KEY_RESULT]->(:KeyResult)-[:HAS_ACTION_ITEM]->(n:ActionItem) \
                 RETURN n ORDER BY n.created_date",
            )
            .param("pid", pid);
            let mut result = self.graph.execute(q).await?;
            while let Some(row) = result.next().await? {
                let node: neo4rs::Node = row.get("n")?;
                let action_item = Self::node_to_action_item(&node)?;
                action_items_by_parent
                    .entry(action_item.key_result_id)
                    .or_default()
                    .push(action_item);
            }
        }

        let initiatives = initiatives
            .into_iter()
            .map(|initiative| {
                let goals = goals_by_parent
                    .remove(&initiative.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|goal| {
                        let objectives = objectives_by_parent
                            .remove(&goal.id)
                            .unwrap_or_default()
                            .into_iter()
                            .map(|objective| {
                                let key_results = key_results_by_parent
                                    .remove(&objective.id)
                                    .unwrap_or_default()
                                    .into_iter()
                                    .map(|key_result| {
                                        let action_items = action_items_by_parent
                                            .remove(&key_result.id)
                                            .unwrap_or_default();
                                        KeyResultTree {
                                            key_result,
                                            action_items,
                                        }
                                    })
                                    .collect();
                                ObjectiveTree {
                                    objective,
                                    key_results,
                                }
                            })
                            .collect();
                        GoalTree { goal, objectives }
                    })
                    .collect();
                InitiativeTree { initiative, goals }
            })
            .collect();

        Ok(Some(ProjectTree {
            project,
            initiatives,
        }))
    }

    pub async fn find_owning_project(&self, level: Level, id: Uuid) -> Result<Option<Uuid>> {
        if level == Level::Project {
            return Ok(self.get_project(id).await?.map(|p| p.id));
        }
        let q = query(&format!(
            "MATCH (p:Project)-[:HAS_INITIATIVE|HAS_GOAL|HAS_OBJECTIVE\
             |HAS_KEY_RESULT|HAS_ACTION_ITEM*1..5]->(n:{} {{id: $id}}) \
             RETURN p.id AS id LIMIT 1",
            label(level)
        ))
        .param("id", id.to_string());

        let mut result = self.graph.execute(q).await?;
        if let Some(row) = result.next().await? {
            Ok(Some(row.get::<String>("id")?.parse()?))
        } else {
            Ok(None)
        }
    }

    // ========================================================================
    // Batched writes
    // ========================================================================

    pub async fn apply_progress_writes(&self, writes: &[ProgressWrite]) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }
        let queries: Vec<Query> = writes
            .iter()
            .map(|w| {
                query(&format!(
                    "MATCH (n:{} {{id: $id}}) SET n.progress = $progress",
                    label(w.level)
                ))
                .param("id", w.id.to_string())
                .param("progress", w.progress as i64)
            })
            .collect();

        let mut txn = self.graph.start_txn().await?;
        txn.run_queries(queries).await?;
        txn.commit().await?;
        Ok(())
    }

    pub async fn apply_activation_writes(&self, writes: &[ActivationWrite]) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }
        let queries: Vec<Query> = writes
            .iter()
            .map(|w| {
                query(&format!(
                    "MATCH (n:{} {{id: $id}}) SET n.is_active = $active, \
                     n.closed_by = $closed_by, n.closed_date = $closed_date",
                    label(w.level)
                ))
                .param("id", w.id.to_string())
                .param("active", w.active)
                .param("closed_by", w.closed_by.clone())
                .param("closed_date", w.closed_date.map(|d| d.to_rfc3339()))
            })
            .collect();

        let mut txn = self.graph.start_txn().await?;
        txn.run_queries(queries).await?;
        txn.commit().await?;
        Ok(())
    }

    // ========================================================================
    // User operations
    // ========================================================================

    pub async fn create_user(&self, user: &User) -> Result<()> {
        let q = query(&format!(
            "CREATE (n:User {{id: $id, first_name: $first_name, \
             last_name: $last_name, email: $email, login: $login, \
             avatar: $avatar, primary_project_id: $primary_project_id, {}}})",
            Self::AUDIT_PROPS
        ))
        .param("id", user.id.to_string())
        .param("first_name", user.first_name.clone())
        .param("last_name", user.last_name.clone())
        .param("email", user.email.clone())
        .param("login", user.login.clone())
        .param("avatar", user.avatar.clone())
        .param(
            "primary_project_id",
            user.primary_project_id.map(|id| id.to_string()),
        );
        self.graph.run(Self::with_audit_params(q, &user.audit)).await?;

        self.replace_user_roles(user).await
    }

    pub async fn update_user(&self, user: &User) -> Result<()> {
        let q = query(&format!(
            "MATCH (n:User {{id: $id}}) SET n.first_name = $first_name, \
             n.last_name = $last_name, n.email = $email, n.avatar = $avatar, \
             n.primary_project_id = $primary_project_id, {}",
            Self::AUDIT_SET
        ))
        .param("id", user.id.to_string())
        .param("first_name", user.first_name.clone())
        .param("last_name", user.last_name.clone())
        .param("email", user.email.clone())
        .param("avatar", user.avatar.clone())
        .param(
            "primary_project_id",
            user.primary_project_id.map(|id| id.to_string()),
        );
        self.graph.run(Self::with_audit_params(q, &user.audit)).await?;

        self.replace_user_roles(user).await
    }

    /// Drop and recreate the user's HAS_ROLE relationships.
    async fn replace_user_roles(&self, user: &User) -> Result<()> {
        let clear = query("MATCH (:User {id: $id})-[r:HAS_ROLE]->() DELETE r")
            .param("id", user.id.to_string());
        self.graph.run(clear).await?;

        for role in &user.roles {
            let q = query(
                "MATCH (u:User {id: $user_id}), (r:Role {id: $role_id}) \
                 CREATE (u)-[:HAS_ROLE]->(r)",
            )
            .param("user_id", user.id.to_string())
            .param("role_id", role.id.to_string());
            self.graph.run(q).await?;
        }
        Ok(())
    }

    pub async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let q = query("MATCH (n:User {id: $id}) RETURN n").param("id", id.to_string());
        self.fetch_one_user(q).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let q = query("MATCH (n:User {email: $email}) RETURN n").param("email", email);
        self.fetch_one_user(q).await
    }

    async fn fetch_one_user(&self, q: Query) -> Result<Option<User>> {
        let mut result = self.graph.execute(q).await?;
        let node = match result.next().await? {
            Some(row) => row.get::<neo4rs::Node>("n")?,
            None => return Ok(None),
        };
        let mut user = Self::node_to_user(&node)?;
        user.roles = self.roles_of_user(user.id).await?;
        Ok(Some(user))
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let q = query("MATCH (n:User) RETURN n ORDER BY n.created_date");
        let mut result = self.graph.execute(q).await?;
        let mut users = Vec::new();
        while let Some(row) = result.next().await? {
            let node: neo4rs::Node = row.get("n")?;
            users.push(Self::node_to_user(&node)?);
        }
        for user in &mut users {
            user.roles = self.roles_of_user(user.id).await?;
        }
        Ok(users)
    }

    async fn roles_of_user(&self, user_id: Uuid) -> Result<Vec<Role>> {
        let q = query(
            "MATCH (:User {id: $id})-[:HAS_ROLE]->(r:Role) \
             OPTIONAL MATCH (r)-[:SCOPED_TO]->(p:Project) \
             RETURN r, collect(p.id) AS scope ORDER BY r.name",
        )
        .param("id", user_id.to_string());
        let mut result = self.graph.execute(q).await?;
        let mut roles = Vec::new();
        while let Some(row) = result.next().await? {
            let node: neo4rs::Node = row.get("r")?;
            let scope: Vec<String> = row.get("scope")?;
            roles.push(Self::node_to_role(&node, &scope)?);
        }
        Ok(roles)
    }

    fn node_to_user(node: &neo4rs::Node) -> Result<User> {
        Ok(User {
            id: node.get::<String>("id")?.parse()?,
            first_name: node.get::<Option<String>>("first_name")?,
            last_name: node.get::<Option<String>>("last_name")?,
            email: node.get("email")?,
            login: node.get("login")?,
            avatar: node.get::<Option<String>>("avatar")?,
            primary_project_id: node
                .get::<Option<String>>("primary_project_id")?
                .map(|s| s.parse())
                .transpose()?,
            roles: Vec::new(),
            audit: Self::node_audit(node)?,
        })
    }

    // ========================================================================
    // Role operations
    // ========================================================================

    pub async fn create_role(&self, role: &Role) -> Result<()> {
        let q = query(&format!(
            "CREATE (n:Role {{id: $id, name: $name, description: $description, \
             is_system: $is_system, permissions: $permissions, {}}})",
            Self::AUDIT_PROPS
        ))
        .param("id", role.id.to_string())
        .param("name", role.name.clone())
        .param("description", role.description.clone())
        .param("is_system", role.is_system)
        .param("permissions", role.permissions.clone());
        self.graph.run(Self::with_audit_params(q, &role.audit)).await?;

        self.set_role_scope(role.id, &role.scoped_project_ids).await
    }

    pub async fn get_role(&self, id: Uuid) -> Result<Option<Role>> {
        let q = query(
            "MATCH (r:Role {id: $id}) OPTIONAL MATCH (r)-[:SCOPED_TO]->(p:Project) \
             RETURN r, collect(p.id) AS scope",
        )
        .param("id", id.to_string());
        self.fetch_one_role(q).await
    }

    pub async fn get_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let q = query(
            "MATCH (r:Role {name: $name}) OPTIONAL MATCH (r)-[:SCOPED_TO]->(p:Project) \
             RETURN r, collect(p.id) AS scope",
        )
        .param("name", name);
        self.fetch_one_role(q).await
    }

    async fn fetch_one_role(&self, q: Query) -> Result<Option<Role>> {
        let mut result = self.graph.execute(q).await?;
        if let Some(row) = result.next().await? {
            let node: neo4rs::Node = row.get("r")?;
            let scope: Vec<String> = row.get("scope")?;
            Ok(Some(Self::node_to_role(&node, &scope)?))
        } else {
            Ok(None)
        }
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>> {
        let q = query(
            "MATCH (r:Role) OPTIONAL MATCH (r)-[:SCOPED_TO]->(p:Project) \
             RETURN r, collect(p.id) AS scope ORDER BY r.name",
        );
        let mut result = self.graph.execute(q).await?;
        let mut roles = Vec::new();
        while let Some(row) = result.next().await? {
            let node: neo4rs::Node = row.get("r")?;
            let scope: Vec<String> = row.get("scope")?;
            roles.push(Self::node_to_role(&node, &scope)?);
        }
        Ok(roles)
    }

    pub async fn set_role_scope(&self, role_id: Uuid, project_ids: &[Uuid]) -> Result<()> {
        let clear = query("MATCH (:Role {id: $id})-[s:SCOPED_TO]->() DELETE s")
            .param("id", role_id.to_string());
        self.graph.run(clear).await?;

        for project_id in project_ids {
            let q = query(
                "MATCH (r:Role {id: $role_id}), (p:Project {id: $project_id}) \
                 CREATE (r)-[:SCOPED_TO]->(p)",
            )
            .param("role_id", role_id.to_string())
            .param("project_id", project_id.to_string());
            self.graph.run(q).await?;
        }
        Ok(())
    }

    fn node_to_role(node: &neo4rs::Node, scope: &[String]) -> Result<Role> {
        Ok(Role {
            id: node.get::<String>("id")?.parse()?,
            name: node.get("name")?,
            description: node.get::<Option<String>>("description")?,
            is_system: node.get("is_system")?,
            permissions: node.get("permissions")?,
            scoped_project_ids: scope
                .iter()
                .map(|s| s.parse().map_err(|e| anyhow!("bad project id: {}", e)))
                .collect::<Result<Vec<Uuid>>>()?,
            audit: Self::node_audit(node)?,
        })
    }

    // ========================================================================
    // User↔project assignment operations
    // ========================================================================

    pub async fn list_assignments_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<UserProjectAssignment>> {
        let q = query(
            "MATCH (u:User {id: $id})-[a:ASSIGNED_TO]->(p:Project) \
             RETURN a, p.id AS project_id",
        )
        .param("id", user_id.to_string());
        let mut result = self.graph.execute(q).await?;
        let mut assignments = Vec::new();
        while let Some(row) = result.next().await? {
            let rel: neo4rs::Relation = row.get("a")?;
            let project_id: String = row.get("project_id")?;
            assignments.push(UserProjectAssignment {
                user_id,
                project_id: project_id.parse()?,
                access_level: AccessLevel::from_str(&rel.get::<String>("access_level")?)
                    .map_err(|e| anyhow!(e))?,
                assigned_by: rel.get::<Option<String>>("assigned_by")?,
                assigned_date: rel.get::<String>("assigned_date")?.parse()?,
            });
        }
        Ok(assignments)
    }

    pub async fn assign_user_to_project(&self, assignment: &UserProjectAssignment) -> Result<()> {
        let q = query(
            "MATCH (u:User {id: $user_id}), (p:Project {id: $project_id}) \
             MERGE (u)-[a:ASSIGNED_TO]->(p) \
             SET a.access_level = $access_level, a.assigned_by = $assigned_by, \
             a.assigned_date = $assigned_date",
        )
        .param("user_id", assignment.user_id.to_string())
        .param("project_id", assignment.project_id.to_string())
        .param("access_level", assignment.access_level.to_string())
        .param("assigned_by", assignment.assigned_by.clone())
        .param("assigned_date", assignment.assigned_date.to_rfc3339());
        self.graph.run(q).await?;
        Ok(())
    }

    pub async fn remove_user_from_project(&self, user_id: Uuid, project_id: Uuid) -> Result<()> {
        let q = query(
            "MATCH (:User {id: $user_id})-[a:ASSIGNED_TO]->(:Project {id: $project_id}) \
             DELETE a",
        )
        .param("user_id", user_id.to_string())
        .param("project_id", project_id.to_string());
        self.graph.run(q).await?;
        Ok(())
    }
}

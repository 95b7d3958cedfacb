//! Strategic-planning hierarchy core
//!
//! Models, progress aggregation, activation cascades, the orchestration
//! service, and bulk import.

pub mod aggregator;
pub mod cascade;
pub mod import;
pub mod models;
pub mod service;

pub use models::*;
pub use service::HierarchyService;

use thiserror::Error;
use uuid::Uuid;

/// Core error taxonomy. `NotFound` and `InvalidState` surface to callers
/// as-is; store failures are wrapped and treated as internal.
#[derive(Debug, Error)]
pub enum HierarchyError {
    #[error("{kind} not found: {key}")]
    NotFound { kind: String, key: String },
    #[error("{0}")]
    InvalidState(String),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl HierarchyError {
    pub fn not_found(level: Level, id: Uuid) -> Self {
        Self::NotFound {
            kind: level.to_string(),
            key: id.to_string(),
        }
    }

    /// Not-found for non-hierarchy records (users, roles).
    pub fn missing(kind: &str, key: impl ToString) -> Self {
        Self::NotFound {
            kind: kind.to_string(),
            key: key.to_string(),
        }
    }
}

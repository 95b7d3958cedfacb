//! Bulk import handler
//!
//! Accepts pre-parsed hierarchy rows as JSON; the spreadsheet/CSV parsing
//! itself happens client-side or in tooling, this endpoint only produces
//! create-operations against the hierarchy.

use axum::{extract::State, Extension, Json};
use serde::Serialize;

use super::handlers::{current_user, require_permission, ApiState, AppError};
use crate::access::models::MANAGE_USERS;
use crate::auth::jwt::Claims;
use crate::hierarchy::import::{import_rows, ImportRow, ImportSummary};

#[derive(Serialize)]
pub struct ImportResponse {
    pub message: String,
    #[serde(flatten)]
    pub summary: ImportSummary,
}

pub async fn import_hierarchy(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Json(rows): Json<Vec<ImportRow>>,
) -> Result<Json<ImportResponse>, AppError> {
    let user = current_user(&state, &claims).await?;
    require_permission(&user, MANAGE_USERS)?;

    if rows.is_empty() {
        return Err(AppError::BadRequest(
            "No rows to import".to_string(),
        ));
    }

    let summary = import_rows(&state.hierarchy, &rows, &user.email).await?;
    Ok(Json(ImportResponse {
        message: format!(
            "Hierarchy imported successfully. Total records processed: {}",
            summary.rows
        ),
        summary,
    }))
}

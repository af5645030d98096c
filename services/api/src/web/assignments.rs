//! services/api/src/web/assignments.rs
//!
//! User-scoped CRUD endpoints for assignments, plus the aggregate stats
//! endpoint. GET responses go through the per-user TTL cache; write
//! handlers invalidate the whole `/api/assignments` prefix.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Duration, Utc};
use organizer_core::domain::{Assignment, AssignmentStatus, NewAssignment};
use organizer_core::ports::PortError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::cache::{LIST_TTL, STATS_TTL};
use crate::web::state::{AppState, AuthUser};

const CACHE_PREFIX: &str = "/api/assignments";
const STATS_PATH: &str = "/api/assignments/stats";

#[derive(Deserialize)]
pub struct CreateAssignmentRequest {
    pub title: String,
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct UpdateAssignmentRequest {
    pub status: AssignmentStatus,
}

/// Counts shown on the dashboard.
#[derive(Serialize)]
pub struct AssignmentStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    /// Not-completed assignments due within the next seven days.
    pub due_soon: usize,
}

fn internal(e: PortError) -> (StatusCode, String) {
    error!("Assignment query failed: {:?}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Failed to process assignments".to_string())
}

/// GET /api/assignments - all assignments for the caller, newest first.
pub async fn list_assignments_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Value>, (StatusCode, String)> {
    if let Some(cached) = state.cache.get(auth.id, CACHE_PREFIX).await {
        return Ok(Json(cached));
    }

    let assignments = state.db.list_assignments(auth.id).await.map_err(internal)?;
    let body = serde_json::to_value(&assignments)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    state.cache.insert(auth.id, CACHE_PREFIX, body.clone(), LIST_TTL).await;
    Ok(Json(body))
}

/// GET /api/assignments/stats - per-status counts for the caller.
pub async fn assignment_stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Value>, (StatusCode, String)> {
    if let Some(cached) = state.cache.get(auth.id, STATS_PATH).await {
        return Ok(Json(cached));
    }

    let assignments = state.db.list_assignments(auth.id).await.map_err(internal)?;
    let stats = compute_stats(&assignments, Utc::now());
    let body = serde_json::to_value(&stats)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    state.cache.insert(auth.id, STATS_PATH, body.clone(), STATS_TTL).await;
    Ok(Json(body))
}

fn compute_stats(assignments: &[Assignment], now: DateTime<Utc>) -> AssignmentStats {
    let count = |status: AssignmentStatus| {
        assignments.iter().filter(|a| a.status == status).count()
    };
    let due_soon = assignments
        .iter()
        .filter(|a| {
            a.status != AssignmentStatus::Completed
                && a.deadline >= now
                && a.deadline < now + Duration::days(7)
        })
        .count();
    AssignmentStats {
        total: assignments.len(),
        pending: count(AssignmentStatus::Pending),
        in_progress: count(AssignmentStatus::InProgress),
        completed: count(AssignmentStatus::Completed),
        due_soon,
    }
}

/// POST /api/assignments - create an assignment for the caller.
pub async fn create_assignment_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateAssignmentRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.title.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Title and deadline are required".to_string()));
    }

    let assignment = state
        .db
        .create_assignment(
            auth.id,
            NewAssignment {
                title: req.title,
                description: req.description,
                deadline: req.deadline,
            },
        )
        .await
        .map_err(internal)?;

    state.cache.invalidate(auth.id, CACHE_PREFIX).await;
    Ok((StatusCode::CREATED, Json(assignment)))
}

/// PUT /api/assignments/{id} - update an assignment's status.
pub async fn update_assignment_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAssignmentRequest>,
) -> Result<Json<Assignment>, (StatusCode, String)> {
    let assignment = state
        .db
        .update_assignment_status(auth.id, id, req.status)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "Assignment not found".to_string())
            }
            other => internal(other),
        })?;

    state.cache.invalidate(auth.id, CACHE_PREFIX).await;
    Ok(Json(assignment))
}

/// DELETE /api/assignments/{id}
pub async fn delete_assignment_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .db
        .delete_assignment(auth.id, id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "Assignment not found".to_string())
            }
            other => internal(other),
        })?;

    state.cache.invalidate(auth.id, CACHE_PREFIX).await;
    Ok(Json(serde_json::json!({ "message": "Assignment deleted" })))
}

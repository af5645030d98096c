//! services/api/src/web/notes.rs
//!
//! User-scoped CRUD endpoints for study notes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use organizer_core::domain::{NewNote, Note};
use organizer_core::ports::PortError;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::cache::LIST_TTL;
use crate::web::state::{AppState, AuthUser};

const CACHE_PREFIX: &str = "/api/notes";

#[derive(Deserialize)]
pub struct CreateNoteRequest {
    pub title: String,
    pub content: String,
    pub link: Option<String>,
    pub tag: Option<String>,
}

fn internal(e: PortError) -> (StatusCode, String) {
    error!("Note query failed: {:?}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Failed to process notes".to_string())
}

/// GET /api/notes - all notes for the caller, newest first.
pub async fn list_notes_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Value>, (StatusCode, String)> {
    if let Some(cached) = state.cache.get(auth.id, CACHE_PREFIX).await {
        return Ok(Json(cached));
    }

    let notes = state.db.list_notes(auth.id).await.map_err(internal)?;
    let body = serde_json::to_value(&notes)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    state.cache.insert(auth.id, CACHE_PREFIX, body.clone(), LIST_TTL).await;
    Ok(Json(body))
}

/// POST /api/notes
pub async fn create_note_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<Note>), (StatusCode, String)> {
    if req.title.trim().is_empty() || req.content.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Title and content are required".to_string()));
    }

    let note = state
        .db
        .create_note(
            auth.id,
            NewNote {
                title: req.title,
                content: req.content,
                link: req.link.filter(|l| !l.is_empty()),
                tag: req.tag.filter(|t| !t.is_empty()),
            },
        )
        .await
        .map_err(internal)?;

    state.cache.invalidate(auth.id, CACHE_PREFIX).await;
    Ok((StatusCode::CREATED, Json(note)))
}

/// DELETE /api/notes/{id}
pub async fn delete_note_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state.db.delete_note(auth.id, id).await.map_err(|e| match e {
        PortError::NotFound(_) => (StatusCode::NOT_FOUND, "Note not found".to_string()),
        other => internal(other),
    })?;

    state.cache.invalidate(auth.id, CACHE_PREFIX).await;
    Ok(Json(serde_json::json!({ "message": "Note deleted" })))
}

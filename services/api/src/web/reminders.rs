//! services/api/src/web/reminders.rs
//!
//! The authenticated manual trigger for the reminder pipeline.

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use crate::web::state::{AppState, AuthUser};

#[derive(Serialize, ToSchema)]
pub struct TriggerRemindersResponse {
    pub completed: bool,
}

/// POST /api/trigger-reminders - run the scan-filter-notify-mark
/// pipeline synchronously.
///
/// The response is deliberately coarse: per-candidate outcomes are in
/// the logs, and a completed run with zero eligible candidates looks
/// the same as one that sent five reminders.
#[utoipa::path(
    post,
    path = "/api/trigger-reminders",
    responses(
        (status = 200, description = "Reminder check completed", body = TriggerRemindersResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []))
)]
pub async fn trigger_reminders_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> (StatusCode, Json<TriggerRemindersResponse>) {
    info!("Manual reminder check triggered by {}", auth.email);
    let completed = state.reminders.run_manual_check().await;
    (
        StatusCode::OK,
        Json(TriggerRemindersResponse { completed }),
    )
}

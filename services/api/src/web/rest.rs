//! services/api/src/web/rest.rs
//!
//! The health endpoint and the master definition for the OpenAPI
//! specification.

use axum::{http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;
use utoipa::OpenApi;

use crate::web::auth::{AuthResponse, LoginRequest, RegisterRequest, UserResponse};
use crate::web::reminders::TriggerRemindersResponse;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::register_handler,
        crate::web::auth::login_handler,
        crate::web::auth::me_handler,
        crate::web::reminders::trigger_reminders_handler,
    ),
    components(
        schemas(RegisterRequest, LoginRequest, AuthResponse, UserResponse, TriggerRemindersResponse)
    ),
    tags(
        (name = "Academic Organizer API", description = "Assignments, notes and deadline reminders.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Health
//=========================================================================================

/// GET /health - liveness probe, no auth.
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}

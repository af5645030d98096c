//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use organizer_core::ports::DatabaseService;
use organizer_core::reminder::ReminderPipeline;
use uuid::Uuid;

use crate::cache::ResponseCache;
use crate::config::Config;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub cache: Arc<ResponseCache>,
    pub reminders: Arc<ReminderPipeline>,
}

/// The authenticated caller, extracted by the auth middleware and made
/// available to handlers through request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

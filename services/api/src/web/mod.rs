pub mod assignments;
pub mod auth;
pub mod middleware;
pub mod notes;
pub mod reminders;
pub mod rest;
pub mod state;

// Re-export the pieces the binary needs to build the router.
pub use middleware::require_auth;
pub use rest::{health_handler, ApiDoc};
pub use state::AppState;

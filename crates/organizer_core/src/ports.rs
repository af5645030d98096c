//! crates/organizer_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or SMTP.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Assignment, AssignmentStatus, NewAssignment, NewNote, Note, ReminderCandidate, User,
    UserCredentials,
};
use crate::reminder::ScanWindow;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    async fn create_user(&self, email: &str, password_hash: &str) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    // --- Assignment Management (user-scoped) ---
    async fn create_assignment(
        &self,
        user_id: Uuid,
        new_assignment: NewAssignment,
    ) -> PortResult<Assignment>;

    /// All assignments for a user, newest first.
    async fn list_assignments(&self, user_id: Uuid) -> PortResult<Vec<Assignment>>;

    async fn update_assignment_status(
        &self,
        user_id: Uuid,
        assignment_id: Uuid,
        status: AssignmentStatus,
    ) -> PortResult<Assignment>;

    async fn delete_assignment(&self, user_id: Uuid, assignment_id: Uuid) -> PortResult<()>;

    // --- Note Management (user-scoped) ---
    async fn create_note(&self, user_id: Uuid, new_note: NewNote) -> PortResult<Note>;

    async fn list_notes(&self, user_id: Uuid) -> PortResult<Vec<Note>>;

    async fn delete_note(&self, user_id: Uuid, note_id: Uuid) -> PortResult<()>;

    // --- Reminder Subsystem ---

    /// All assignments whose deadline falls inside `window`, with
    /// `reminder_sent = false` and status other than completed, joined
    /// with the owning user's email. A failure here aborts the whole
    /// scan; no assignment may be partially marked by this call.
    async fn scan_due_tomorrow(&self, window: ScanWindow) -> PortResult<Vec<ReminderCandidate>>;

    /// Durably record that a reminder went out. Must be idempotent:
    /// setting an already-true flag is a no-op in effect.
    async fn mark_reminder_sent(
        &self,
        assignment_id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> PortResult<()>;
}

#[async_trait]
pub trait MailService: Send + Sync {
    /// Attempt delivery of one deadline reminder. Returns whether the
    /// message was handed to the transport; never errors past this
    /// boundary. An unconfigured or unreachable transport yields false.
    async fn send_deadline_reminder(
        &self,
        to_address: &str,
        assignment_title: &str,
        deadline: DateTime<Utc>,
    ) -> bool;

    /// Verify the transport is reachable. False when unconfigured.
    async fn test_connection(&self) -> bool;
}

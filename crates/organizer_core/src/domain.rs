//! crates/organizer_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format
//! beyond the serde derives needed for API payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The workflow state of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
}

impl AssignmentStatus {
    /// The string form stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::InProgress => "in-progress",
            AssignmentStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AssignmentStatus::Pending),
            "in-progress" => Some(AssignmentStatus::InProgress),
            "completed" => Some(AssignmentStatus::Completed),
            _ => None,
        }
    }
}

/// Represents an assignment tracked by a user.
///
/// Invariant: `reminder_sent_at` is `Some` if and only if `reminder_sent`
/// is true. Only the reminder pipeline mutates those two fields.
#[derive(Debug, Clone, Serialize)]
pub struct Assignment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
    pub status: AssignmentStatus,
    pub created_at: DateTime<Utc>,
    pub reminder_sent: bool,
    pub reminder_sent_at: Option<DateTime<Utc>>,
}

/// The fields a client supplies when creating an assignment.
#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub title: String,
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
}

// Represents a user - used throughout the app
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
}

/// A free-form study note owned by a user.
#[derive(Debug, Clone, Serialize)]
pub struct Note {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub link: Option<String>,
    pub tag: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub link: Option<String>,
    pub tag: Option<String>,
}

/// An assignment provisionally eligible for a reminder, joined with the
/// owning user's email. Derived per scan, never persisted.
#[derive(Debug, Clone)]
pub struct ReminderCandidate {
    pub assignment_id: Uuid,
    pub title: String,
    pub deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub user_email: String,
}

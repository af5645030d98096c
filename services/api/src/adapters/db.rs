//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use organizer_core::domain::{
    Assignment, AssignmentStatus, NewAssignment, NewNote, Note, ReminderCandidate, User,
    UserCredentials,
};
use organizer_core::ports::{DatabaseService, PortError, PortResult};
use organizer_core::reminder::ScanWindow;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    password_hash: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            id: self.id,
            email: self.email,
            password_hash: self.password_hash,
        }
    }
}

#[derive(FromRow)]
struct AssignmentRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    description: Option<String>,
    deadline: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
    reminder_sent: bool,
    reminder_sent_at: Option<DateTime<Utc>>,
}
impl AssignmentRecord {
    fn to_domain(self) -> PortResult<Assignment> {
        let status = AssignmentStatus::parse(&self.status).ok_or_else(|| {
            PortError::Unexpected(format!("invalid assignment status '{}'", self.status))
        })?;
        Ok(Assignment {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            deadline: self.deadline,
            status,
            created_at: self.created_at,
            reminder_sent: self.reminder_sent,
            reminder_sent_at: self.reminder_sent_at,
        })
    }
}

const ASSIGNMENT_COLUMNS: &str =
    "id, user_id, title, description, deadline, status, created_at, reminder_sent, reminder_sent_at";

#[derive(FromRow)]
struct NoteRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    content: String,
    link: Option<String>,
    tag: Option<String>,
    created_at: DateTime<Utc>,
}
impl NoteRecord {
    fn to_domain(self) -> Note {
        Note {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            content: self.content,
            link: self.link,
            tag: self.tag,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CandidateRecord {
    assignment_id: Uuid,
    title: String,
    deadline: DateTime<Utc>,
    created_at: DateTime<Utc>,
    user_email: String,
}
impl CandidateRecord {
    fn to_domain(self) -> ReminderCandidate {
        ReminderCandidate {
            assignment_id: self.assignment_id,
            title: self.title,
            deadline: self.deadline,
            created_at: self.created_at,
            user_email: self.user_email,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, email: &str, password_hash: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING id, email, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                PortError::Conflict(format!("User with email {} already exists", email))
            } else {
                unexpected(e)
            }
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn create_assignment(
        &self,
        user_id: Uuid,
        new_assignment: NewAssignment,
    ) -> PortResult<Assignment> {
        let record = sqlx::query_as::<_, AssignmentRecord>(&format!(
            "INSERT INTO assignments (id, user_id, title, description, deadline) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {ASSIGNMENT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&new_assignment.title)
        .bind(&new_assignment.description)
        .bind(new_assignment.deadline)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn list_assignments(&self, user_id: Uuid) -> PortResult<Vec<Assignment>> {
        let records = sqlx::query_as::<_, AssignmentRecord>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments \
             WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn update_assignment_status(
        &self,
        user_id: Uuid,
        assignment_id: Uuid,
        status: AssignmentStatus,
    ) -> PortResult<Assignment> {
        let record = sqlx::query_as::<_, AssignmentRecord>(&format!(
            "UPDATE assignments SET status = $1 \
             WHERE id = $2 AND user_id = $3 RETURNING {ASSIGNMENT_COLUMNS}"
        ))
        .bind(status.as_str())
        .bind(assignment_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Assignment {} not found", assignment_id))
            }
            _ => unexpected(e),
        })?;
        record.to_domain()
    }

    async fn delete_assignment(&self, user_id: Uuid, assignment_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM assignments WHERE id = $1 AND user_id = $2")
            .bind(assignment_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Assignment {} not found",
                assignment_id
            )));
        }
        Ok(())
    }

    async fn create_note(&self, user_id: Uuid, new_note: NewNote) -> PortResult<Note> {
        let record = sqlx::query_as::<_, NoteRecord>(
            "INSERT INTO notes (id, user_id, title, content, link, tag) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, user_id, title, content, link, tag, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&new_note.title)
        .bind(&new_note.content)
        .bind(&new_note.link)
        .bind(&new_note.tag)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_notes(&self, user_id: Uuid) -> PortResult<Vec<Note>> {
        let records = sqlx::query_as::<_, NoteRecord>(
            "SELECT id, user_id, title, content, link, tag, created_at FROM notes \
             WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn delete_note(&self, user_id: Uuid, note_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND user_id = $2")
            .bind(note_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Note {} not found", note_id)));
        }
        Ok(())
    }

    async fn scan_due_tomorrow(&self, window: ScanWindow) -> PortResult<Vec<ReminderCandidate>> {
        let records = sqlx::query_as::<_, CandidateRecord>(
            "SELECT a.id AS assignment_id, a.title, a.deadline, a.created_at, \
                    u.email AS user_email \
             FROM assignments a \
             JOIN users u ON a.user_id = u.id \
             WHERE a.deadline >= $1 \
               AND a.deadline < $2 \
               AND a.reminder_sent = false \
               AND a.status != 'completed'",
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn mark_reminder_sent(
        &self,
        assignment_id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> PortResult<()> {
        // Unconditional SET: a duplicate invocation rewrites the same
        // values, which keeps the operation idempotent in effect.
        sqlx::query(
            "UPDATE assignments SET reminder_sent = true, reminder_sent_at = $2 WHERE id = $1",
        )
        .bind(assignment_id)
        .bind(sent_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }
}

//! Collaborator resolution against the user and task services.
//!
//! herald owns no task or user data; everything is re-fetched per operation
//! from the upstream services. The trait seams exist so the orchestrator can
//! be exercised with in-memory doubles.

mod http;

pub use http::{HttpTaskDirectory, HttpUserDirectory};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status value that suppresses reminders and overdue alerts.
pub const STATUS_COMPLETED: &str = "Completed";

/// Display name used when the user lookup fails.
pub const FALLBACK_DISPLAY_NAME: &str = "A team member";

/// Deadline text used when a task has no (parseable) deadline.
pub const NO_DEADLINE: &str = "No deadline set";

/// Errors from upstream directory calls.
///
/// `NotFound` is terminal for the current operation (retrying cannot make
/// missing data appear); `Unavailable` is transient and the caller may retry.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The upstream service answered 404 (or another terminal client error).
    #[error("{0} not found upstream")]
    NotFound(String),

    /// Timeout, connection failure, or 5xx from the upstream service.
    #[error("upstream service unavailable: {0}")]
    Unavailable(String),

    /// The upstream answered 2xx but the body did not decode.
    #[error("failed to decode upstream response: {0}")]
    Decode(String),
}

impl DirectoryError {
    /// Returns whether retrying the call later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DirectoryError::Unavailable(_))
    }
}

/// A task as served by the task service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: String,
    pub owner_id: i64,
    #[serde(default)]
    pub parent_task_id: Option<i64>,
    /// ISO-8601 deadline, if any. Kept as the raw string so an unparseable
    /// value degrades per-task instead of failing the whole response.
    #[serde(default)]
    pub deadline: Option<String>,
}

impl Task {
    /// A subtask is any task with a parent.
    pub fn is_subtask(&self) -> bool {
        self.parent_task_id.is_some()
    }

    /// Returns whether the task is in the Completed status.
    pub fn is_completed(&self) -> bool {
        self.status == STATUS_COMPLETED
    }

    /// Parses the deadline into the reference timezone.
    ///
    /// Accepts RFC 3339 timestamps (including a trailing `Z`); naive
    /// timestamps are assumed to already be in the reference timezone.
    /// Returns `None` for a missing or unparseable deadline.
    pub fn parsed_deadline(&self, tz: Tz) -> Option<DateTime<Tz>> {
        let raw = self.deadline.as_deref()?;
        parse_deadline(raw, tz)
    }

    /// Human-readable deadline for email bodies, e.g.
    /// "December 31, 2026 at 02:00 PM".
    pub fn display_deadline(&self, tz: Tz) -> String {
        match self.parsed_deadline(tz) {
            Some(dt) => dt.format("%B %d, %Y at %I:%M %p").to_string(),
            None => NO_DEADLINE.to_string(),
        }
    }

    /// Description with the empty/missing fallback applied.
    pub fn display_description(&self) -> &str {
        match self.description.as_deref() {
            Some(d) if !d.is_empty() => d,
            _ => "No description provided",
        }
    }
}

/// A user as served by the user service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// A collaborator entry on a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collaborator {
    pub user_id: i64,
    #[serde(default)]
    pub role: Option<String>,
}

/// Read access to the user service.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetches a single user by id.
    async fn fetch_user(&self, user_id: i64) -> Result<User, DirectoryError>;
}

/// Read access to the task service.
#[async_trait]
pub trait TaskDirectory: Send + Sync {
    /// Fetches a single task by id.
    async fn fetch_task(&self, task_id: i64) -> Result<Task, DirectoryError>;

    /// Fetches the collaborator user ids for a task.
    async fn fetch_collaborators(&self, task_id: i64) -> Result<Vec<i64>, DirectoryError>;

    /// Fetches every task and subtask that carries a deadline.
    async fn fetch_tasks_with_deadlines(&self) -> Result<Vec<Task>, DirectoryError>;
}

/// Parses a deadline string into the reference timezone.
pub fn parse_deadline(raw: &str, tz: Tz) -> Option<DateTime<Tz>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&tz));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    tz.from_local_datetime(&naive).single()
}

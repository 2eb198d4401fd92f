//! Persistent deduplication ledger.
//!
//! The ledger records every reminder, overdue alert, and mention email that
//! was actually delivered, and answers "was this already sent?" before the
//! orchestrator does any work. It is the only state herald owns.

pub mod schema;

mod store;

pub use store::PgLedger;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

/// Errors from the deduplication ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Could not reach the database at startup.
    #[error("ledger connection failed: {0}")]
    ConnectionFailed(String),

    /// The record already exists. The constraint fired, so the event was
    /// handled by a concurrent worker; callers log and move on.
    #[error("already recorded: {0}")]
    Duplicate(String),

    /// A schema migration failed to apply.
    #[error("ledger migration failed: {0}")]
    Migration(String),

    /// Any other database failure.
    #[error("ledger query failed: {0}")]
    Database(#[from] sqlx::Error),
}

impl LedgerError {
    /// Returns whether the error means the work was already done elsewhere.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, LedgerError::Duplicate(_))
    }
}

/// Append-only record of delivered notifications.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Whether a reminder for this (task, days_before) was already sent.
    async fn reminder_sent(&self, task_id: i64, days_before: i32) -> Result<bool, LedgerError>;

    /// Records a delivered reminder. `Duplicate` if the row already exists.
    async fn record_reminder(&self, task_id: i64, days_before: i32) -> Result<(), LedgerError>;

    /// Whether an overdue alert for this (task, calendar day) was already sent.
    async fn overdue_alert_sent(
        &self,
        task_id: i64,
        alert_date: NaiveDate,
    ) -> Result<bool, LedgerError>;

    /// Records a delivered overdue alert. `Duplicate` if the row already exists.
    async fn record_overdue_alert(
        &self,
        task_id: i64,
        alert_date: NaiveDate,
        days_overdue: i64,
    ) -> Result<(), LedgerError>;

    /// Whether a mention email for this (comment, user) was already sent.
    async fn mention_sent(
        &self,
        comment_id: i64,
        mentioned_user_id: i64,
    ) -> Result<bool, LedgerError>;

    /// Records a delivered mention email. `Duplicate` if the row already exists.
    async fn record_mention(
        &self,
        task_id: i64,
        comment_id: i64,
        mentioned_user_id: i64,
        author_id: i64,
    ) -> Result<(), LedgerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_detection() {
        assert!(LedgerError::Duplicate("reminder (task 1, 7 days)".into()).is_duplicate());
        assert!(!LedgerError::Migration("boom".into()).is_duplicate());
    }
}

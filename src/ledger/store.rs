//! PostgreSQL implementation of the deduplication ledger.
//!
//! Inserts rely on the unique constraints: a concurrent duplicate insert
//! surfaces as `LedgerError::Duplicate`, which callers treat as "someone
//! else already handled this event" rather than a failure.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use super::schema;
use super::{Ledger, LedgerError};

/// PostgreSQL unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

/// Ledger backed by a PostgreSQL pool.
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    /// Connects to the database and returns a new ledger.
    pub async fn connect(database_url: &str) -> Result<Self, LedgerError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect(database_url)
            .await
            .map_err(|e| LedgerError::ConnectionFailed(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Creates a ledger from an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the ledger schema. Idempotent: already-applied migrations
    /// are skipped by name.
    pub async fn run_migrations(&self) -> Result<(), LedgerError> {
        sqlx::query(schema::CREATE_MIGRATIONS_TABLE)
            .execute(&self.pool)
            .await?;

        for (name, sql) in schema::migrations() {
            let applied: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _migrations WHERE name = $1)")
                    .bind(name)
                    .fetch_one(&self.pool)
                    .await?;
            if applied {
                continue;
            }

            let mut tx = self.pool.begin().await?;
            sqlx::query(sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| LedgerError::Migration(format!("{}: {}", name, e)))?;
            sqlx::query("INSERT INTO _migrations (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
                .bind(name)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            info!(migration = name, "applied ledger migration");
        }

        Ok(())
    }
}

/// Maps a unique-constraint violation to `Duplicate`, keeping everything
/// else as a database error.
fn map_insert_error(e: sqlx::Error, key: String) -> LedgerError {
    if let sqlx::Error::Database(ref db) = e {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return LedgerError::Duplicate(key);
        }
    }
    LedgerError::Database(e)
}

#[async_trait]
impl Ledger for PgLedger {
    async fn reminder_sent(&self, task_id: i64, days_before: i32) -> Result<bool, LedgerError> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT id FROM deadline_reminders WHERE task_id = $1 AND days_before = $2",
        )
        .bind(task_id)
        .bind(days_before)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    async fn record_reminder(&self, task_id: i64, days_before: i32) -> Result<(), LedgerError> {
        sqlx::query("INSERT INTO deadline_reminders (task_id, days_before) VALUES ($1, $2)")
            .bind(task_id)
            .bind(days_before)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                map_insert_error(e, format!("reminder (task {}, {} days)", task_id, days_before))
            })?;

        Ok(())
    }

    async fn overdue_alert_sent(
        &self,
        task_id: i64,
        alert_date: NaiveDate,
    ) -> Result<bool, LedgerError> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT id FROM overdue_alerts WHERE task_id = $1 AND alert_date = $2",
        )
        .bind(task_id)
        .bind(alert_date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    async fn record_overdue_alert(
        &self,
        task_id: i64,
        alert_date: NaiveDate,
        days_overdue: i64,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            "INSERT INTO overdue_alerts (task_id, alert_date, days_overdue) VALUES ($1, $2, $3)",
        )
        .bind(task_id)
        .bind(alert_date)
        .bind(days_overdue)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_insert_error(e, format!("overdue alert (task {}, {})", task_id, alert_date))
        })?;

        Ok(())
    }

    async fn mention_sent(
        &self,
        comment_id: i64,
        mentioned_user_id: i64,
    ) -> Result<bool, LedgerError> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT id FROM mention_notifications WHERE comment_id = $1 AND mentioned_user_id = $2",
        )
        .bind(comment_id)
        .bind(mentioned_user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    async fn record_mention(
        &self,
        task_id: i64,
        comment_id: i64,
        mentioned_user_id: i64,
        author_id: i64,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO mention_notifications (task_id, comment_id, mentioned_user_id, author_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(task_id)
        .bind(comment_id)
        .bind(mentioned_user_id)
        .bind(author_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_insert_error(
                e,
                format!("mention (comment {}, user {})", comment_id, mentioned_user_id),
            )
        })?;

        Ok(())
    }
}

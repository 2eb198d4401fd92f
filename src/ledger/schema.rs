//! Schema for the deduplication ledger.
//!
//! All tables are append-only: rows are created when a notification is
//! actually delivered and are never updated or deleted. The unique
//! constraints are the safety net against double-sends under concurrent
//! sweeps or message redelivery.
//!
//! Every migration is a single SQL command. Postgres refuses multi-command
//! strings over the prepared-statement protocol sqlx uses, so each index
//! gets its own entry.

/// Bookkeeping table for applied migrations.
pub const CREATE_MIGRATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS _migrations (
    id SERIAL PRIMARY KEY,
    name VARCHAR(255) NOT NULL UNIQUE,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// One row per delivered deadline reminder, at most one per
/// (task, days_before) ever.
pub const CREATE_DEADLINE_REMINDERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS deadline_reminders (
    id SERIAL PRIMARY KEY,
    task_id BIGINT NOT NULL,
    days_before INTEGER NOT NULL,
    sent_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE(task_id, days_before)
)
"#;

/// One row per delivered overdue alert, at most one per (task, calendar day).
pub const CREATE_OVERDUE_ALERTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS overdue_alerts (
    id SERIAL PRIMARY KEY,
    task_id BIGINT NOT NULL,
    alert_date DATE NOT NULL,
    days_overdue BIGINT NOT NULL,
    sent_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE(task_id, alert_date)
)
"#;

/// One row per delivered mention email, at most one per
/// (comment, mentioned user).
pub const CREATE_MENTION_NOTIFICATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS mention_notifications (
    id SERIAL PRIMARY KEY,
    task_id BIGINT NOT NULL,
    comment_id BIGINT NOT NULL,
    mentioned_user_id BIGINT NOT NULL,
    author_id BIGINT NOT NULL,
    sent_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE(comment_id, mentioned_user_id)
)
"#;

pub const CREATE_DEADLINE_REMINDERS_TASK_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_deadline_reminders_task ON deadline_reminders(task_id)";

pub const CREATE_OVERDUE_ALERTS_TASK_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_overdue_alerts_task ON overdue_alerts(task_id)";

pub const CREATE_MENTION_NOTIFICATIONS_TASK_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_mention_notifications_task ON mention_notifications(task_id)";

/// Named migrations in application order.
pub fn migrations() -> Vec<(&'static str, &'static str)> {
    vec![
        ("create_deadline_reminders", CREATE_DEADLINE_REMINDERS_TABLE),
        ("create_overdue_alerts", CREATE_OVERDUE_ALERTS_TABLE),
        (
            "create_mention_notifications",
            CREATE_MENTION_NOTIFICATIONS_TABLE,
        ),
        (
            "index_deadline_reminders_task",
            CREATE_DEADLINE_REMINDERS_TASK_INDEX,
        ),
        ("index_overdue_alerts_task", CREATE_OVERDUE_ALERTS_TASK_INDEX),
        (
            "index_mention_notifications_task",
            CREATE_MENTION_NOTIFICATIONS_TASK_INDEX,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_migrations_present() {
        let migrations = migrations();
        assert_eq!(migrations.len(), 6);
        assert!(migrations[0].1.contains("deadline_reminders"));
        assert!(migrations[1].1.contains("overdue_alerts"));
        assert!(migrations[2].1.contains("mention_notifications"));
    }

    #[test]
    fn test_migration_names_unique() {
        let names: HashSet<&str> = migrations().iter().map(|(name, _)| *name).collect();
        assert_eq!(names.len(), migrations().len());
    }

    #[test]
    fn test_each_migration_is_a_single_command() {
        // The prepared-statement protocol accepts exactly one command per
        // query, so no migration may pack several behind semicolons.
        for (name, sql) in migrations() {
            assert!(!sql.contains(';'), "migration {} has multiple commands", name);
        }
        assert!(!CREATE_MIGRATIONS_TABLE.contains(';'));
    }

    #[test]
    fn test_unique_constraints_declared() {
        assert!(CREATE_DEADLINE_REMINDERS_TABLE.contains("UNIQUE(task_id, days_before)"));
        assert!(CREATE_OVERDUE_ALERTS_TABLE.contains("UNIQUE(task_id, alert_date)"));
        assert!(CREATE_MENTION_NOTIFICATIONS_TABLE.contains("UNIQUE(comment_id, mentioned_user_id)"));
    }
}

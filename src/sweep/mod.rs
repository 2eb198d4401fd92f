//! Periodic deadline sweep.
//!
//! On every cron tick the sweeper fetches all tasks with deadlines and, per
//! task, decides which reminders (7, 3, 1 days before) and overdue alerts
//! are due right now. The sweep itself holds no state; rerunning it is safe
//! because the ledger suppresses anything already sent.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::directory::TaskDirectory;
use crate::notify::{Notifier, Outcome};

/// Days-before-deadline thresholds that trigger a reminder.
pub const REMINDER_THRESHOLDS: [u32; 3] = [7, 3, 1];

/// Errors from the sweeper lifecycle.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("sweeper is already running")]
    AlreadyRunning,

    #[error("sweeper is not running")]
    NotRunning,
}

/// Counters for one sweep pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepStats {
    pub scanned: usize,
    pub reminders_sent: usize,
    pub overdue_sent: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Which reminder thresholds fire today for a deadline.
///
/// A threshold fires when the deadline minus that many days lands on
/// today's date in the reference timezone. Comparing calendar dates (not
/// instants) means the reminder fires once on the right day regardless of
/// the deadline's time of day.
pub fn due_reminder_days(deadline: &DateTime<Tz>, today: NaiveDate) -> Vec<u32> {
    REMINDER_THRESHOLDS
        .iter()
        .copied()
        .filter(|&days| (*deadline - ChronoDuration::days(days as i64)).date_naive() == today)
        .collect()
}

/// Whole days a deadline is past, clamped to at least 1.
///
/// The clamp keeps a deadline missed a few hours ago from reporting
/// "0 days overdue".
pub fn days_overdue(deadline_utc: DateTime<Utc>, now_utc: DateTime<Utc>) -> i64 {
    (now_utc - deadline_utc).num_days().max(1)
}

/// Runs one sweep pass at the given instant.
///
/// Task failures are isolated: one bad task is counted and the sweep moves
/// on to the rest.
pub async fn run_sweep(
    tasks: &Arc<dyn TaskDirectory>,
    notifier: &Notifier,
    tz: Tz,
    now: DateTime<Utc>,
) -> SweepStats {
    let mut stats = SweepStats::default();

    let candidates = match tasks.fetch_tasks_with_deadlines().await {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!(error = %e, "deadline scan failed, skipping this pass");
            stats.errors += 1;
            return stats;
        }
    };

    let today = now.with_timezone(&tz).date_naive();
    let alert_date = now.date_naive();

    for task in candidates {
        stats.scanned += 1;

        if task.is_completed() {
            stats.skipped += 1;
            continue;
        }

        let deadline = match task.parsed_deadline(tz) {
            Some(deadline) => deadline,
            None => {
                debug!(task_id = task.id, "unparseable deadline, skipping");
                stats.skipped += 1;
                continue;
            }
        };

        for days in due_reminder_days(&deadline, today) {
            match notifier.send_deadline_reminder(task.id, days).await {
                Ok(Outcome::Delivered { sent, .. }) if sent > 0 => stats.reminders_sent += 1,
                Ok(_) => stats.skipped += 1,
                Err(e) => {
                    warn!(task_id = task.id, days, error = %e, "reminder failed");
                    stats.errors += 1;
                }
            }
        }

        let deadline_utc = deadline.with_timezone(&Utc);
        if deadline_utc < now {
            let overdue = days_overdue(deadline_utc, now);
            match notifier.send_overdue_alert(&task, overdue, alert_date).await {
                Ok(Outcome::Delivered { sent, .. }) if sent > 0 => stats.overdue_sent += 1,
                Ok(_) => stats.skipped += 1,
                Err(e) => {
                    warn!(task_id = task.id, error = %e, "overdue alert failed");
                    stats.errors += 1;
                }
            }
        }
    }

    info!(
        scanned = stats.scanned,
        reminders = stats.reminders_sent,
        overdue = stats.overdue_sent,
        skipped = stats.skipped,
        errors = stats.errors,
        "sweep pass complete"
    );
    stats
}

/// Runs the deadline sweep on a cron schedule until stopped.
pub struct DeadlineSweeper {
    schedule: Schedule,
    tz: Tz,
    tasks: Arc<dyn TaskDirectory>,
    notifier: Arc<Notifier>,
    shutdown_tx: Option<broadcast::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl DeadlineSweeper {
    pub fn new(
        schedule: Schedule,
        tz: Tz,
        tasks: Arc<dyn TaskDirectory>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            schedule,
            tz,
            tasks,
            notifier,
            shutdown_tx: None,
            handle: None,
        }
    }

    /// Runs one sweep pass immediately, outside the schedule.
    pub async fn run_once(&self) -> SweepStats {
        run_sweep(&self.tasks, &self.notifier, self.tz, Utc::now()).await
    }

    /// Spawns the scheduler loop.
    pub fn start(&mut self) -> Result<(), SweepError> {
        if self.shutdown_tx.is_some() {
            return Err(SweepError::AlreadyRunning);
        }

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let schedule = self.schedule.clone();
        let tz = self.tz;
        let tasks = Arc::clone(&self.tasks);
        let notifier = Arc::clone(&self.notifier);

        self.handle = Some(tokio::spawn(async move {
            info!("deadline sweeper running");

            loop {
                let next = match schedule.upcoming(tz).next() {
                    Some(next) => next,
                    None => {
                        warn!("sweep schedule has no upcoming fire time, sweeper exiting");
                        break;
                    }
                };

                let wait = (next.with_timezone(&Utc) - Utc::now())
                    .to_std()
                    .unwrap_or_default();
                debug!(next = %next, "sweeper sleeping until next tick");

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {
                        run_sweep(&tasks, &notifier, tz, Utc::now()).await;
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }

            info!("deadline sweeper exited");
        }));

        self.shutdown_tx = Some(shutdown_tx);
        Ok(())
    }

    /// Signals shutdown and waits for the loop to finish. An in-progress
    /// sweep pass runs to completion.
    pub async fn stop(&mut self) -> Result<(), SweepError> {
        let shutdown_tx = self.shutdown_tx.take().ok_or(SweepError::NotRunning)?;
        let _ = shutdown_tx.send(());

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!(error = %e, "sweeper loop panicked");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Singapore;

    fn deadline_at(y: i32, m: u32, d: u32, hour: u32) -> DateTime<Tz> {
        Singapore
            .with_ymd_and_hms(y, m, d, hour, 0, 0)
            .single()
            .unwrap()
    }

    #[test]
    fn test_due_days_seven_before() {
        let deadline = deadline_at(2026, 9, 8, 14);
        let today = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        assert_eq!(due_reminder_days(&deadline, today), vec![7]);
    }

    #[test]
    fn test_due_days_three_and_one() {
        let deadline = deadline_at(2026, 9, 8, 9);

        let three = NaiveDate::from_ymd_opt(2026, 9, 5).unwrap();
        assert_eq!(due_reminder_days(&deadline, three), vec![3]);

        let one = NaiveDate::from_ymd_opt(2026, 9, 7).unwrap();
        assert_eq!(due_reminder_days(&deadline, one), vec![1]);
    }

    #[test]
    fn test_due_days_none_on_off_days() {
        let deadline = deadline_at(2026, 9, 8, 9);

        for off in [2, 4, 5, 6, 8, 9] {
            let day = NaiveDate::from_ymd_opt(2026, 9, off).unwrap();
            assert!(due_reminder_days(&deadline, day).is_empty(), "day {}", off);
        }
    }

    #[test]
    fn test_due_days_time_of_day_irrelevant() {
        // Late-evening deadline still fires on the calendar day
        let deadline = deadline_at(2026, 9, 8, 23);
        let today = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        assert_eq!(due_reminder_days(&deadline, today), vec![7]);
    }

    #[test]
    fn test_days_overdue_clamped_to_one() {
        let deadline = Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 9, 1, 15, 0, 0).unwrap();
        assert_eq!(days_overdue(deadline, now), 1);
    }

    #[test]
    fn test_days_overdue_whole_days() {
        let deadline = Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0).unwrap();

        let now = Utc.with_ymd_and_hms(2026, 9, 3, 12, 0, 0).unwrap();
        assert_eq!(days_overdue(deadline, now), 2);

        let now = Utc.with_ymd_and_hms(2026, 9, 11, 13, 0, 0).unwrap();
        assert_eq!(days_overdue(deadline, now), 10);
    }
}

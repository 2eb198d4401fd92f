//! Notification orchestration.
//!
//! `Notifier` ties the directories, the dedup ledger, the renderer, and the
//! email gateway together. Every operation follows the same shape: check the
//! ledger, resolve recipients, render once, deliver per recipient, record.
//!
//! Recording happens after delivery, so a crash between the two can cause a
//! resend on the next pass; the alternative (record first) silently drops
//! notifications, which is worse. The unique constraints in the ledger keep
//! concurrent workers from recording twice.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::delivery::EmailGateway;
use crate::directory::{Task, TaskDirectory, UserDirectory, FALLBACK_DISPLAY_NAME};
use crate::ledger::{Ledger, LedgerError};
use crate::render::{self, CommentMeta, EmailContent};

/// Errors that abort a notification operation.
///
/// Everything here is retryable: the consumer requeues the message and the
/// sweep picks the task up again on the next tick. Terminal conditions
/// (missing task, completed task) are `Outcome`s, not errors.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// An upstream directory call failed transiently.
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    /// Delivery was attempted for at least one recipient and every attempt
    /// failed at the transport.
    #[error("no email delivered ({attempted} attempted)")]
    NothingDelivered { attempted: usize },

    /// The dedup ledger failed (excluding duplicates, which are swallowed).
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Why an operation was acknowledged without sending anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The task no longer exists upstream.
    TaskNotFound,
    /// The target user no longer exists upstream.
    UserNotFound,
    /// The user exists but has no email address on file.
    NoEmailAddress,
    /// The task reached Completed before the notification went out.
    TaskCompleted,
}

/// Result of a notification operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// At least one recipient was attempted; `sent` emails went out and
    /// `skipped` recipients were passed over (no address, lookup failure).
    Delivered { sent: usize, skipped: usize },
    /// The ledger already holds a record for this event.
    AlreadyHandled,
    /// Nothing to do; the reason says why.
    Skipped(SkipReason),
}

/// Orchestrates one notification end to end.
pub struct Notifier {
    tasks: Arc<dyn TaskDirectory>,
    users: Arc<dyn UserDirectory>,
    ledger: Arc<dyn Ledger>,
    gateway: Arc<dyn EmailGateway>,
    reference_tz: Tz,
}

impl Notifier {
    pub fn new(
        tasks: Arc<dyn TaskDirectory>,
        users: Arc<dyn UserDirectory>,
        ledger: Arc<dyn Ledger>,
        gateway: Arc<dyn EmailGateway>,
        reference_tz: Tz,
    ) -> Self {
        Self {
            tasks,
            users,
            ledger,
            gateway,
            reference_tz,
        }
    }

    /// Notifies the owner and collaborators that a task changed status.
    pub async fn send_status_update(
        &self,
        task_id: i64,
        old_status: &str,
        new_status: &str,
        changed_by_id: i64,
    ) -> Result<Outcome, NotifyError> {
        let task = match self.fetch_task(task_id).await? {
            Some(task) => task,
            None => return Ok(Outcome::Skipped(SkipReason::TaskNotFound)),
        };

        let changed_by = self.display_name(changed_by_id).await;
        let recipients = self.resolve_recipients(&task).await?;

        let email = render::status_update(
            &task.title,
            old_status,
            new_status,
            &changed_by,
            &task.display_deadline(self.reference_tz),
            task.display_description(),
            task.is_subtask(),
        );

        let outcome = self.deliver(&recipients, &email).await?;
        if let Outcome::Delivered { sent, .. } = outcome {
            if sent > 0 {
                info!(
                    task_id,
                    old_status, new_status, sent, "status update notification delivered"
                );
            }
        }
        Ok(outcome)
    }

    /// Emails one user that they were @-mentioned in a comment.
    ///
    /// At most one email per (comment, user), enforced by the ledger check
    /// up front and the unique constraint behind `record_mention`.
    pub async fn send_mention_alert(
        &self,
        task_id: i64,
        comment_id: i64,
        mentioned_user_id: i64,
        author_id: i64,
        comment_body: &str,
        meta: &CommentMeta,
    ) -> Result<Outcome, NotifyError> {
        if self.ledger.mention_sent(comment_id, mentioned_user_id).await? {
            debug!(comment_id, mentioned_user_id, "mention already notified");
            return Ok(Outcome::AlreadyHandled);
        }

        let task = match self.fetch_task(task_id).await? {
            Some(task) => task,
            None => return Ok(Outcome::Skipped(SkipReason::TaskNotFound)),
        };

        let mentioned = match self.users.fetch_user(mentioned_user_id).await {
            Ok(user) => user,
            Err(e) if e.is_retryable() => return Err(NotifyError::Unavailable(e.to_string())),
            Err(e) => {
                warn!(mentioned_user_id, error = %e, "mentioned user lookup failed, dropping");
                return Ok(Outcome::Skipped(SkipReason::UserNotFound));
            }
        };

        let to = match mentioned.email.as_deref() {
            Some(address) if !address.is_empty() => address.to_string(),
            _ => {
                warn!(mentioned_user_id, "mentioned user has no email address");
                return Ok(Outcome::Skipped(SkipReason::NoEmailAddress));
            }
        };

        let author_name = self.display_name(author_id).await;
        let email = render::mention_alert(&task.title, &author_name, comment_body, meta);

        if let Err(e) = self.gateway.send(&to, &email.subject, &email.html).await {
            warn!(comment_id, mentioned_user_id, error = %e, "mention email failed");
            return Err(NotifyError::NothingDelivered { attempted: 1 });
        }

        self.record(
            self.ledger
                .record_mention(task_id, comment_id, mentioned_user_id, author_id)
                .await,
        );
        info!(task_id, comment_id, mentioned_user_id, "mention notification delivered");
        Ok(Outcome::Delivered { sent: 1, skipped: 0 })
    }

    /// Sends the days-before reminder for a task deadline.
    ///
    /// The task is re-fetched so a deletion or completion between the sweep
    /// scan and this call suppresses the email.
    pub async fn send_deadline_reminder(
        &self,
        task_id: i64,
        days_before: u32,
    ) -> Result<Outcome, NotifyError> {
        if self.ledger.reminder_sent(task_id, days_before as i32).await? {
            debug!(task_id, days_before, "reminder already sent");
            return Ok(Outcome::AlreadyHandled);
        }

        let task = match self.fetch_task(task_id).await? {
            Some(task) => task,
            None => return Ok(Outcome::Skipped(SkipReason::TaskNotFound)),
        };
        if task.is_completed() {
            debug!(task_id, "task completed, suppressing reminder");
            return Ok(Outcome::Skipped(SkipReason::TaskCompleted));
        }

        let recipients = self.resolve_recipients(&task).await?;
        let email = render::deadline_reminder(
            &task.title,
            days_before,
            &task.display_deadline(self.reference_tz),
            task.display_description(),
            &task.status,
            task.is_subtask(),
        );

        let outcome = self.deliver(&recipients, &email).await?;
        if let Outcome::Delivered { sent, .. } = outcome {
            if sent > 0 {
                self.record(self.ledger.record_reminder(task_id, days_before as i32).await);
                info!(task_id, days_before, sent, "deadline reminder delivered");
            }
        }
        Ok(outcome)
    }

    /// Sends the daily overdue alert for a task.
    pub async fn send_overdue_alert(
        &self,
        task: &Task,
        days_overdue: i64,
        alert_date: NaiveDate,
    ) -> Result<Outcome, NotifyError> {
        if self.ledger.overdue_alert_sent(task.id, alert_date).await? {
            debug!(task_id = task.id, %alert_date, "overdue alert already sent today");
            return Ok(Outcome::AlreadyHandled);
        }
        if task.is_completed() {
            return Ok(Outcome::Skipped(SkipReason::TaskCompleted));
        }

        let recipients = self.resolve_recipients(task).await?;
        let email = render::overdue_alert(
            &task.title,
            days_overdue,
            &task.display_deadline(self.reference_tz),
            task.display_description(),
            &task.status,
            task.is_subtask(),
        );

        let outcome = self.deliver(&recipients, &email).await?;
        if let Outcome::Delivered { sent, .. } = outcome {
            if sent > 0 {
                self.record(
                    self.ledger
                        .record_overdue_alert(task.id, alert_date, days_overdue)
                        .await,
                );
                info!(task_id = task.id, days_overdue, sent, "overdue alert delivered");
            }
        }
        Ok(outcome)
    }

    /// Fetches a task, mapping terminal lookup failures to `None`.
    async fn fetch_task(&self, task_id: i64) -> Result<Option<Task>, NotifyError> {
        match self.tasks.fetch_task(task_id).await {
            Ok(task) => Ok(Some(task)),
            Err(e) if e.is_retryable() => Err(NotifyError::Unavailable(e.to_string())),
            Err(e) => {
                warn!(task_id, error = %e, "task lookup failed, dropping event");
                Ok(None)
            }
        }
    }

    /// Owner plus collaborators, deduplicated and in stable order.
    ///
    /// A collaborator lookup failure degrades to owner-only delivery rather
    /// than aborting the whole notification.
    async fn resolve_recipients(&self, task: &Task) -> Result<BTreeSet<i64>, NotifyError> {
        let mut recipients = BTreeSet::new();
        recipients.insert(task.owner_id);

        match self.tasks.fetch_collaborators(task.id).await {
            Ok(ids) => recipients.extend(ids),
            Err(e) => {
                warn!(task_id = task.id, error = %e, "collaborator lookup failed, owner only");
            }
        }

        Ok(recipients)
    }

    /// Resolves a user id to a display name, falling back when the lookup
    /// fails for any reason.
    async fn display_name(&self, user_id: i64) -> String {
        match self.users.fetch_user(user_id).await {
            Ok(user) => user.name,
            Err(e) => {
                debug!(user_id, error = %e, "author lookup failed, using fallback name");
                FALLBACK_DISPLAY_NAME.to_string()
            }
        }
    }

    /// Sends one rendered email to each recipient.
    ///
    /// Recipients without a usable address are skipped. If sends were
    /// attempted and every one failed, the operation errors so the caller
    /// can retry; partial success counts as success.
    async fn deliver(
        &self,
        recipients: &BTreeSet<i64>,
        email: &EmailContent,
    ) -> Result<Outcome, NotifyError> {
        let mut sent = 0usize;
        let mut skipped = 0usize;
        let mut attempted = 0usize;

        for &user_id in recipients {
            let user = match self.users.fetch_user(user_id).await {
                Ok(user) => user,
                Err(e) => {
                    warn!(user_id, error = %e, "recipient lookup failed, skipping");
                    skipped += 1;
                    continue;
                }
            };

            let address = match user.email.as_deref() {
                Some(a) if !a.is_empty() => a,
                _ => {
                    debug!(user_id, "recipient has no email address, skipping");
                    skipped += 1;
                    continue;
                }
            };

            attempted += 1;
            match self.gateway.send(address, &email.subject, &email.html).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    warn!(user_id, error = %e, "email send failed");
                }
            }
        }

        if sent == 0 && attempted > 0 {
            return Err(NotifyError::NothingDelivered { attempted });
        }
        Ok(Outcome::Delivered { sent, skipped })
    }

    /// Finalizes a ledger write. A duplicate means another worker recorded
    /// first; the email is already out either way, so it is only logged.
    fn record(&self, result: Result<(), LedgerError>) {
        match result {
            Ok(()) => {}
            Err(e) if e.is_duplicate() => {
                debug!(error = %e, "ledger record raced with a concurrent worker");
            }
            Err(e) => {
                warn!(error = %e, "failed to record delivered notification");
            }
        }
    }
}

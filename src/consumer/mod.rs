//! Event consumption from the broker queues.
//!
//! Two queues feed the service: task status changes and @-mention alerts.
//! Each message is handled exactly once per delivery: success acknowledges,
//! a transient failure requeues for redelivery, and a malformed payload is
//! discarded so it cannot poison the queue.

mod queue;

pub use queue::{EventQueue, QueueError};

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::notify::Notifier;
use crate::render::CommentMeta;

/// Queue carrying task and subtask status changes.
pub const STATUS_UPDATE_QUEUE: &str = "task_status_updates";

/// Queue carrying @-mention events from the comment service.
pub const MENTION_ALERT_QUEUE: &str = "mention_alerts";

/// A status change published by the task service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeEvent {
    pub task_id: i64,
    pub old_status: String,
    pub new_status: String,
    pub changed_by_id: i64,
}

/// An @-mention published by the comment service.
///
/// The presentation fields (timestamp, initials) are optional; rendering
/// falls back when they are absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionEvent {
    pub task_id: i64,
    pub comment_id: i64,
    pub mentioned_user_id: i64,
    pub author_id: i64,
    pub comment_body: String,
    #[serde(flatten)]
    pub meta: CommentMeta,
}

/// What to do with a message after a handling attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageDisposition {
    /// Handled (delivered, deduplicated, or terminally skipped). Remove it.
    Ack,
    /// Transient failure. Return it to the queue for another attempt.
    Requeue,
    /// The payload can never be processed. Drop it, keeping the reason.
    Discard(String),
}

/// Errors from the consumer lifecycle.
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("consumer is already running")]
    AlreadyRunning,

    #[error("consumer is not running")]
    NotRunning,
}

/// Handles one status-change payload and decides its fate.
pub async fn dispatch_status_event(notifier: &Notifier, payload: &str) -> MessageDisposition {
    let event: StatusChangeEvent = match serde_json::from_str(payload) {
        Ok(event) => event,
        Err(e) => {
            return MessageDisposition::Discard(format!("malformed status event: {}", e));
        }
    };

    match notifier
        .send_status_update(
            event.task_id,
            &event.old_status,
            &event.new_status,
            event.changed_by_id,
        )
        .await
    {
        Ok(outcome) => {
            debug!(task_id = event.task_id, ?outcome, "status event handled");
            MessageDisposition::Ack
        }
        Err(e) => {
            warn!(task_id = event.task_id, error = %e, "status event failed, requeueing");
            MessageDisposition::Requeue
        }
    }
}

/// Handles one mention payload and decides its fate.
pub async fn dispatch_mention_event(notifier: &Notifier, payload: &str) -> MessageDisposition {
    let event: MentionEvent = match serde_json::from_str(payload) {
        Ok(event) => event,
        Err(e) => {
            return MessageDisposition::Discard(format!("malformed mention event: {}", e));
        }
    };

    match notifier
        .send_mention_alert(
            event.task_id,
            event.comment_id,
            event.mentioned_user_id,
            event.author_id,
            &event.comment_body,
            &event.meta,
        )
        .await
    {
        Ok(outcome) => {
            debug!(comment_id = event.comment_id, ?outcome, "mention event handled");
            MessageDisposition::Ack
        }
        Err(e) => {
            warn!(comment_id = event.comment_id, error = %e, "mention event failed, requeueing");
            MessageDisposition::Requeue
        }
    }
}

/// Which dispatch function a consumer loop runs.
#[derive(Debug, Clone, Copy)]
enum QueueKind {
    StatusUpdates,
    MentionAlerts,
}

/// Consumes both event queues until stopped.
pub struct EventConsumer {
    notifier: Arc<Notifier>,
    status_queue: EventQueue,
    mention_queue: EventQueue,
    poll_interval: Duration,
    shutdown_tx: Option<broadcast::Sender<()>>,
    handles: Vec<JoinHandle<()>>,
}

impl EventConsumer {
    pub fn new(
        notifier: Arc<Notifier>,
        status_queue: EventQueue,
        mention_queue: EventQueue,
        poll_interval: Duration,
    ) -> Self {
        Self {
            notifier,
            status_queue,
            mention_queue,
            poll_interval,
            shutdown_tx: None,
            handles: Vec::new(),
        }
    }

    /// Recovers stranded in-flight messages, then spawns one consumer loop
    /// per queue.
    pub async fn start(&mut self) -> Result<(), ConsumerError> {
        if self.shutdown_tx.is_some() {
            return Err(ConsumerError::AlreadyRunning);
        }

        self.status_queue.recover_processing().await?;
        self.mention_queue.recover_processing().await?;

        let (shutdown_tx, _) = broadcast::channel(1);

        for (queue, kind) in [
            (self.status_queue.clone(), QueueKind::StatusUpdates),
            (self.mention_queue.clone(), QueueKind::MentionAlerts),
        ] {
            let notifier = Arc::clone(&self.notifier);
            let shutdown_rx = shutdown_tx.subscribe();
            let poll_interval = self.poll_interval;

            self.handles.push(tokio::spawn(async move {
                consume_loop(queue, kind, notifier, poll_interval, shutdown_rx).await;
            }));
        }

        self.shutdown_tx = Some(shutdown_tx);
        info!("event consumer started");
        Ok(())
    }

    /// Signals shutdown and waits for in-flight messages to finish.
    pub async fn stop(&mut self) -> Result<(), ConsumerError> {
        let shutdown_tx = self.shutdown_tx.take().ok_or(ConsumerError::NotRunning)?;
        let _ = shutdown_tx.send(());

        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                error!(error = %e, "consumer loop panicked");
            }
        }

        info!("event consumer stopped");
        Ok(())
    }
}

async fn consume_loop(
    queue: EventQueue,
    kind: QueueKind,
    notifier: Arc<Notifier>,
    poll_interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    info!(queue = %queue.name(), "consumer loop running");

    loop {
        match shutdown_rx.try_recv() {
            Ok(_) | Err(broadcast::error::TryRecvError::Closed) => break,
            Err(_) => {}
        }

        let payload = match queue.dequeue(poll_interval).await {
            Ok(Some(payload)) => payload,
            Ok(None) => continue,
            Err(e) => {
                warn!(queue = %queue.name(), error = %e, "dequeue failed");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        let disposition = match kind {
            QueueKind::StatusUpdates => dispatch_status_event(&notifier, &payload).await,
            QueueKind::MentionAlerts => dispatch_mention_event(&notifier, &payload).await,
        };

        let settled = match &disposition {
            MessageDisposition::Ack => queue.ack(&payload).await,
            MessageDisposition::Requeue => queue.nack_requeue(&payload).await,
            MessageDisposition::Discard(reason) => queue.nack_discard(&payload, reason).await,
        };
        if let Err(e) = settled {
            // The message stays in the processing list and is recovered on
            // the next startup.
            error!(queue = %queue.name(), error = %e, "failed to settle message");
        }
    }

    info!(queue = %queue.name(), "consumer loop exited");
}

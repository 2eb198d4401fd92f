//! Redis-backed event queue.
//!
//! Uses the reliable-queue pattern: BRPOPLPUSH moves a message into a
//! per-queue processing list, and the message is only removed once the
//! consumer acknowledges it. A crash mid-processing leaves the message in
//! the processing list, where `recover_processing` returns it to the main
//! queue on the next startup.

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from the event queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The broker could not be reached within the configured attempts.
    #[error("queue connection failed: {0}")]
    ConnectionFailed(String),

    /// Any other Redis failure.
    #[error("redis operation failed: {0}")]
    Redis(#[from] redis::RedisError),
}

/// One named event queue with its processing and discard lists.
#[derive(Clone)]
pub struct EventQueue {
    redis: ConnectionManager,
    queue_name: String,
    processing_queue: String,
    discarded_queue: String,
}

impl EventQueue {
    /// Connects to the broker with bounded retries.
    ///
    /// Matches the deployment expectation that the broker may come up after
    /// this service does: each failed attempt waits `retry_delay` before the
    /// next, up to `attempts` total.
    pub async fn connect(
        redis_url: &str,
        queue_name: impl Into<String>,
        attempts: u32,
        retry_delay: Duration,
    ) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| QueueError::ConnectionFailed(e.to_string()))?;

        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match ConnectionManager::new(client.clone()).await {
                Ok(manager) => {
                    info!(attempt, "connected to event broker");
                    return Ok(Self::from_connection(manager, queue_name));
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "broker connection attempt failed");
                    last_error = e.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(retry_delay).await;
                    }
                }
            }
        }

        Err(QueueError::ConnectionFailed(format!(
            "gave up after {} attempts: {}",
            attempts, last_error
        )))
    }

    /// Creates a queue handle over an existing connection.
    pub fn from_connection(redis: ConnectionManager, queue_name: impl Into<String>) -> Self {
        let queue_name = queue_name.into();
        let processing_queue = format!("{}:processing", queue_name);
        let discarded_queue = format!("{}:discarded", queue_name);

        Self {
            redis,
            queue_name,
            processing_queue,
            discarded_queue,
        }
    }

    /// Returns the queue name.
    pub fn name(&self) -> &str {
        &self.queue_name
    }

    /// Returns a clone of the underlying connection, for sharing across
    /// queue handles.
    pub fn connection(&self) -> ConnectionManager {
        self.redis.clone()
    }

    /// Pushes a raw payload onto the queue.
    pub async fn publish(&self, payload: &str) -> Result<(), QueueError> {
        let mut conn = self.redis.clone();
        conn.lpush::<_, _, ()>(&self.queue_name, payload).await?;
        Ok(())
    }

    /// Blocks up to `timeout` for the next message, moving it into the
    /// processing list. Returns `None` on timeout.
    ///
    /// The raw payload is returned unparsed so the caller decides whether a
    /// malformed message is requeued or discarded.
    pub async fn dequeue(&self, timeout: Duration) -> Result<Option<String>, QueueError> {
        let mut conn = self.redis.clone();
        let timeout_secs = timeout.as_secs().max(1) as usize;

        // BRPOPLPUSH atomically pops from source and pushes to destination
        let payload: Option<String> = redis::cmd("BRPOPLPUSH")
            .arg(&self.queue_name)
            .arg(&self.processing_queue)
            .arg(timeout_secs)
            .query_async(&mut conn)
            .await?;
        Ok(payload)
    }

    /// Acknowledges a processed message, removing it from the processing list.
    pub async fn ack(&self, payload: &str) -> Result<(), QueueError> {
        let mut conn = self.redis.clone();
        conn.lrem::<_, _, ()>(&self.processing_queue, 1, payload)
            .await?;
        Ok(())
    }

    /// Returns a message to the main queue for another delivery attempt.
    pub async fn nack_requeue(&self, payload: &str) -> Result<(), QueueError> {
        let mut conn = self.redis.clone();
        conn.lrem::<_, _, ()>(&self.processing_queue, 1, payload)
            .await?;
        conn.rpush::<_, _, ()>(&self.queue_name, payload).await?;
        Ok(())
    }

    /// Drops a message permanently, keeping an annotated copy for audit.
    pub async fn nack_discard(&self, payload: &str, reason: &str) -> Result<(), QueueError> {
        let mut conn = self.redis.clone();
        conn.lrem::<_, _, ()>(&self.processing_queue, 1, payload)
            .await?;

        let record = json!({
            "payload": payload,
            "reason": reason,
            "discarded_at": chrono::Utc::now().to_rfc3339(),
        });
        conn.lpush::<_, _, ()>(&self.discarded_queue, record.to_string())
            .await?;

        warn!(queue = %self.queue_name, reason, "message discarded");
        Ok(())
    }

    /// Moves any messages stranded in the processing list back to the main
    /// queue. Called once at startup, before consuming begins.
    pub async fn recover_processing(&self) -> Result<u64, QueueError> {
        let mut conn = self.redis.clone();
        let mut recovered = 0u64;

        loop {
            let moved: Option<String> = redis::cmd("RPOPLPUSH")
                .arg(&self.processing_queue)
                .arg(&self.queue_name)
                .query_async(&mut conn)
                .await?;
            if moved.is_none() {
                break;
            }
            recovered += 1;
        }

        if recovered > 0 {
            info!(queue = %self.queue_name, recovered, "recovered in-flight messages");
        } else {
            debug!(queue = %self.queue_name, "no in-flight messages to recover");
        }
        Ok(recovered)
    }

    /// Number of messages waiting in the main queue.
    pub async fn len(&self) -> Result<u64, QueueError> {
        let mut conn = self.redis.clone();
        Ok(conn.llen(&self.queue_name).await?)
    }

    /// Number of messages currently being processed.
    pub async fn processing_len(&self) -> Result<u64, QueueError> {
        let mut conn = self.redis.clone();
        Ok(conn.llen(&self.processing_queue).await?)
    }

    /// Number of discarded messages retained for audit.
    pub async fn discarded_len(&self) -> Result<u64, QueueError> {
        let mut conn = self.redis.clone();
        Ok(conn.llen(&self.discarded_queue).await?)
    }
}

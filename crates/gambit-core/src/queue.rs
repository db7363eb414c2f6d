//! Work queue seam.
//!
//! The pipeline talks to its queues through [`TaskQueue`], a blocking-pop /
//! push pair over named lists of JSON strings. [`ValkeyPool`] is the
//! production backend; [`MemoryQueue`](crate::memory::MemoryQueue) backs
//! the tests.
//!
//! A queue handle that is parked in [`TaskQueue::pop`] cannot push on the
//! same connection, so every consumer holds a second handle for pushing.

use std::future::Future;

use gambit_db::{DbError, ValkeyPool};
use serde::Serialize;

/// Queue drained by workers.
pub const TASKS_QUEUE: &str = "tasks";

/// Queue drained by the response processor.
pub const RESPONSES_QUEUE: &str = "responses";

/// Errors raised by queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The queue backend failed.
    #[error("queue backend error: {0}")]
    Backend(#[from] DbError),

    /// A message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    /// The queue was closed while waiting.
    #[error("queue closed")]
    Closed,
}

/// A set of named FIFO queues carrying JSON strings.
pub trait TaskQueue: Send + Sync {
    /// Append a message to the tail of `queue`.
    fn push(&self, queue: &str, payload: &str) -> impl Future<Output = Result<(), QueueError>> + Send;

    /// Wait until `queue` is non-empty, then remove and return its head.
    fn pop(&self, queue: &str) -> impl Future<Output = Result<String, QueueError>> + Send;
}

/// Serialize `value` as JSON and push it onto `queue`.
///
/// # Errors
///
/// Returns [`QueueError::Encode`] if serialization fails, or the backend's
/// error if the push fails.
pub async fn push_json<Q, T>(queue: &Q, name: &str, value: &T) -> Result<(), QueueError>
where
    Q: TaskQueue,
    T: Serialize + Sync,
{
    let json = serde_json::to_string(value)?;
    queue.push(name, &json).await?;
    tracing::debug!(queue = name, bytes = json.len(), "queue <<");
    Ok(())
}

impl TaskQueue for ValkeyPool {
    async fn push(&self, queue: &str, payload: &str) -> Result<(), QueueError> {
        self.push_raw(queue, payload).await?;
        Ok(())
    }

    async fn pop(&self, queue: &str) -> Result<String, QueueError> {
        Ok(self.pop_raw(queue).await?)
    }
}

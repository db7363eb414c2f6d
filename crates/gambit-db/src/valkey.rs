//! `Valkey` (Redis-compatible) work queue operations.
//!
//! Two lists carry every message in the pipeline. Producers append with
//! `RPUSH` and consumers block on `BLPOP`, so each list is consumed in FIFO
//! order and every message is delivered to exactly one consumer.
//!
//! # Key Patterns
//!
//! | Key | Type | Description |
//! |-----|------|-------------|
//! | `tasks` | List | JSON task envelopes, drained by workers |
//! | `responses` | List | JSON response envelopes, drained by the processor |
//!
//! A blocking pop parks the connection it runs on. Processes that both pop
//! and push open two pools so pushes never queue behind a parked `BLPOP`.

use fred::prelude::*;

use crate::error::DbError;

/// Connection handle to a `Valkey` (Redis-compatible) instance.
///
/// Wraps a [`fred::prelude::Client`]. Messages are opaque strings here;
/// encoding belongs to the queue seam above.
#[derive(Clone)]
pub struct ValkeyPool {
    client: Client,
}

impl ValkeyPool {
    /// Connect to `Valkey` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Valkey`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid Valkey URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Valkey");
        Ok(Self { client })
    }

    /// Append a message to the tail of `queue`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Valkey`] if the write fails.
    pub async fn push_raw(&self, queue: &str, payload: &str) -> Result<(), DbError> {
        let _: u64 = self.client.rpush(queue, payload).await?;
        Ok(())
    }

    /// Block until a message is available at the head of `queue`, then
    /// remove and return it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Valkey`] if the connection fails while waiting.
    pub async fn pop_raw(&self, queue: &str) -> Result<String, DbError> {
        loop {
            // A zero timeout blocks indefinitely. A nil reply only happens
            // when the server aborts the wait, in which case we wait again.
            let popped: Option<(String, String)> = self.client.blpop(queue, 0.0).await?;
            if let Some((_, payload)) = popped {
                return Ok(payload);
            }
            tracing::debug!(queue, "BLPOP returned nil, waiting again");
        }
    }
}

//! Queue publisher.
//!
//! Builds task envelopes and pushes them onto the tasks queue. Used by the
//! API tier (game intake, line requests) and by the response processor
//! (chaining scoring after position expansion).

use gambit_types::{FenPayload, FensPayload, GameId, GameState, MovesPayload, PlyState, Task};

use crate::queue::{QueueError, TASKS_QUEUE, TaskQueue, push_json};
use crate::store::{AnalysisStore, StoreError};

/// Outcome of a line-exploration request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRequest {
    /// This request claimed the ply and published the task.
    Published,
    /// Lines were already requested for this ply; nothing was published.
    AlreadyRequested,
}

/// Errors raised by a line-exploration request.
#[derive(Debug, thiserror::Error)]
pub enum LineRequestError {
    /// The ply has no stored FEN yet.
    #[error("no position stored for game {game_id} ply {ply}")]
    NoPosition {
        /// The game.
        game_id: GameId,
        /// The ply.
        ply: u32,
    },

    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Publishing the task failed. The claim has been released.
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Pushes task envelopes onto the tasks queue.
#[derive(Debug, Clone)]
pub struct Publisher<Q> {
    queue: Q,
    tasks_queue: String,
}

impl<Q: TaskQueue> Publisher<Q> {
    /// Publish onto the default tasks queue.
    pub fn new(queue: Q) -> Self {
        Self {
            queue,
            tasks_queue: TASKS_QUEUE.to_owned(),
        }
    }

    /// Publish onto a differently named tasks queue.
    #[must_use]
    pub fn with_tasks_queue(mut self, name: impl Into<String>) -> Self {
        self.tasks_queue = name.into();
        self
    }

    /// Name of the queue tasks are pushed onto.
    pub fn tasks_queue(&self) -> &str {
        &self.tasks_queue
    }

    /// Push an arbitrary task envelope.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError`] if encoding or the push fails.
    pub async fn publish(&self, task: &Task) -> Result<(), QueueError> {
        push_json(&self.queue, &self.tasks_queue, task).await?;
        tracing::info!(
            kind = %task.kind(),
            game_id = %task.game_id(),
            "Published task"
        );
        Ok(())
    }

    /// Ask a worker to replay `moves` and report every intermediate FEN.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError`] if encoding or the push fails.
    pub async fn publish_position_expansion(
        &self,
        game_id: GameId,
        moves: Vec<String>,
    ) -> Result<(), QueueError> {
        self.publish(&Task::PositionExpansion {
            state: GameState { game_id },
            payload: MovesPayload { moves },
        })
        .await
    }

    /// Ask a worker to score every FEN of a game.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError`] if encoding or the push fails.
    pub async fn publish_scoring(&self, game_id: GameId, fens: Vec<String>) -> Result<(), QueueError> {
        self.publish(&Task::Scoring {
            state: GameState { game_id },
            payload: FensPayload { fens },
        })
        .await
    }

    /// Ask a worker to explore the best lines from one position.
    ///
    /// Publishes unconditionally; use
    /// [`request_line_exploration`](Self::request_line_exploration) for the
    /// at-most-once variant.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError`] if encoding or the push fails.
    pub async fn publish_line_exploration(
        &self,
        game_id: GameId,
        ply: u32,
        fen: String,
    ) -> Result<(), QueueError> {
        self.publish(&Task::LineExploration {
            state: PlyState { game_id, ply },
            payload: FenPayload { fen },
        })
        .await
    }

    /// Publish a line-exploration task for `(game_id, ply)` at most once.
    ///
    /// The lines-generated flag is claimed atomically before publishing,
    /// so concurrent or repeated requests collapse into one task. If the
    /// publish fails the claim is released and the error returned.
    ///
    /// # Errors
    ///
    /// Returns [`LineRequestError::NoPosition`] if the ply has not been
    /// expanded yet, or the underlying store or queue error.
    pub async fn request_line_exploration<S: AnalysisStore>(
        &self,
        store: &S,
        game_id: GameId,
        ply: u32,
    ) -> Result<LineRequest, LineRequestError> {
        let Some(fen) = store.position_fen(game_id, ply).await? else {
            return Err(LineRequestError::NoPosition { game_id, ply });
        };

        if !store.mark_lines_generated(game_id, ply).await? {
            tracing::debug!(game_id = %game_id, ply, "Lines already requested");
            return Ok(LineRequest::AlreadyRequested);
        }

        if let Err(e) = self.publish_line_exploration(game_id, ply, fen).await {
            tracing::error!(game_id = %game_id, ply, error = %e, "Line task publish failed, releasing claim");
            if let Err(release) = store.release_lines(game_id, ply).await {
                tracing::error!(game_id = %game_id, ply, error = %release, "Failed to release lines claim");
            }
            return Err(e.into());
        }

        Ok(LineRequest::Published)
    }
}

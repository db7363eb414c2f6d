//! Response processor.
//!
//! Drains the responses queue, persists each result and triggers whatever
//! follows it:
//!
//! - position expansion: store the FENs, then publish a scoring task for
//!   the same FENs (the only automatic stage transition);
//! - scoring: re-sign each score by ply parity and store it;
//! - line exploration: rebuild the line around its stored starting
//!   position, convert moves to standard notation, store the line and
//!   fan it out to live subscribers.
//!
//! A response that cannot be processed is logged and dropped. Only queue
//! failures and undecodable envelopes stop the loop.

use gambit_types::{
    AnalysisResponse, ExploredLine, GameId, LINES_PER_PLY, PlyState, Score, StoredLine,
    StoredLinePosition,
};

use crate::broker::{LineBroker, line_topic};
use crate::notation::{self, NotationError};
use crate::publisher::Publisher;
use crate::queue::{QueueError, RESPONSES_QUEUE, TaskQueue};
use crate::store::{AnalysisStore, StoreError};

/// Errors raised while processing responses.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The queue failed.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// A popped message is not a valid response envelope.
    #[error("malformed response envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A line move could not be converted to standard notation.
    #[error("notation error: {0}")]
    Notation(#[from] NotationError),

    /// A line carries a rank outside `1..=3`.
    #[error("line rank {rank} out of range")]
    InvalidRank {
        /// The offending rank.
        rank: u8,
    },

    /// A line arrived for a ply with no stored FEN or score.
    #[error("no stored position for game {game_id} ply {ply}")]
    MissingPosition {
        /// The game.
        game_id: GameId,
        /// The ply.
        ply: u32,
    },
}

/// Consumes the responses queue.
pub struct ResponseProcessor<S, Q> {
    store: S,
    consumer: Q,
    publisher: Publisher<Q>,
    broker: LineBroker,
    responses_queue: String,
}

impl<S: AnalysisStore, Q: TaskQueue> ResponseProcessor<S, Q> {
    /// Create a processor.
    ///
    /// `consumer` is only used to block on the responses queue; follow-on
    /// tasks go through `publisher`.
    pub fn new(store: S, consumer: Q, publisher: Publisher<Q>, broker: LineBroker) -> Self {
        Self {
            store,
            consumer,
            publisher,
            broker,
            responses_queue: RESPONSES_QUEUE.to_owned(),
        }
    }

    /// Consume a differently named responses queue.
    #[must_use]
    pub fn with_responses_queue(mut self, name: impl Into<String>) -> Self {
        self.responses_queue = name.into();
        self
    }

    /// Run until the queue fails or delivers an undecodable message.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Queue`] if popping or a follow-on publish
    /// fails, or [`ProcessError::Malformed`]; every other error is logged
    /// and the offending response dropped.
    pub async fn run(&self) -> Result<(), ProcessError> {
        tracing::info!(queue = %self.responses_queue, "Response processor started");
        loop {
            let raw = self.consumer.pop(&self.responses_queue).await?;
            let response: AnalysisResponse = match serde_json::from_str(&raw) {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(error = %e, "Malformed response envelope, stopping");
                    return Err(e.into());
                }
            };

            let kind = response.kind();
            let game_id = response.game_id();
            tracing::debug!(kind = %kind, game_id = %game_id, "queue >>");

            match self.handle(response).await {
                Ok(()) => {}
                // The response is consumed, so a lost follow-on task cannot be
                // retried from here. Stop and leave it to the supervisor.
                Err(ProcessError::Queue(e)) => {
                    tracing::error!(
                        kind = %kind,
                        game_id = %game_id,
                        error = %e,
                        "Follow-on publish failed, stopping"
                    );
                    return Err(ProcessError::Queue(e));
                }
                Err(e) => {
                    tracing::error!(
                        kind = %kind,
                        game_id = %game_id,
                        error = %e,
                        "Dropping response"
                    );
                }
            }
        }
    }

    /// Process a single response.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] if persisting or chaining fails.
    pub async fn handle(&self, response: AnalysisResponse) -> Result<(), ProcessError> {
        match response {
            AnalysisResponse::PositionExpansion { state, payload } => {
                self.store
                    .create_positions(state.game_id, &payload.fens)
                    .await?;
                tracing::info!(
                    game_id = %state.game_id,
                    positions = payload.fens.len(),
                    "Positions stored"
                );
                self.publisher
                    .publish_scoring(state.game_id, payload.fens)
                    .await?;
            }
            AnalysisResponse::Scoring { state, payload } => {
                let scores: Vec<Score> = (0_u32..)
                    .zip(&payload.scores)
                    .map(|(ply, score)| score.resigned(ply))
                    .collect();
                self.store.create_scores(state.game_id, &scores).await?;
                tracing::info!(
                    game_id = %state.game_id,
                    scores = scores.len(),
                    "Scores stored"
                );
            }
            AnalysisResponse::LineExploration { state, payload } => {
                let line = self.build_line(state, payload.line).await?;
                let rank = line.rank;
                if self.store.create_line(&line).await? {
                    let delivered = self
                        .broker
                        .publish(&line_topic(state.game_id, state.ply), &line);
                    tracing::info!(
                        game_id = %state.game_id,
                        ply = state.ply,
                        rank,
                        delivered,
                        "Line stored"
                    );
                }
            }
        }
        Ok(())
    }

    /// Rebuild a worker line into its stored form.
    ///
    /// Position 0 is the game position the line branches from, taken from
    /// storage. Every later position is re-signed by the parity of its
    /// absolute ply, and the line's own score by the parity of the game ply.
    async fn build_line(&self, state: PlyState, line: ExploredLine) -> Result<StoredLine, ProcessError> {
        let PlyState { game_id, ply } = state;
        if !(1..=LINES_PER_PLY).contains(&line.rank) {
            return Err(ProcessError::InvalidRank { rank: line.rank });
        }
        let missing = || ProcessError::MissingPosition { game_id, ply };

        let fen = self.store.position_fen(game_id, ply).await?.ok_or_else(missing)?;
        let score = self.store.position_score(game_id, ply).await?.ok_or_else(missing)?;

        let lans: Vec<&str> = line.positions.iter().map(|p| p.lan.as_str()).collect();
        let sans = notation::lan_to_san(&fen, &lans)?;

        let mut positions = Vec::with_capacity(line.positions.len().saturating_add(1));
        positions.push(StoredLinePosition {
            line_ply: 0,
            san: None,
            lan: None,
            fen,
            score_unit: Some(score.unit),
            score_value: Some(score.value),
        });
        for ((line_ply, position), san) in (1_u32..).zip(line.positions).zip(sans) {
            let score = position.score.resigned(ply.saturating_add(line_ply));
            positions.push(StoredLinePosition {
                line_ply,
                san: Some(san),
                lan: Some(position.lan),
                fen: position.fen,
                score_unit: Some(score.unit),
                score_value: Some(score.value),
            });
        }

        let line_score = line.score.resigned(ply);
        Ok(StoredLine {
            game_id,
            ply,
            rank: line.rank,
            score_unit: Some(line_score.unit),
            score_value: Some(line_score.value),
            positions,
        })
    }
}

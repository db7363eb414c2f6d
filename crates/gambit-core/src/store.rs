//! Persistence seams.
//!
//! [`AnalysisStore`] is the narrow contract the response processor and the
//! line-exploration request need. [`GameRepository`] is the intake and
//! read side used by the API tier. [`PgStore`] implements both on top of
//! the `gambit-db` stores; [`MemoryStore`](crate::memory::MemoryStore)
//! implements both in memory.
//!
//! Methods return `impl Future + Send` so the processor can be handed to
//! `tokio::spawn`.

use std::future::Future;

use gambit_db::{DbError, GameStore, LineStore, NewGame, PositionStore, PostgresPool};
use gambit_types::{GameId, Position, Score, StoredLine};

/// Errors raised by store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database layer failed.
    #[error("database error: {0}")]
    Db(#[from] DbError),

    /// A row the operation depends on does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was rejected before touching storage.
    #[error("invalid input: {0}")]
    Invalid(String),
}

/// Writes and lookups performed while moving results through the pipeline.
pub trait AnalysisStore: Send + Sync {
    /// Store one FEN per ply starting at ply 0, creating rows as needed.
    fn create_positions(
        &self,
        game_id: GameId,
        fens: &[String],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Store one score per ply starting at ply 0, exactly as given.
    fn create_scores(
        &self,
        game_id: GameId,
        scores: &[Score],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Append a line. Returns `false` if that rank was already stored.
    fn create_line(&self, line: &StoredLine)
    -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Stored FEN of one ply.
    fn position_fen(
        &self,
        game_id: GameId,
        ply: u32,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Stored (re-signed) score of one ply.
    fn position_score(
        &self,
        game_id: GameId,
        ply: u32,
    ) -> impl Future<Output = Result<Option<Score>, StoreError>> + Send;

    /// Whether lines were already requested for one ply.
    ///
    /// A missing position row reports `true` so that nothing is ever
    /// published for it.
    fn lines_already_generated(
        &self,
        game_id: GameId,
        ply: u32,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Atomically set the lines-generated flag.
    ///
    /// Returns `true` only for the single caller that flipped it.
    fn mark_lines_generated(
        &self,
        game_id: GameId,
        ply: u32,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Clear the lines-generated flag after a failed publish.
    fn release_lines(
        &self,
        game_id: GameId,
        ply: u32,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Game intake and the read models served by the API tier.
pub trait GameRepository: Send + Sync {
    /// Persist a game with its headers and skeleton positions.
    fn create_game(&self, game: &NewGame) -> impl Future<Output = Result<GameId, StoreError>> + Send;

    /// Whether the game exists.
    fn game_exists(&self, game_id: GameId) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// All positions of a game ordered by ply.
    fn positions(
        &self,
        game_id: GameId,
    ) -> impl Future<Output = Result<Vec<Position>, StoreError>> + Send;

    /// Stored lines of one ply ordered by rank.
    fn lines(
        &self,
        game_id: GameId,
        ply: u32,
    ) -> impl Future<Output = Result<Vec<StoredLine>, StoreError>> + Send;

    /// Note attached to one ply, `None` if the position does not exist.
    fn position_note(
        &self,
        game_id: GameId,
        ply: u32,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Replace the note attached to one ply.
    ///
    /// Fails with [`StoreError::NotFound`] if the position does not exist.
    fn update_position_note(
        &self,
        game_id: GameId,
        ply: u32,
        note: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// `PostgreSQL`-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PostgresPool,
}

impl PgStore {
    /// Wrap a connected pool.
    pub const fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }

    fn positions_table(&self) -> PositionStore<'_> {
        PositionStore::new(self.pool.pool())
    }
}

impl AnalysisStore for PgStore {
    async fn create_positions(&self, game_id: GameId, fens: &[String]) -> Result<(), StoreError> {
        self.positions_table().create_positions(game_id, fens).await?;
        Ok(())
    }

    async fn create_scores(&self, game_id: GameId, scores: &[Score]) -> Result<(), StoreError> {
        self.positions_table().create_scores(game_id, scores).await?;
        Ok(())
    }

    async fn create_line(&self, line: &StoredLine) -> Result<bool, StoreError> {
        Ok(LineStore::new(self.pool.pool()).create_line(line).await?)
    }

    async fn position_fen(&self, game_id: GameId, ply: u32) -> Result<Option<String>, StoreError> {
        Ok(self.positions_table().get_position_fen(game_id, ply).await?)
    }

    async fn position_score(&self, game_id: GameId, ply: u32) -> Result<Option<Score>, StoreError> {
        Ok(self.positions_table().get_position_score(game_id, ply).await?)
    }

    async fn lines_already_generated(&self, game_id: GameId, ply: u32) -> Result<bool, StoreError> {
        let flag = self.positions_table().lines_generated(game_id, ply).await?;
        if flag.is_none() {
            tracing::warn!(game_id = %game_id, ply, "No position row for lines check");
        }
        Ok(flag.unwrap_or(true))
    }

    async fn mark_lines_generated(&self, game_id: GameId, ply: u32) -> Result<bool, StoreError> {
        Ok(self.positions_table().claim_lines(game_id, ply).await?)
    }

    async fn release_lines(&self, game_id: GameId, ply: u32) -> Result<(), StoreError> {
        self.positions_table().release_lines(game_id, ply).await?;
        Ok(())
    }
}

impl GameRepository for PgStore {
    async fn create_game(&self, game: &NewGame) -> Result<GameId, StoreError> {
        Ok(GameStore::new(self.pool.pool()).create_game(game).await?)
    }

    async fn game_exists(&self, game_id: GameId) -> Result<bool, StoreError> {
        let game = GameStore::new(self.pool.pool()).get_game(game_id).await?;
        Ok(game.is_some())
    }

    async fn positions(&self, game_id: GameId) -> Result<Vec<Position>, StoreError> {
        Ok(self.positions_table().get_positions(game_id).await?)
    }

    async fn lines(&self, game_id: GameId, ply: u32) -> Result<Vec<StoredLine>, StoreError> {
        Ok(LineStore::new(self.pool.pool()).get_lines(game_id, ply).await?)
    }

    async fn position_note(&self, game_id: GameId, ply: u32) -> Result<Option<String>, StoreError> {
        Ok(self.positions_table().get_position_note(game_id, ply).await?)
    }

    async fn update_position_note(
        &self,
        game_id: GameId,
        ply: u32,
        note: &str,
    ) -> Result<(), StoreError> {
        match self
            .positions_table()
            .update_position_note(game_id, ply, note)
            .await
        {
            Ok(()) => Ok(()),
            Err(DbError::NotFound(what)) => Err(StoreError::NotFound(what)),
            Err(e) => Err(e.into()),
        }
    }
}

//! Game intake and game-level reads.
//!
//! A game is written once at intake together with its PGN headers and one
//! skeleton row per move (plies `1..=n`, SAN and LAN only). The FEN and
//! score columns of those rows are filled in later by the response
//! processor.

use std::collections::BTreeMap;

use gambit_types::GameId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Everything needed to create a game.
#[derive(Debug, Clone, Default)]
pub struct NewGame {
    /// Display name.
    pub name: String,
    /// Result string from the PGN (`1-0`, `0-1`, `1/2-1/2`, `*`).
    pub result: String,
    /// PGN headers, keyed by header name.
    pub headers: BTreeMap<String, String>,
    /// Moves in standard notation, one per ply starting at ply 1.
    pub sans: Vec<String>,
    /// Moves in long notation, aligned with `sans`.
    pub lans: Vec<String>,
}

/// Operations on the `games` and `game_headers` tables.
pub struct GameStore<'a> {
    pool: &'a PgPool,
}

impl<'a> GameStore<'a> {
    /// Create a new game store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a game, its headers and its skeleton position rows.
    ///
    /// Runs in a single transaction: either the whole game is created or
    /// nothing is.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if `sans` and `lans` differ in length.
    /// Returns [`DbError::Postgres`] if any insert fails.
    pub async fn create_game(&self, game: &NewGame) -> Result<GameId, DbError> {
        if game.sans.len() != game.lans.len() {
            return Err(DbError::Config(format!(
                "SAN and LAN move lists differ in length ({} vs {})",
                game.sans.len(),
                game.lans.len()
            )));
        }

        let game_id = GameId::new();
        let mut tx = self.pool.begin().await?;

        sqlx::query(r"INSERT INTO games (game_id, name, result) VALUES ($1, $2, $3)")
            .bind(game_id.into_inner())
            .bind(&game.name)
            .bind(&game.result)
            .execute(&mut *tx)
            .await?;

        if !game.headers.is_empty() {
            let names: Vec<String> = game.headers.keys().cloned().collect();
            let values: Vec<String> = game.headers.values().cloned().collect();
            sqlx::query(
                r"INSERT INTO game_headers (game_id, header, value)
                  SELECT $1, * FROM UNNEST($2::TEXT[], $3::TEXT[])",
            )
            .bind(game_id.into_inner())
            .bind(&names)
            .bind(&values)
            .execute(&mut *tx)
            .await?;
        }

        if !game.sans.is_empty() {
            let plies: Vec<i32> = (1..=game.sans.len())
                .map(|ply| i32::try_from(ply).unwrap_or(i32::MAX))
                .collect();
            sqlx::query(
                r"INSERT INTO game_positions (game_id, ply, san, lan)
                  SELECT $1, * FROM UNNEST($2::INTEGER[], $3::TEXT[], $4::TEXT[])",
            )
            .bind(game_id.into_inner())
            .bind(&plies)
            .bind(&game.sans)
            .bind(&game.lans)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            game_id = %game_id,
            moves = game.sans.len(),
            "Created game"
        );
        Ok(game_id)
    }

    /// Fetch a single game by ID.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get_game(&self, game_id: GameId) -> Result<Option<GameRow>, DbError> {
        let row = sqlx::query_as::<_, GameRow>(
            r"SELECT game_id, name, result, created_at FROM games WHERE game_id = $1",
        )
        .bind(game_id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Fetch the PGN headers of a game, keyed by header name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get_headers(&self, game_id: GameId) -> Result<BTreeMap<String, String>, DbError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r"SELECT header, value FROM game_headers WHERE game_id = $1 ORDER BY header",
        )
        .bind(game_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// List the most recently created games, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list_games(&self, limit: u32) -> Result<Vec<GameRow>, DbError> {
        let rows = sqlx::query_as::<_, GameRow>(
            r"SELECT game_id, name, result, created_at
              FROM games
              ORDER BY created_at DESC
              LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Delete a game and, by cascade, all of its positions and lines.
    ///
    /// Returns `true` if a game was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete_game(&self, game_id: GameId) -> Result<bool, DbError> {
        let result = sqlx::query(r"DELETE FROM games WHERE game_id = $1")
            .bind(game_id.into_inner())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// A row from the `games` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GameRow {
    /// Game identifier.
    pub game_id: Uuid,
    /// Display name.
    pub name: String,
    /// PGN result string.
    pub result: String,
    /// When the game was imported.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

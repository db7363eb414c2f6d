//! Per-ply position state: FENs, scores, notes and the lines-generated flag.
//!
//! Rows in `game_positions` are keyed by `(game_id, ply)`. Ply 0 is the
//! starting position and only comes into existence when position expansion
//! reports back; plies `1..=n` are created as skeletons at game intake.

use gambit_types::{GameId, Position, Score, ScoreUnit};
use sqlx::PgPool;

use crate::error::DbError;

/// Operations on the `game_positions` table.
pub struct PositionStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PositionStore<'a> {
    /// Create a new position store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store one FEN per ply, starting at ply 0.
    ///
    /// Missing rows are created and existing rows have their FEN replaced,
    /// so replaying the same expansion result is harmless.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails.
    pub async fn create_positions(&self, game_id: GameId, fens: &[String]) -> Result<(), DbError> {
        if fens.is_empty() {
            return Ok(());
        }

        let plies: Vec<i32> = (0..fens.len())
            .map(|ply| i32::try_from(ply).unwrap_or(i32::MAX))
            .collect();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r"INSERT INTO game_positions (game_id, ply, fen)
              SELECT $1, * FROM UNNEST($2::INTEGER[], $3::TEXT[])
              ON CONFLICT (game_id, ply) DO UPDATE SET fen = EXCLUDED.fen",
        )
        .bind(game_id.into_inner())
        .bind(&plies)
        .bind(fens)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::debug!(game_id = %game_id, count = fens.len(), "Stored positions");
        Ok(())
    }

    /// Store one score per ply, starting at ply 0.
    ///
    /// Scores are written exactly as given; the caller applies the sign
    /// convention. Rows that do not exist are skipped. Returns the number
    /// of rows updated.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn create_scores(&self, game_id: GameId, scores: &[Score]) -> Result<u64, DbError> {
        if scores.is_empty() {
            return Ok(0);
        }

        let len = scores.len();
        let mut plies = Vec::with_capacity(len);
        let mut units = Vec::with_capacity(len);
        let mut values = Vec::with_capacity(len);
        for (ply, score) in scores.iter().enumerate() {
            plies.push(i32::try_from(ply).unwrap_or(i32::MAX));
            units.push(score.unit.as_str().to_owned());
            values.push(score.value);
        }

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r"UPDATE game_positions AS p
              SET score_unit = s.unit, score_value = s.value
              FROM UNNEST($2::INTEGER[], $3::TEXT[], $4::INTEGER[]) AS s(ply, unit, value)
              WHERE p.game_id = $1 AND p.ply = s.ply",
        )
        .bind(game_id.into_inner())
        .bind(&plies)
        .bind(&units)
        .bind(&values)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        let updated = result.rows_affected();
        if updated < u64::try_from(len).unwrap_or(u64::MAX) {
            tracing::warn!(
                game_id = %game_id,
                scores = len,
                updated,
                "Some scores had no matching position row"
            );
        }
        Ok(updated)
    }

    /// All positions of a game, ordered by ply.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get_positions(&self, game_id: GameId) -> Result<Vec<Position>, DbError> {
        let rows = sqlx::query_as::<_, PositionRow>(
            r"SELECT ply, san, lan, fen, score_unit, score_value, note
              FROM game_positions
              WHERE game_id = $1
              ORDER BY ply",
        )
        .bind(game_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(PositionRow::into_position).collect())
    }

    /// The stored FEN of one ply, if the row exists and has been expanded.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get_position_fen(
        &self,
        game_id: GameId,
        ply: u32,
    ) -> Result<Option<String>, DbError> {
        let fen: Option<Option<String>> = sqlx::query_scalar(
            r"SELECT fen FROM game_positions WHERE game_id = $1 AND ply = $2",
        )
        .bind(game_id.into_inner())
        .bind(ply_to_db(ply))
        .fetch_optional(self.pool)
        .await?;

        Ok(fen.flatten())
    }

    /// The stored (already re-signed) score of one ply, if present.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get_position_score(
        &self,
        game_id: GameId,
        ply: u32,
    ) -> Result<Option<Score>, DbError> {
        let row: Option<(Option<String>, Option<i32>)> = sqlx::query_as(
            r"SELECT score_unit, score_value FROM game_positions WHERE game_id = $1 AND ply = $2",
        )
        .bind(game_id.into_inner())
        .bind(ply_to_db(ply))
        .fetch_optional(self.pool)
        .await?;

        Ok(row.and_then(|(unit, value)| score_from_db(unit.as_deref(), value)))
    }

    /// The note attached to one ply, if the row exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get_position_note(
        &self,
        game_id: GameId,
        ply: u32,
    ) -> Result<Option<String>, DbError> {
        let note: Option<String> = sqlx::query_scalar(
            r"SELECT note FROM game_positions WHERE game_id = $1 AND ply = $2",
        )
        .bind(game_id.into_inner())
        .bind(ply_to_db(ply))
        .fetch_optional(self.pool)
        .await?;

        Ok(note)
    }

    /// Replace the note attached to one ply.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the row does not exist.
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn update_position_note(
        &self,
        game_id: GameId,
        ply: u32,
        note: &str,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            r"UPDATE game_positions SET note = $3 WHERE game_id = $1 AND ply = $2",
        )
        .bind(game_id.into_inner())
        .bind(ply_to_db(ply))
        .bind(note)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("position {game_id}/{ply}")));
        }
        Ok(())
    }

    // =========================================================================
    // Lines-generated flag
    // =========================================================================

    /// Whether lines have been requested for one ply.
    ///
    /// Returns `None` when the row does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn lines_generated(&self, game_id: GameId, ply: u32) -> Result<Option<bool>, DbError> {
        let flag: Option<bool> = sqlx::query_scalar(
            r"SELECT lines_generated FROM game_positions WHERE game_id = $1 AND ply = $2",
        )
        .bind(game_id.into_inner())
        .bind(ply_to_db(ply))
        .fetch_optional(self.pool)
        .await?;

        Ok(flag)
    }

    /// Atomically flip the lines-generated flag from false to true.
    ///
    /// Returns `true` only for the caller that performed the flip. Concurrent
    /// callers, repeat callers and callers naming a missing row get `false`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn claim_lines(&self, game_id: GameId, ply: u32) -> Result<bool, DbError> {
        let result = sqlx::query(
            r"UPDATE game_positions
              SET lines_generated = TRUE
              WHERE game_id = $1 AND ply = $2 AND lines_generated = FALSE",
        )
        .bind(game_id.into_inner())
        .bind(ply_to_db(ply))
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Reset the lines-generated flag so a later request can claim it again.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn release_lines(&self, game_id: GameId, ply: u32) -> Result<(), DbError> {
        sqlx::query(
            r"UPDATE game_positions SET lines_generated = FALSE WHERE game_id = $1 AND ply = $2",
        )
        .bind(game_id.into_inner())
        .bind(ply_to_db(ply))
        .execute(self.pool)
        .await?;

        Ok(())
    }
}

/// A row from the `game_positions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PositionRow {
    /// Zero-based ply.
    pub ply: i32,
    /// Move in standard notation.
    pub san: Option<String>,
    /// Move in long notation.
    pub lan: Option<String>,
    /// Board state.
    pub fen: Option<String>,
    /// `cp` or `mate`.
    pub score_unit: Option<String>,
    /// Re-signed score.
    pub score_value: Option<i32>,
    /// Freeform annotation.
    pub note: String,
}

impl PositionRow {
    /// Convert the raw row into the shared [`Position`] type.
    pub fn into_position(self) -> Position {
        Position {
            ply: u32::try_from(self.ply).unwrap_or(0),
            san: self.san,
            lan: self.lan,
            fen: self.fen,
            score_unit: self.score_unit.as_deref().and_then(ScoreUnit::from_token),
            score_value: self.score_value,
            note: self.note,
        }
    }
}

/// Convert a ply to its `INTEGER` column value.
pub(crate) fn ply_to_db(ply: u32) -> i32 {
    i32::try_from(ply).unwrap_or(i32::MAX)
}

/// Rebuild a [`Score`] from its two nullable columns.
pub(crate) fn score_from_db(unit: Option<&str>, value: Option<i32>) -> Option<Score> {
    let unit = ScoreUnit::from_token(unit?)?;
    Some(Score { unit, value: value? })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_needs_known_unit_and_value() {
        assert_eq!(
            score_from_db(Some("cp"), Some(-40)),
            Some(Score::centipawns(-40))
        );
        assert_eq!(score_from_db(Some("mate"), Some(2)), Some(Score::mate(2)));
        assert_eq!(score_from_db(Some("cp"), None), None);
        assert_eq!(score_from_db(None, Some(3)), None);
        assert_eq!(score_from_db(Some("pawns"), Some(3)), None);
    }

    #[test]
    fn row_conversion_parses_unit() {
        let row = PositionRow {
            ply: 3,
            san: Some("Nf3".to_owned()),
            lan: Some("g1f3".to_owned()),
            fen: None,
            score_unit: Some("mate".to_owned()),
            score_value: Some(-1),
            note: String::new(),
        };
        let position = row.into_position();
        assert_eq!(position.ply, 3);
        assert_eq!(position.score(), Some(Score::mate(-1)));
    }
}
